//! Margin check arithmetic
//!
//! Pure functions over the account view; the engine evaluates them with
//! the symbol's current reference price as the entry estimate. All
//! calculations use fixed-point Decimal arithmetic.

use rust_decimal::Decimal;
use types::account::MarginAccount;
use types::errors::EngineError;
use types::numeric::{Price, Quantity};
use types::position::Position;

/// Fixed allocation factor reserved per isolated-margin order
pub const ISOLATED_ALLOCATION_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 1); // 0.1

/// Margin an order commits under cross mode: qty × price / leverage
pub fn order_margin(quantity: Quantity, price: Price, leverage: u8) -> Decimal {
    quantity.as_decimal() * price.as_decimal() / Decimal::from(leverage.max(1))
}

/// Balance an isolated order reserves: qty × price × 10%
pub fn isolated_allocation(quantity: Quantity, price: Price) -> Decimal {
    quantity.as_decimal() * price.as_decimal() * ISOLATED_ALLOCATION_RATE
}

/// Total cross margin required: the prospective order plus every existing
/// position at its own entry price and leverage
pub fn cross_margin_required(
    quantity: Quantity,
    reference_price: Price,
    leverage: u8,
    positions: &[Position],
) -> Decimal {
    let mut total = order_margin(quantity, reference_price, leverage);
    for position in positions {
        total += position.margin_required();
    }
    total
}

/// Total isolated allocation required: the prospective order's reservation
/// plus the margin already committed to existing positions
pub fn isolated_margin_required(
    quantity: Quantity,
    reference_price: Price,
    positions: &[Position],
) -> Decimal {
    let mut total = isolated_allocation(quantity, reference_price);
    for position in positions {
        total += position.allocated_margin;
    }
    total
}

/// Cross-margin acceptance check; equality passes
pub fn check_cross(
    account: &MarginAccount,
    quantity: Quantity,
    reference_price: Price,
    leverage: u8,
) -> Result<(), EngineError> {
    let required = cross_margin_required(quantity, reference_price, leverage, &account.positions);
    if required > account.total_balance {
        return Err(EngineError::InsufficientMargin {
            required,
            available: account.total_balance,
        });
    }
    Ok(())
}

/// Isolated-margin acceptance check; equality passes
pub fn check_isolated(
    account: &MarginAccount,
    quantity: Quantity,
    reference_price: Price,
) -> Result<(), EngineError> {
    let required = isolated_margin_required(quantity, reference_price, &account.positions);
    if required > account.total_balance {
        return Err(EngineError::InsufficientMargin {
            required,
            available: account.total_balance,
        });
    }
    Ok(())
}
