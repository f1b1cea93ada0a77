//! Position tracking types
//!
//! One position per (account, symbol); created lazily on first fill, never
//! deleted, zeroed when quantity returns to zero. All mutation goes through
//! the position ledger — these are the data types and the pure arithmetic.

use crate::ids::{AccountId, MarketId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position side enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    /// Long position - profit when price increases
    Long,
    /// Short position - profit when price decreases
    Short,
}

impl PositionSide {
    /// The position side a fill on the given order side opens
    pub fn from_order_side(side: Side) -> Self {
        match side {
            Side::Buy => PositionSide::Long,
            Side::Sell => PositionSide::Short,
        }
    }

    /// True if a fill on `side` accumulates this position rather than
    /// closing it
    pub fn accumulates(&self, side: Side) -> bool {
        *self == Self::from_order_side(side)
    }
}

/// Position state for one (account, symbol) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub account_id: AccountId,
    pub symbol: MarketId,
    pub side: PositionSide,
    pub leverage: u8,
    pub entry_price: Price,
    pub quantity: Quantity,
    pub allocated_margin: Decimal,
    pub mark_price: Price,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub initial_margin: Decimal,
    pub maintenance_margin: Decimal,
    pub liquidation_price: Price,
    pub updated_at: i64, // Unix nanos
}

impl Position {
    /// A flat position, as created lazily on first contact
    pub fn flat(account_id: AccountId, symbol: MarketId, timestamp: i64) -> Self {
        Self {
            position_id: Uuid::now_v7(),
            account_id,
            symbol,
            side: PositionSide::Long,
            leverage: 1,
            entry_price: Price::zero(),
            quantity: Quantity::zero(),
            allocated_margin: Decimal::ZERO,
            mark_price: Price::zero(),
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            initial_margin: Decimal::ZERO,
            maintenance_margin: Decimal::ZERO,
            liquidation_price: Price::zero(),
            updated_at: timestamp,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Unrealized PnL for a hypothetical mark price
    ///
    /// Long: (mark − entry) × qty; short: (entry − mark) × qty.
    pub fn pnl_at(side: PositionSide, entry: Price, mark: Price, quantity: Quantity) -> Decimal {
        let qty = quantity.as_decimal();
        match side {
            PositionSide::Long => (mark.as_decimal() - entry.as_decimal()) * qty,
            PositionSide::Short => (entry.as_decimal() - mark.as_decimal()) * qty,
        }
    }

    /// Update mark price and recalculate unrealized PnL
    pub fn update_mark_price(&mut self, mark: Price, timestamp: i64) {
        self.mark_price = mark;
        self.unrealized_pnl = Self::pnl_at(self.side, self.entry_price, mark, self.quantity);
        self.updated_at = timestamp;
    }

    /// Margin this position commits under cross mode: qty × entry / leverage
    pub fn margin_required(&self) -> Decimal {
        self.quantity.as_decimal() * self.entry_price.as_decimal()
            / Decimal::from(self.leverage.max(1))
    }

    /// Margin ratio for downstream risk tooling
    ///
    /// Returns `Decimal::MAX` when there is no maintenance margin set.
    pub fn margin_ratio(&self) -> Decimal {
        let equity = self.initial_margin + self.unrealized_pnl;
        if self.maintenance_margin == Decimal::ZERO {
            Decimal::MAX
        } else {
            equity / self.maintenance_margin
        }
    }
}
