//! Conditional-order triggering and activation
//!
//! A queued stop-loss / take-profit order is evaluated against the book's
//! reference price on every sweep; when it fires it is materialized as the
//! plain order it stands for and resubmitted through the normal placement
//! path.

use types::numeric::Price;
use types::order::{Order, OrderStatus, OrderType, Side};

/// Trigger table:
/// - stop-loss: buy fires at reference >= stop, sell at reference <= stop
/// - take-profit: buy fires at reference <= stop, sell at reference >= stop
pub fn should_trigger(order: &Order, reference: Price) -> bool {
    let stop = match order.stop_price {
        Some(stop) => stop,
        None => return false,
    };

    if order.order_type.is_stop_loss() {
        return match order.side {
            Side::Buy => reference >= stop,
            Side::Sell => reference <= stop,
        };
    }
    if order.order_type.is_take_profit() {
        return match order.side {
            Side::Buy => reference <= stop,
            Side::Sell => reference >= stop,
        };
    }
    false
}

/// Materialize the plain order a triggered conditional becomes: a market
/// order for the market variants, a limit order carrying the original
/// limit price for the limit variants. Identity and margin terms carry
/// over; the activation time becomes the new submission time.
pub fn activate(stop: &Order, timestamp: i64) -> Order {
    let order_type = if stop.order_type.activates_as_market() {
        OrderType::Market
    } else {
        OrderType::Limit
    };

    Order {
        order_id: stop.order_id,
        account_id: stop.account_id,
        symbol: stop.symbol.clone(),
        side: stop.side,
        order_type,
        leverage: stop.leverage,
        quantity: stop.quantity,
        limit_price: match order_type {
            OrderType::Limit => stop.limit_price,
            _ => None,
        },
        stop_price: None,
        margin_mode: stop.margin_mode,
        status: OrderStatus::Open,
        created_at: timestamp,
    }
}
