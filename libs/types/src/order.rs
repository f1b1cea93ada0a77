//! Order lifecycle types

use crate::ids::{AccountId, MarketId, OrderId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Margin mode an account (and the orders it places) operates under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    /// Entire balance backs every position
    Cross,
    /// A fixed allocation is reserved per position
    Isolated,
}

/// Order type: the two base types plus four conditional variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
    LimitStopLoss,
    LimitTakeProfit,
    MarketStopLoss,
    MarketTakeProfit,
}

impl OrderType {
    /// Conditional orders wait in the stop collection until triggered
    pub fn is_conditional(&self) -> bool {
        !matches!(self, OrderType::Limit | OrderType::Market)
    }

    pub fn is_stop_loss(&self) -> bool {
        matches!(self, OrderType::LimitStopLoss | OrderType::MarketStopLoss)
    }

    pub fn is_take_profit(&self) -> bool {
        matches!(self, OrderType::LimitTakeProfit | OrderType::MarketTakeProfit)
    }

    /// True for conditional variants that activate as market orders
    pub fn activates_as_market(&self) -> bool {
        matches!(self, OrderType::MarketStopLoss | OrderType::MarketTakeProfit)
    }
}

/// Order status
///
/// The matching path queues every resting limit order and every waiting
/// conditional order as `Pending`; `Open` is accepted on ingest but never
/// produced by this core. `Filled` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Queued: resting in the book or awaiting stop activation
    Pending,
    /// Accepted but not yet queued or matched
    Open,
    /// Completely matched (terminal)
    Filled,
    /// Cancelled by user or system (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

/// A margin order as submitted by the caller
///
/// `quantity` is the remaining quantity and is mutated as fills occur;
/// `limit_price` is set for limit orders and limit-variant stops,
/// `stop_price` for conditional orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub symbol: MarketId,
    pub side: Side,
    pub order_type: OrderType,
    pub leverage: u8,
    pub quantity: Quantity,
    pub limit_price: Option<Price>,
    pub stop_price: Option<Price>,
    pub margin_mode: MarginMode,
    pub status: OrderStatus,
    pub created_at: i64, // Unix nanos
}

impl Order {
    /// Create a new limit order
    #[allow(clippy::too_many_arguments)]
    pub fn limit(
        account_id: AccountId,
        symbol: MarketId,
        side: Side,
        leverage: u8,
        quantity: Quantity,
        limit_price: Price,
        margin_mode: MarginMode,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            account_id,
            symbol,
            side,
            order_type: OrderType::Limit,
            leverage,
            quantity,
            limit_price: Some(limit_price),
            stop_price: None,
            margin_mode,
            status: OrderStatus::Open,
            created_at: timestamp,
        }
    }

    /// Create a new market order
    pub fn market(
        account_id: AccountId,
        symbol: MarketId,
        side: Side,
        leverage: u8,
        quantity: Quantity,
        margin_mode: MarginMode,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            account_id,
            symbol,
            side,
            order_type: OrderType::Market,
            leverage,
            quantity,
            limit_price: None,
            stop_price: None,
            margin_mode,
            status: OrderStatus::Open,
            created_at: timestamp,
        }
    }

    /// Create a new conditional (stop-loss / take-profit) order
    ///
    /// `limit_price` is required for the limit variants and ignored for the
    /// market variants.
    #[allow(clippy::too_many_arguments)]
    pub fn conditional(
        account_id: AccountId,
        symbol: MarketId,
        side: Side,
        order_type: OrderType,
        leverage: u8,
        quantity: Quantity,
        stop_price: Price,
        limit_price: Option<Price>,
        margin_mode: MarginMode,
        timestamp: i64,
    ) -> Self {
        debug_assert!(order_type.is_conditional());
        Self {
            order_id: OrderId::new(),
            account_id,
            symbol,
            side,
            order_type,
            leverage,
            quantity,
            limit_price,
            stop_price: Some(stop_price),
            margin_mode,
            status: OrderStatus::Open,
            created_at: timestamp,
        }
    }

    /// Mark the order filled and zero its remaining quantity
    pub fn fill(&mut self) {
        self.quantity = Quantity::zero();
        self.status = OrderStatus::Filled;
    }

    /// Cancel the order; returns false if already terminal
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OrderStatus::Cancelled;
        true
    }
}
