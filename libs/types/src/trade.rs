//! Trade records
//!
//! Trades are produced only by the matching engine and consumed by the
//! position ledger and the event bus. Settlement is against the synthetic
//! system account, so exactly one of buyer/seller is a real account.

use crate::ids::{AccountId, MarketId, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol: MarketId,
    pub side: Side,
    pub buyer_id: AccountId,
    pub seller_id: AccountId,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_at: i64, // Unix nanos
}

impl Trade {
    pub fn new(
        symbol: MarketId,
        side: Side,
        buyer_id: AccountId,
        seller_id: AccountId,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            symbol,
            side,
            buyer_id,
            seller_id,
            price,
            quantity,
            executed_at,
        }
    }

    /// Resolve which side of the trade is a real account.
    ///
    /// The buyer acts when the seller is the synthetic system account;
    /// otherwise the seller acts.
    pub fn real_account(&self) -> (AccountId, Side) {
        if self.seller_id.is_system() {
            (self.buyer_id, Side::Buy)
        } else {
            (self.seller_id, Side::Sell)
        }
    }

    /// Notional value (price × quantity)
    pub fn notional(&self) -> Decimal {
        self.price.as_decimal() * self.quantity.as_decimal()
    }
}
