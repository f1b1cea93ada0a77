//! Error taxonomy for the matching core
//!
//! Every error is scoped to the single order/sweep operation that raised
//! it; none is retried internally and none is fatal to the process.

use crate::bus::PublishError;
use crate::ids::{AccountId, MarketId, OrderId};
use crate::order::OrderType;
use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level core error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("insufficient margin: required {required}, available {available}")]
    InsufficientMargin { required: Decimal, available: Decimal },

    #[error("order type {0:?} is not supported under isolated margin")]
    UnsupportedOrderType(OrderType),

    #[error("limit order {0} carries no limit price")]
    MissingLimitPrice(OrderId),

    /// Expected and recoverable: the book has no two-sided market yet
    #[error("no reference price for {0}")]
    NoReferencePrice(MarketId),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("no position for account {account_id} on {symbol}")]
    PositionNotFound {
        account_id: AccountId,
        symbol: MarketId,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
