//! Types library for the margin-trading matching core
//!
//! This library provides all core type definitions shared by the matching
//! engine, position ledger, and risk view, plus the narrow traits through
//! which the core talks to its external collaborators.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, TradeId, AccountId, MarketId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order lifecycle types
//! - `trade`: Trade records
//! - `position`: Position tracking types
//! - `account`: Margin account view and the account collaborator trait
//! - `bus`: Event publisher trait and topics
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
pub mod account;
pub mod position;
pub mod bus;
pub mod errors;

/// Unix-nanos wall clock used for order/trade/position timestamps.
pub fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
    pub use crate::account::*;
    pub use crate::position::*;
    pub use crate::bus::*;
    pub use crate::errors::*;
}
