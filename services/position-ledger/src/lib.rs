//! Position Ledger Service
//!
//! The single writer of position state: translates trades into position
//! mutations (weighted-average entry, realized PnL, close-and-flip) and
//! fans position changes out to the event bus.

pub mod ledger;

pub use ledger::PositionLedger;
