//! Risk View Service
//!
//! Read-only aggregation over the position ledger for downstream risk
//! tooling. No liquidation logic lives here.

pub mod view;

pub use view::RiskView;
