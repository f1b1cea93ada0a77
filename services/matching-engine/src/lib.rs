//! Matching Engine Service
//!
//! Margin-trading matching core: per-symbol order books, reference-price
//! matching settled against a synthetic counterparty, margin checks, and
//! conditional-order activation.
//!
//! **Key invariants:**
//! - Strict price-time priority on both book sides
//! - A market order fills in full immediately or fails; it never rests
//! - The reference price is the bid/ask midpoint and is explicit `None`
//!   on a one-sided book, never a numeric zero
//! - All book access for a symbol is serialized behind that symbol's lock

pub mod book;
pub mod margin;
pub mod stops;
pub mod engine;

pub use engine::MatchingEngine;
