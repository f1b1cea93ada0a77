//! Ask (sell-side) order book
//!
//! Maintains resting sell entries sorted by price ascending (best ask
//! first). Mirror of the bid side with the opposite price ranking.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::price_level::PriceLevel;
use super::BookEntry;

/// Ask (sell) side of an order book
///
/// The lowest price has priority; equal prices are ranked by earliest
/// timestamp.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    /// Price levels; best ask is the first key
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resting entry
    pub fn insert(&mut self, entry: BookEntry) {
        self.levels
            .entry(entry.price)
            .or_insert_with(PriceLevel::new)
            .insert(entry);
    }

    /// Remove an entry by order id at a known price
    ///
    /// Returns the removed entry, if found.
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> Option<BookEntry> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(order_id)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(removed)
    }

    /// The best (lowest-price, earliest) resting entry
    pub fn best(&self) -> Option<&BookEntry> {
        self.levels.values().next().and_then(|level| level.front())
    }

    /// The best ask price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Pop the best entry off the book
    pub fn pop_best(&mut self) -> Option<BookEntry> {
        let (&price, level) = self.levels.iter_mut().next()?;
        let entry = level.pop_front();
        if level.is_empty() {
            self.levels.remove(&price);
        }
        entry
    }

    /// Top-N price levels as (price, total quantity), best first
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// Every resting entry in priority order (best first)
    pub fn entries(&self) -> Vec<BookEntry> {
        self.levels
            .values()
            .flat_map(|level| level.iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
