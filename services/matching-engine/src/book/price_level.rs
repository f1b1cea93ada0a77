//! Price level: all resting entries at one price, in time priority
//!
//! Entries are kept in ascending-timestamp order so the front of the level
//! is always the earliest submission at that price.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;

use super::BookEntry;

/// Resting entries at a single price point
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Entries ordered by ascending timestamp (earliest first)
    entries: VecDeque<BookEntry>,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, keeping ascending-timestamp order.
    ///
    /// Entries normally arrive in time order, so the scan from the back is
    /// a no-op in the common case.
    pub fn insert(&mut self, entry: BookEntry) {
        let at = self
            .entries
            .iter()
            .rposition(|e| e.timestamp <= entry.timestamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.entries.insert(at, entry);
    }

    /// Remove an entry by order id; returns it if present
    pub fn remove(&mut self, order_id: &OrderId) -> Option<BookEntry> {
        let at = self.entries.iter().position(|e| &e.order_id == order_id)?;
        self.entries.remove(at)
    }

    /// The earliest entry at this price
    pub fn front(&self) -> Option<&BookEntry> {
        self.entries.front()
    }

    /// Pop the earliest entry at this price
    pub fn pop_front(&mut self) -> Option<BookEntry> {
        self.entries.pop_front()
    }

    /// Total quantity resting at this price
    pub fn total_quantity(&self) -> Quantity {
        self.entries
            .iter()
            .fold(Quantity::zero(), |acc, e| acc + e.quantity)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookEntry> {
        self.entries.iter()
    }
}
