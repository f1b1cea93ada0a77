//! Bid (buy-side) order book
//!
//! Maintains resting buy entries sorted by price descending (best bid
//! first). Uses BTreeMap for deterministic iteration order; time priority
//! within a price level is handled by the level itself.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::price_level::PriceLevel;
use super::BookEntry;

/// Bid (buy) side of an order book
///
/// The highest price has priority; equal prices are ranked by earliest
/// timestamp.
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    /// Price levels; best bid is the last key
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
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

    /// The best (highest-price, earliest) resting entry
    pub fn best(&self) -> Option<&BookEntry> {
        self.levels.values().next_back().and_then(|level| level.front())
    }

    /// The best bid price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Pop the best entry off the book
    pub fn pop_best(&mut self) -> Option<BookEntry> {
        let (&price, level) = self.levels.iter_mut().next_back()?;
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
            .rev()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// Every resting entry in priority order (best first)
    pub fn entries(&self) -> Vec<BookEntry> {
        self.levels
            .values()
            .rev()
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

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use types::ids::AccountId;
    use types::order::MarginMode;

    fn entry(price: u64, ts: i64) -> BookEntry {
        BookEntry {
            order_id: OrderId::new(),
            account_id: AccountId::new(),
            price: Price::from_u64(price),
            quantity: Quantity::from_u64(1),
            leverage: 10,
            margin_mode: MarginMode::Cross,
            timestamp: ts,
        }
    }

    #[test]
    fn test_best_is_highest_price() {
        let mut book = BidBook::new();
        book.insert(entry(100, 1));
        book.insert(entry(102, 2));
        book.insert(entry(99, 3));

        assert_eq!(book.best_price(), Some(Price::from_u64(102)));
        assert_eq!(book.best().unwrap().price, Price::from_u64(102));
    }

    #[test]
    fn test_time_priority_within_level() {
        let mut book = BidBook::new();
        let early = entry(100, 1);
        let early_id = early.order_id;
        book.insert(entry(100, 5));
        book.insert(early);

        assert_eq!(book.best().unwrap().order_id, early_id);
    }

    #[test]
    fn test_pop_best_removes_empty_level() {
        let mut book = BidBook::new();
        book.insert(entry(100, 1));
        book.insert(entry(101, 2));

        let popped = book.pop_best().unwrap();
        assert_eq!(popped.price, Price::from_u64(101));
        assert_eq!(book.level_count(), 1);
        assert_eq!(book.best_price(), Some(Price::from_u64(100)));
    }

    #[test]
    fn test_remove_by_id() {
        let mut book = BidBook::new();
        let target = entry(100, 1);
        let target_id = target.order_id;
        book.insert(target);

        assert!(book.remove(&target_id, Price::from_u64(100)).is_some());
        assert!(book.is_empty());
        assert!(book.remove(&target_id, Price::from_u64(100)).is_none());
    }

    #[test]
    fn test_depth_snapshot_best_first() {
        let mut book = BidBook::new();
        book.insert(entry(100, 1));
        book.insert(entry(102, 2));
        book.insert(entry(99, 3));
        book.insert(entry(101, 4));

        let depth = book.depth_snapshot(2);
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].0, Price::from_u64(102));
        assert_eq!(depth[1].0, Price::from_u64(101));
    }

    #[test]
    fn test_entries_priority_order() {
        let mut book = BidBook::new();
        book.insert(entry(100, 2));
        book.insert(entry(102, 1));
        book.insert(entry(100, 1));

        let prices: Vec<Price> = book.entries().iter().map(|e| e.price).collect();
        assert_eq!(
            prices,
            vec![Price::from_u64(102), Price::from_u64(100), Price::from_u64(100)]
        );
        // equal prices ranked by ascending timestamp
        let level_stamps: Vec<i64> = book.entries()[1..].iter().map(|e| e.timestamp).collect();
        assert_eq!(level_stamps, vec![1, 2]);
    }

    proptest! {
        // Priority order: price non-increasing, and within a price level
        // timestamps ascending.
        #[test]
        fn prop_priority_invariant(
            inserts in prop::collection::vec((1u64..=50, 0i64..=1000), 0..64)
        ) {
            let mut book = BidBook::new();
            for (price, ts) in inserts {
                book.insert(entry(price, ts));
            }

            let entries = book.entries();
            for pair in entries.windows(2) {
                prop_assert!(pair[0].price >= pair[1].price);
                if pair[0].price == pair[1].price {
                    prop_assert!(pair[0].timestamp <= pair[1].timestamp);
                }
            }
        }
    }
}
