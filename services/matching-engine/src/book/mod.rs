//! Per-symbol order book
//!
//! Priority structures for resting limit orders plus the unordered
//! collection of conditional orders awaiting trigger. The book performs no
//! matching logic itself; fill decisions live in the engine.

pub mod price_level;
pub mod bid_book;
pub mod ask_book;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use price_level::PriceLevel;

use types::ids::{AccountId, MarketId, OrderId};
use types::numeric::{Price, Quantity};
use types::order::{MarginMode, Order, Side};

/// A resting order, reduced to what ranking and settlement need.
///
/// Leverage and margin mode ride along so an entry consumed by the engine
/// can be settled through the position ledger; the full `Order` stays the
/// source of truth for status.
#[derive(Debug, Clone, PartialEq)]
pub struct BookEntry {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub price: Price,
    pub quantity: Quantity,
    pub leverage: u8,
    pub margin_mode: MarginMode,
    pub timestamp: i64,
}

impl BookEntry {
    /// Build an entry from a resting limit order
    pub fn from_order(order: &Order, price: Price) -> Self {
        Self {
            order_id: order.order_id,
            account_id: order.account_id,
            price,
            quantity: order.quantity,
            leverage: order.leverage,
            margin_mode: order.margin_mode,
            timestamp: order.created_at,
        }
    }
}

/// Order book for a single symbol
#[derive(Debug)]
pub struct OrderBook {
    pub symbol: MarketId,
    bids: BidBook,
    asks: AskBook,
    /// Conditional orders awaiting trigger; scanned linearly on each sweep
    stops: Vec<Order>,
}

impl OrderBook {
    pub fn new(symbol: MarketId) -> Self {
        Self {
            symbol,
            bids: BidBook::new(),
            asks: AskBook::new(),
            stops: Vec::new(),
        }
    }

    /// Midpoint of best bid and best ask; `None` while either side is empty
    pub fn reference_price(&self) -> Option<Price> {
        let bid = self.bids.best_price()?;
        let ask = self.asks.best_price()?;
        Some(Price::midpoint(bid, ask))
    }

    pub fn best_bid(&self) -> Option<&BookEntry> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<&BookEntry> {
        self.asks.best()
    }

    /// Insert a resting entry on the given side
    pub fn insert(&mut self, side: Side, entry: BookEntry) {
        match side {
            Side::Buy => self.bids.insert(entry),
            Side::Sell => self.asks.insert(entry),
        }
    }

    /// Pop the best entry from the given side
    pub fn pop_best(&mut self, side: Side) -> Option<BookEntry> {
        match side {
            Side::Buy => self.bids.pop_best(),
            Side::Sell => self.asks.pop_best(),
        }
    }

    /// Remove a resting entry by identity
    pub fn remove(&mut self, side: Side, order_id: &OrderId, price: Price) -> Option<BookEntry> {
        match side {
            Side::Buy => self.bids.remove(order_id, price),
            Side::Sell => self.asks.remove(order_id, price),
        }
    }

    /// Queue a conditional order until its trigger fires
    pub fn push_stop(&mut self, order: Order) {
        self.stops.push(order);
    }

    /// Remove a conditional order by identity
    pub fn remove_stop(&mut self, order_id: &OrderId) -> Option<Order> {
        let at = self.stops.iter().position(|o| &o.order_id == order_id)?;
        Some(self.stops.remove(at))
    }

    /// Drain every queued conditional order satisfying the predicate
    pub fn drain_triggered_stops(&mut self, mut triggered: impl FnMut(&Order) -> bool) -> Vec<Order> {
        let mut drained = Vec::new();
        let mut i = 0;
        while i < self.stops.len() {
            if triggered(&self.stops[i]) {
                drained.push(self.stops.remove(i));
            } else {
                i += 1;
            }
        }
        drained
    }

    pub fn stops(&self) -> &[Order] {
        &self.stops
    }

    pub fn bids(&self) -> &BidBook {
        &self.bids
    }

    pub fn asks(&self) -> &AskBook {
        &self.asks
    }

    /// Top-N depth per side for market-data consumers
    pub fn depth_snapshot(&self, depth: usize) -> BookSnapshot {
        BookSnapshot {
            symbol: self.symbol.clone(),
            bids: self.bids.depth_snapshot(depth),
            asks: self.asks.depth_snapshot(depth),
        }
    }
}

/// Aggregated book depth
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub symbol: MarketId,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn stop_order(stop: u64) -> Order {
        Order::conditional(
            AccountId::new(),
            MarketId::new("BTCUSDT"),
            Side::Sell,
            types::order::OrderType::MarketStopLoss,
            10,
            Quantity::from_u64(1),
            Price::from_u64(stop),
            None,
            MarginMode::Cross,
            0,
        )
    }

    #[test]
    fn test_reference_price_two_sided() {
        let mut book = OrderBook::new(MarketId::new("BTCUSDT"));
        book.insert(Side::Buy, entry(100, 1));
        book.insert(Side::Sell, entry(102, 2));

        assert_eq!(book.reference_price(), Some(Price::from_u64(101)));
    }

    #[test]
    fn test_reference_price_one_sided() {
        let mut book = OrderBook::new(MarketId::new("BTCUSDT"));
        assert_eq!(book.reference_price(), None);

        book.insert(Side::Buy, entry(100, 1));
        assert_eq!(book.reference_price(), None);

        book.insert(Side::Sell, entry(102, 2));
        assert!(book.reference_price().is_some());

        book.pop_best(Side::Sell);
        assert_eq!(book.reference_price(), None);
    }

    #[test]
    fn test_stop_queue() {
        let mut book = OrderBook::new(MarketId::new("BTCUSDT"));
        let stop = stop_order(95);
        let stop_id = stop.order_id;
        book.push_stop(stop);
        book.push_stop(stop_order(90));

        assert_eq!(book.stops().len(), 2);
        assert!(book.remove_stop(&stop_id).is_some());
        assert_eq!(book.stops().len(), 1);
        assert!(book.remove_stop(&stop_id).is_none());
    }

    #[test]
    fn test_drain_triggered_stops() {
        let mut book = OrderBook::new(MarketId::new("BTCUSDT"));
        book.push_stop(stop_order(95));
        book.push_stop(stop_order(105));
        book.push_stop(stop_order(90));

        let drained =
            book.drain_triggered_stops(|o| o.stop_price.unwrap() <= Price::from_u64(95));
        assert_eq!(drained.len(), 2);
        assert_eq!(book.stops().len(), 1);
        assert_eq!(book.stops()[0].stop_price, Some(Price::from_u64(105)));
    }

    #[test]
    fn test_depth_snapshot() {
        let mut book = OrderBook::new(MarketId::new("BTCUSDT"));
        book.insert(Side::Buy, entry(100, 1));
        book.insert(Side::Buy, entry(99, 2));
        book.insert(Side::Sell, entry(102, 3));

        let snapshot = book.depth_snapshot(5);
        assert_eq!(snapshot.bids.len(), 2);
        assert_eq!(snapshot.bids[0].0, Price::from_u64(100));
        assert_eq!(snapshot.asks.len(), 1);
    }
}
