//! Matching engine
//!
//! Orders settle against a synthetic counterparty at the book's reference
//! price rather than crossing a real opposing queue. `place_order` runs
//! the margin check, book mutation, and settlement under the symbol's
//! mutex; the lock order is book then ledger, never reversed.

use parking_lot::{Mutex, RwLock};
use position_ledger::PositionLedger;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::account::AccountProvider;
use types::bus::{EventPublisher, TOPIC_ORDERS, TOPIC_TRADES};
use types::errors::EngineError;
use types::ids::{AccountId, MarketId, OrderId};
use types::now_nanos;
use types::numeric::Price;
use types::order::{MarginMode, Order, OrderStatus, OrderType, Side};
use types::trade::Trade;

use crate::book::{BookEntry, BookSnapshot, OrderBook};
use crate::margin;
use crate::stops;

/// Per-symbol books plus the account and ledger collaborators
pub struct MatchingEngine {
    books: RwLock<HashMap<MarketId, Arc<Mutex<OrderBook>>>>,
    accounts: Arc<dyn AccountProvider>,
    ledger: Arc<PositionLedger>,
}

impl MatchingEngine {
    pub fn new(accounts: Arc<dyn AccountProvider>, ledger: Arc<PositionLedger>) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            accounts,
            ledger,
        }
    }

    /// Handle to a symbol's book, creating it on first use. Market-data
    /// consumers read depth through this; the engine's own paths lock it
    /// per operation.
    pub fn book_handle(&self, symbol: &MarketId) -> Arc<Mutex<OrderBook>> {
        if let Some(book) = self.books.read().get(symbol) {
            return book.clone();
        }
        let mut books = self.books.write();
        books
            .entry(symbol.clone())
            .or_insert_with(|| Arc::new(Mutex::new(OrderBook::new(symbol.clone()))))
            .clone()
    }

    fn existing_book(&self, symbol: &MarketId) -> Option<Arc<Mutex<OrderBook>>> {
        self.books.read().get(symbol).cloned()
    }

    /// Accept and dispatch an order.
    ///
    /// The order is mutated in place: resting/queued orders become
    /// `Pending`, immediate fills become `Filled` with quantity zeroed.
    /// A publish failure never rolls back state already applied; the
    /// first failure is remembered and surfaced once dispatch completes.
    pub fn place_order(
        &self,
        order: &mut Order,
        publisher: &dyn EventPublisher,
    ) -> Result<(), EngineError> {
        let account = self.accounts.get_account(order.account_id)?;

        // the account's registered mode governs acceptance, whatever the
        // order itself is stamped with
        if account.margin_mode == MarginMode::Isolated && order.order_type.is_conditional() {
            return Err(EngineError::UnsupportedOrderType(order.order_type));
        }

        let handle = self.book_handle(&order.symbol);
        let mut book = handle.lock();

        let reference = book
            .reference_price()
            .ok_or_else(|| EngineError::NoReferencePrice(order.symbol.clone()))?;

        match account.margin_mode {
            MarginMode::Cross => {
                margin::check_cross(&account, order.quantity, reference, order.leverage)?
            }
            MarginMode::Isolated => {
                margin::check_isolated(&account, order.quantity, reference)?
            }
        }

        let mut deferred: Option<EngineError> = None;
        self.publish(publisher, TOPIC_ORDERS, order, &mut deferred);

        match order.order_type {
            OrderType::Limit => {
                let limit = order
                    .limit_price
                    .ok_or(EngineError::MissingLimitPrice(order.order_id))?;
                match order.side {
                    // a bid below the reference rests; at or above it fills
                    // at the reference
                    Side::Buy if limit < reference => self.rest(&mut book, order, limit),
                    Side::Buy => self.fill(&mut book, order, reference, publisher, &mut deferred),
                    // an ask above the reference rests; at or below it fills
                    // at its own limit price
                    Side::Sell if limit > reference => self.rest(&mut book, order, limit),
                    Side::Sell => self.fill(&mut book, order, limit, publisher, &mut deferred),
                }
            }
            OrderType::Market => {
                self.fill(&mut book, order, reference, publisher, &mut deferred)
            }
            _ => {
                order.status = OrderStatus::Pending;
                book.push_stop(order.clone());
                debug!(order_id = %order.order_id, stop = ?order.stop_price, "stop queued");
            }
        }

        match deferred {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn rest(&self, book: &mut OrderBook, order: &mut Order, price: Price) {
        order.status = OrderStatus::Pending;
        book.insert(order.side, BookEntry::from_order(order, price));
        debug!(order_id = %order.order_id, side = ?order.side, %price, "order resting");
    }

    /// Fill the order in full at `price`, settle through the ledger, and
    /// consume the best opposite resting entry if the execution price
    /// crosses it.
    fn fill(
        &self,
        book: &mut OrderBook,
        order: &mut Order,
        price: Price,
        publisher: &dyn EventPublisher,
        deferred: &mut Option<EngineError>,
    ) {
        let (buyer_id, seller_id) = match order.side {
            Side::Buy => (order.account_id, AccountId::system()),
            Side::Sell => (AccountId::system(), order.account_id),
        };
        let trade = Trade::new(
            order.symbol.clone(),
            order.side,
            buyer_id,
            seller_id,
            price,
            order.quantity,
            now_nanos(),
        );
        info!(
            order_id = %order.order_id,
            trade_id = %trade.trade_id,
            %price,
            quantity = %trade.quantity,
            "order filled"
        );

        self.publish(publisher, TOPIC_TRADES, &trade, deferred);
        if let Err(err) = self.ledger.apply_trade(&trade, order.leverage, order.margin_mode) {
            deferred.get_or_insert(err);
        }
        order.fill();

        self.evict_crossed(book, order.side, price, publisher, deferred);
    }

    /// A fill at `price` that crosses the best opposite resting entry
    /// consumes that entry: it settles in full at its own price, with the
    /// leverage and margin mode it was queued with. At most one entry per
    /// fill.
    fn evict_crossed(
        &self,
        book: &mut OrderBook,
        fill_side: Side,
        price: Price,
        publisher: &dyn EventPublisher,
        deferred: &mut Option<EngineError>,
    ) {
        let opposite = fill_side.opposite();
        let crossed = match opposite {
            Side::Sell => book.best_ask().map(|e| price >= e.price),
            Side::Buy => book.best_bid().map(|e| price <= e.price),
        };
        if crossed != Some(true) {
            return;
        }

        let entry = match book.pop_best(opposite) {
            Some(entry) => entry,
            None => return,
        };
        let (buyer_id, seller_id) = match opposite {
            Side::Buy => (entry.account_id, AccountId::system()),
            Side::Sell => (AccountId::system(), entry.account_id),
        };
        let trade = Trade::new(
            book.symbol.clone(),
            opposite,
            buyer_id,
            seller_id,
            entry.price,
            entry.quantity,
            now_nanos(),
        );
        info!(
            order_id = %entry.order_id,
            trade_id = %trade.trade_id,
            price = %entry.price,
            "resting order consumed by crossing fill"
        );

        self.publish(publisher, TOPIC_TRADES, &trade, deferred);
        if let Err(err) = self.ledger.apply_trade(&trade, entry.leverage, entry.margin_mode) {
            deferred.get_or_insert(err);
        }
    }

    fn publish<T: serde::Serialize>(
        &self,
        publisher: &dyn EventPublisher,
        topic: &str,
        payload: &T,
        deferred: &mut Option<EngineError>,
    ) {
        let result = serde_json::to_vec(payload)
            .map_err(EngineError::from)
            .and_then(|bytes| publisher.publish(topic, &bytes).map_err(EngineError::from));
        if let Err(err) = result {
            warn!(topic, %err, "event publish failed");
            deferred.get_or_insert(err);
        }
    }

    /// Evaluate every book's conditional orders against its reference
    /// price and resubmit the triggered ones as the plain orders they
    /// stand for.
    ///
    /// Triggered stops are removed exactly once regardless of
    /// resubmission outcome; a failed resubmission is dropped, logged,
    /// and the first failure returned. Books without a reference price
    /// are skipped.
    pub fn sweep_stops(&self, publisher: &dyn EventPublisher) -> Result<(), EngineError> {
        let handles: Vec<Arc<Mutex<OrderBook>>> =
            self.books.read().values().cloned().collect();

        let mut first_failure: Option<EngineError> = None;
        for handle in handles {
            let triggered = {
                let mut book = handle.lock();
                let reference = match book.reference_price() {
                    Some(reference) => reference,
                    None => continue,
                };
                book.drain_triggered_stops(|o| stops::should_trigger(o, reference))
            };

            // resubmit after the book lock is released; place_order
            // re-locks the same book
            for stop in triggered {
                let mut activated = stops::activate(&stop, now_nanos());
                info!(
                    order_id = %activated.order_id,
                    order_type = ?activated.order_type,
                    "stop triggered"
                );
                if let Err(err) = self.place_order(&mut activated, publisher) {
                    warn!(order_id = %activated.order_id, %err, "stop resubmission failed");
                    first_failure.get_or_insert(err);
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Remove a resting limit order; true if it was found
    pub fn cancel_order(
        &self,
        symbol: &MarketId,
        order_id: &OrderId,
        side: Side,
        price: Price,
    ) -> bool {
        let Some(handle) = self.existing_book(symbol) else {
            return false;
        };
        let removed = handle.lock().remove(side, order_id, price).is_some();
        if removed {
            debug!(%order_id, %symbol, "resting order cancelled");
        }
        removed
    }

    /// Remove a queued conditional order; true if it was found
    pub fn cancel_stop(&self, symbol: &MarketId, order_id: &OrderId) -> bool {
        let Some(handle) = self.existing_book(symbol) else {
            return false;
        };
        let removed = handle.lock().remove_stop(order_id).is_some();
        if removed {
            debug!(%order_id, %symbol, "stop cancelled");
        }
        removed
    }

    /// Current reference price for a symbol, if its book is two-sided
    pub fn reference_price(&self, symbol: &MarketId) -> Option<Price> {
        self.existing_book(symbol)?.lock().reference_price()
    }

    /// Top-N depth per side
    pub fn book_snapshot(&self, symbol: &MarketId, depth: usize) -> Option<BookSnapshot> {
        Some(self.existing_book(symbol)?.lock().depth_snapshot(depth))
    }
}
