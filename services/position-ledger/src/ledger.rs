//! Position map and trade application
//!
//! One position per (account, symbol), created lazily on first fill and
//! zeroed rather than deleted when it closes. Every read, create, and
//! update runs under the ledger's single lock, so readers never observe a
//! partially-updated position.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use types::bus::{EventPublisher, TOPIC_POSITION_UPDATED};
use types::errors::EngineError;
use types::ids::{AccountId, MarketId};
use types::numeric::Price;
use types::order::MarginMode;
use types::position::{Position, PositionSide};
use types::trade::Trade;

use crate::ledger::apply::apply_fill;

/// Fixed allocation factor an isolated position reserves against its
/// notional; mirrors the reservation taken at order placement.
const ISOLATED_ALLOCATION_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 1); // 0.1

/// The single writer of position state
pub struct PositionLedger {
    positions: Mutex<HashMap<(AccountId, MarketId), Position>>,
    publisher: Arc<dyn EventPublisher>,
}

impl PositionLedger {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            positions: Mutex::new(HashMap::new()),
            publisher,
        }
    }

    /// Apply a fill to the acting account's position.
    ///
    /// The acting account is the non-synthetic side of the trade. The
    /// mutation is applied under the ledger lock; the position-updated
    /// event is published afterwards and a publish failure is surfaced
    /// without rolling the mutation back.
    pub fn apply_trade(
        &self,
        trade: &Trade,
        leverage: u8,
        margin_mode: MarginMode,
    ) -> Result<Position, EngineError> {
        let (account_id, side) = trade.real_account();

        let snapshot = {
            let mut positions = self.positions.lock();
            let position = positions
                .entry((account_id, trade.symbol.clone()))
                .or_insert_with(|| {
                    Position::flat(account_id, trade.symbol.clone(), trade.executed_at)
                });

            apply_fill(position, side, trade.price, trade.quantity, leverage);
            refresh_margins(position, margin_mode);
            position.update_mark_price(trade.price, trade.executed_at);
            position.clone()
        };

        debug!(
            account = %account_id,
            symbol = %trade.symbol,
            quantity = %snapshot.quantity,
            entry = %snapshot.entry_price,
            realized = %snapshot.realized_pnl,
            "position updated from trade"
        );

        self.publish_position(&snapshot)?;
        Ok(snapshot)
    }

    /// Look up the position for (account, symbol)
    pub fn get_position(
        &self,
        account_id: AccountId,
        symbol: &MarketId,
    ) -> Result<Position, EngineError> {
        self.positions
            .lock()
            .get(&(account_id, symbol.clone()))
            .cloned()
            .ok_or_else(|| EngineError::PositionNotFound {
                account_id,
                symbol: symbol.clone(),
            })
    }

    /// Every position with non-zero quantity, in unspecified order
    pub fn all_positions(&self) -> Vec<Position> {
        self.positions
            .lock()
            .values()
            .filter(|p| !p.is_flat())
            .cloned()
            .collect()
    }

    /// Refresh mark price and unrealized PnL for every open position on a
    /// symbol, publishing an update per changed position.
    pub fn mark_to_market(
        &self,
        symbol: &MarketId,
        mark: Price,
        timestamp: i64,
    ) -> Result<(), EngineError> {
        let snapshots: Vec<Position> = {
            let mut positions = self.positions.lock();
            positions
                .values_mut()
                .filter(|p| &p.symbol == symbol && !p.is_flat())
                .map(|p| {
                    p.update_mark_price(mark, timestamp);
                    p.clone()
                })
                .collect()
        };

        let mut first_failure = None;
        for snapshot in &snapshots {
            if let Err(err) = self.publish_position(snapshot) {
                first_failure.get_or_insert(err);
            }
        }
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn publish_position(&self, position: &Position) -> Result<(), EngineError> {
        let payload = serde_json::to_vec(position)?;
        self.publisher
            .publish(TOPIC_POSITION_UPDATED, &payload)
            .map_err(|err| {
                warn!(topic = TOPIC_POSITION_UPDATED, %err, "event publish failed");
                EngineError::from(err)
            })
    }
}

/// Recompute the margin fields after a mutation. `maintenance_margin` and
/// `liquidation_price` stay with downstream risk tooling.
fn refresh_margins(position: &mut Position, margin_mode: MarginMode) {
    if position.is_flat() {
        position.initial_margin = Decimal::ZERO;
        position.allocated_margin = Decimal::ZERO;
        return;
    }
    position.initial_margin = position.margin_required();
    if margin_mode == MarginMode::Isolated {
        position.allocated_margin = position.quantity.as_decimal()
            * position.entry_price.as_decimal()
            * ISOLATED_ALLOCATION_RATE;
    }
}

mod apply {
    use super::*;
    use types::numeric::Quantity;
    use types::order::Side;

    /// Core position arithmetic for a single fill.
    ///
    /// - flat: the fill opens the position at its price
    /// - same direction: quantity-weighted average entry, quantity grows
    /// - opposite, smaller: partial close, realizing PnL on the fill
    /// - opposite, equal: full close, position zeroed
    /// - opposite, larger: close fully, then flip with the excess at the
    ///   fill price
    pub(super) fn apply_fill(
        position: &mut Position,
        side: Side,
        price: Price,
        quantity: Quantity,
        leverage: u8,
    ) {
        if position.is_flat() {
            position.side = PositionSide::from_order_side(side);
            position.entry_price = price;
            position.quantity = quantity;
            position.leverage = leverage.max(1);
            return;
        }

        if position.side.accumulates(side) {
            let old_qty = position.quantity.as_decimal();
            let fill_qty = quantity.as_decimal();
            let total = old_qty + fill_qty;
            let blended = (position.entry_price.as_decimal() * old_qty
                + price.as_decimal() * fill_qty)
                / total;
            // blended entry of two non-negative prices is non-negative
            if let Some(entry) = Price::try_new(blended) {
                position.entry_price = entry;
            }
            position.quantity = position.quantity + quantity;
            position.leverage = leverage.max(1);
            return;
        }

        if quantity < position.quantity {
            position.realized_pnl +=
                Position::pnl_at(position.side, position.entry_price, price, quantity);
            position.quantity = position.quantity.saturating_sub(quantity);
            return;
        }

        // full close, possibly flipping into the opposite side
        position.realized_pnl +=
            Position::pnl_at(position.side, position.entry_price, price, position.quantity);
        let excess = quantity.saturating_sub(position.quantity);
        if excess.is_zero() {
            position.quantity = Quantity::zero();
        } else {
            position.side = PositionSide::from_order_side(side);
            position.entry_price = price;
            position.quantity = excess;
            position.leverage = leverage.max(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use types::bus::{FailingPublisher, MemoryPublisher};
    use types::numeric::Quantity;
    use types::order::Side;

    fn ledger() -> (PositionLedger, Arc<MemoryPublisher>) {
        let publisher = Arc::new(MemoryPublisher::new());
        (PositionLedger::new(publisher.clone()), publisher)
    }

    fn buy_trade(account: AccountId, price: u64, qty: &str) -> Trade {
        Trade::new(
            MarketId::new("BTCUSDT"),
            Side::Buy,
            account,
            AccountId::system(),
            Price::from_u64(price),
            Quantity::from_str(qty).unwrap(),
            1708123456789000000,
        )
    }

    fn sell_trade(account: AccountId, price: u64, qty: &str) -> Trade {
        Trade::new(
            MarketId::new("BTCUSDT"),
            Side::Sell,
            AccountId::system(),
            account,
            Price::from_u64(price),
            Quantity::from_str(qty).unwrap(),
            1708123456789000000,
        )
    }

    #[test]
    fn test_first_fill_opens_position() {
        let (ledger, publisher) = ledger();
        let account = AccountId::new();

        let position = ledger
            .apply_trade(&buy_trade(account, 50000, "1.0"), 10, MarginMode::Cross)
            .unwrap();

        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.entry_price, Price::from_u64(50000));
        assert_eq!(position.quantity, Quantity::from_u64(1));
        assert_eq!(position.leverage, 10);
        assert_eq!(position.initial_margin, Decimal::from(5000));
        assert_eq!(position.mark_price, Price::from_u64(50000));
        assert_eq!(publisher.count(TOPIC_POSITION_UPDATED), 1);
    }

    #[test]
    fn test_same_direction_weighted_average() {
        let (ledger, _) = ledger();
        let account = AccountId::new();

        ledger
            .apply_trade(&buy_trade(account, 100, "1.0"), 10, MarginMode::Cross)
            .unwrap();
        let position = ledger
            .apply_trade(&buy_trade(account, 200, "3.0"), 10, MarginMode::Cross)
            .unwrap();

        // (100×1 + 200×3) / 4 = 175
        assert_eq!(position.entry_price, Price::from_u64(175));
        assert_eq!(position.quantity, Quantity::from_u64(4));
    }

    #[test]
    fn test_partial_close_realizes_pnl() {
        let (ledger, _) = ledger();
        let account = AccountId::new();

        ledger
            .apply_trade(&buy_trade(account, 100, "4.0"), 10, MarginMode::Cross)
            .unwrap();
        let position = ledger
            .apply_trade(&sell_trade(account, 110, "1.0"), 10, MarginMode::Cross)
            .unwrap();

        assert_eq!(position.side, PositionSide::Long);
        assert_eq!(position.quantity, Quantity::from_u64(3));
        assert_eq!(position.entry_price, Price::from_u64(100));
        assert_eq!(position.realized_pnl, Decimal::from(10)); // (110 - 100) × 1
    }

    #[test]
    fn test_short_partial_close_sign() {
        let (ledger, _) = ledger();
        let account = AccountId::new();

        ledger
            .apply_trade(&sell_trade(account, 100, "2.0"), 10, MarginMode::Cross)
            .unwrap();
        let position = ledger
            .apply_trade(&buy_trade(account, 90, "1.0"), 10, MarginMode::Cross)
            .unwrap();

        assert_eq!(position.side, PositionSide::Short);
        assert_eq!(position.realized_pnl, Decimal::from(10)); // (100 - 90) × 1
    }

    #[test]
    fn test_exact_close_zeroes_position() {
        let (ledger, _) = ledger();
        let account = AccountId::new();

        ledger
            .apply_trade(&buy_trade(account, 100, "2.0"), 10, MarginMode::Isolated)
            .unwrap();
        let position = ledger
            .apply_trade(&sell_trade(account, 120, "2.0"), 10, MarginMode::Isolated)
            .unwrap();

        assert!(position.is_flat());
        assert_eq!(position.realized_pnl, Decimal::from(40)); // (120 - 100) × 2
        assert_eq!(position.initial_margin, Decimal::ZERO);
        assert_eq!(position.allocated_margin, Decimal::ZERO);

        // zeroed, not deleted: still resolvable, absent from all_positions
        assert!(ledger.get_position(account, &MarketId::new("BTCUSDT")).is_ok());
        assert!(ledger.all_positions().is_empty());
    }

    #[test]
    fn test_close_and_flip() {
        let (ledger, _) = ledger();
        let account = AccountId::new();

        ledger
            .apply_trade(&buy_trade(account, 100, "2.0"), 10, MarginMode::Cross)
            .unwrap();
        let position = ledger
            .apply_trade(&sell_trade(account, 110, "5.0"), 20, MarginMode::Cross)
            .unwrap();

        // realize (110 - 100) × 2, then open short 3 @ 110
        assert_eq!(position.realized_pnl, Decimal::from(20));
        assert_eq!(position.side, PositionSide::Short);
        assert_eq!(position.quantity, Quantity::from_u64(3));
        assert_eq!(position.entry_price, Price::from_u64(110));
        assert_eq!(position.leverage, 20);
    }

    #[test]
    fn test_isolated_allocation_set() {
        let (ledger, _) = ledger();
        let account = AccountId::new();

        let position = ledger
            .apply_trade(&buy_trade(account, 100, "5.0"), 10, MarginMode::Isolated)
            .unwrap();

        // 5 × 100 × 0.10
        assert_eq!(position.allocated_margin, Decimal::from(50));
    }

    #[test]
    fn test_publish_failure_surfaced_after_mutation() {
        let ledger = PositionLedger::new(Arc::new(FailingPublisher));
        let account = AccountId::new();

        let err = ledger
            .apply_trade(&buy_trade(account, 100, "1.0"), 10, MarginMode::Cross)
            .unwrap_err();
        assert!(matches!(err, EngineError::Publish(_)));

        // the mutation stuck even though the publish failed
        let position = ledger.get_position(account, &MarketId::new("BTCUSDT")).unwrap();
        assert_eq!(position.quantity, Quantity::from_u64(1));
    }

    #[test]
    fn test_get_position_missing() {
        let (ledger, _) = ledger();
        let err = ledger
            .get_position(AccountId::new(), &MarketId::new("BTCUSDT"))
            .unwrap_err();
        assert!(matches!(err, EngineError::PositionNotFound { .. }));
    }

    #[test]
    fn test_mark_to_market() {
        let (ledger, publisher) = ledger();
        let account = AccountId::new();
        let symbol = MarketId::new("BTCUSDT");

        ledger
            .apply_trade(&buy_trade(account, 100, "2.0"), 10, MarginMode::Cross)
            .unwrap();
        ledger.mark_to_market(&symbol, Price::from_u64(130), 1).unwrap();

        let position = ledger.get_position(account, &symbol).unwrap();
        assert_eq!(position.mark_price, Price::from_u64(130));
        assert_eq!(position.unrealized_pnl, Decimal::from(60)); // (130 - 100) × 2
        assert_eq!(publisher.count(TOPIC_POSITION_UPDATED), 2);
    }

    proptest! {
        // A run of same-direction fills lands on the quantity-weighted
        // average of the fill prices.
        #[test]
        fn prop_weighted_average_entry(
            fills in prop::collection::vec((1u64..=1000, 1u64..=50), 1..8)
        ) {
            let (ledger, _) = ledger();
            let account = AccountId::new();

            let mut notional = Decimal::ZERO;
            let mut total_qty = Decimal::ZERO;
            let mut last = None;
            for (price, qty) in &fills {
                let trade = Trade::new(
                    MarketId::new("BTCUSDT"),
                    Side::Buy,
                    account,
                    AccountId::system(),
                    Price::from_u64(*price),
                    Quantity::from_u64(*qty),
                    0,
                );
                notional += Decimal::from(*price) * Decimal::from(*qty);
                total_qty += Decimal::from(*qty);
                last = Some(ledger.apply_trade(&trade, 10, MarginMode::Cross).unwrap());
            }

            let expected = notional / total_qty;
            let entry = last.unwrap().entry_price.as_decimal();
            let tolerance = Decimal::from_str_exact("0.0000001").unwrap();
            prop_assert!((entry - expected).abs() < tolerance);
        }
    }
}
