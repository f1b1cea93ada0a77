//! Portfolio-level aggregations over open positions

use position_ledger::PositionLedger;
use rust_decimal::Decimal;
use std::sync::Arc;
use types::position::Position;

/// Read-only view of open risk
pub struct RiskView {
    ledger: Arc<PositionLedger>,
}

impl RiskView {
    pub fn new(ledger: Arc<PositionLedger>) -> Self {
        Self { ledger }
    }

    /// Every open (non-zero quantity) position
    pub fn positions(&self) -> Vec<Position> {
        self.ledger.all_positions()
    }

    /// `Σ position.unrealized_pnl`
    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.positions()
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc + p.unrealized_pnl)
    }

    /// `Σ position.initial_margin`
    pub fn total_initial_margin(&self) -> Decimal {
        self.positions()
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc + p.initial_margin)
    }

    /// `Σ (position.quantity × position.mark_price)`
    pub fn total_exposure(&self) -> Decimal {
        self.positions().iter().fold(Decimal::ZERO, |acc, p| {
            acc + p.quantity.as_decimal() * p.mark_price.as_decimal()
        })
    }
}
