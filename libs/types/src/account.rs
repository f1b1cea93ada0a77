//! Margin account view and the account collaborator
//!
//! Accounts are owned by an external user service; the core reads balance,
//! margin mode, and existing positions through `AccountProvider` and writes
//! balance changes back through the same seam. `MemoryAccounts` is the
//! in-process reference implementation used by tests and embeddings.

use crate::errors::EngineError;
use crate::ids::{AccountId, MarketId};
use crate::order::MarginMode;
use crate::position::Position;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Margin-relevant read view of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginAccount {
    pub account_id: AccountId,
    pub total_balance: Decimal,
    pub margin_mode: MarginMode,
    pub positions: Vec<Position>,
}

impl MarginAccount {
    pub fn new(account_id: AccountId, total_balance: Decimal, margin_mode: MarginMode) -> Self {
        Self {
            account_id,
            total_balance,
            margin_mode,
            positions: Vec::new(),
        }
    }
}

/// Account/user collaborator
pub trait AccountProvider: Send + Sync {
    /// Fetch the margin view of an account
    fn get_account(&self, account_id: AccountId) -> Result<MarginAccount, EngineError>;

    /// Apply a signed balance change
    fn adjust_balance(&self, account_id: AccountId, delta: Decimal) -> Result<(), EngineError>;
}

/// In-memory account store
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: Mutex<HashMap<AccountId, MarginAccount>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with a starting balance
    pub fn insert(&self, account_id: AccountId, balance: Decimal, margin_mode: MarginMode) {
        self.accounts
            .lock()
            .insert(account_id, MarginAccount::new(account_id, balance, margin_mode));
    }

    /// Replace the positions the margin check sees for an account
    pub fn set_positions(
        &self,
        account_id: AccountId,
        positions: Vec<Position>,
    ) -> Result<(), EngineError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&account_id)
            .ok_or(EngineError::AccountNotFound(account_id))?;
        account.positions = positions;
        Ok(())
    }

    /// Credit the account balance
    pub fn deposit(&self, account_id: AccountId, amount: Decimal) -> Result<(), EngineError> {
        self.adjust_balance(account_id, amount)
    }

    /// Move balance into a position's allocated margin.
    ///
    /// Under cross margin the whole balance already backs every position,
    /// so the amount is simply credited; under isolated margin it is moved
    /// from the balance into the named position's allocation.
    pub fn add_margin_to_position(
        &self,
        account_id: AccountId,
        symbol: &MarketId,
        amount: Decimal,
    ) -> Result<(), EngineError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&account_id)
            .ok_or(EngineError::AccountNotFound(account_id))?;

        if account.total_balance < amount {
            return Err(EngineError::InsufficientMargin {
                required: amount,
                available: account.total_balance,
            });
        }

        if account.margin_mode == MarginMode::Cross {
            account.total_balance += amount;
            return Ok(());
        }

        let position = account
            .positions
            .iter_mut()
            .find(|p| &p.symbol == symbol)
            .ok_or_else(|| EngineError::PositionNotFound {
                account_id,
                symbol: symbol.clone(),
            })?;
        position.allocated_margin += amount;
        account.total_balance -= amount;
        Ok(())
    }
}

impl AccountProvider for MemoryAccounts {
    fn get_account(&self, account_id: AccountId) -> Result<MarginAccount, EngineError> {
        self.accounts
            .lock()
            .get(&account_id)
            .cloned()
            .ok_or(EngineError::AccountNotFound(account_id))
    }

    fn adjust_balance(&self, account_id: AccountId, delta: Decimal) -> Result<(), EngineError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&account_id)
            .ok_or(EngineError::AccountNotFound(account_id))?;
        account.total_balance += delta;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_account_missing() {
        let accounts = MemoryAccounts::new();
        let missing = AccountId::new();
        assert_eq!(
            accounts.get_account(missing),
            Err(EngineError::AccountNotFound(missing))
        );
    }

    #[test]
    fn test_insert_and_adjust_balance() {
        let accounts = MemoryAccounts::new();
        let id = AccountId::new();
        accounts.insert(id, Decimal::from(1000), MarginMode::Cross);

        accounts.adjust_balance(id, Decimal::from(-250)).unwrap();
        let account = accounts.get_account(id).unwrap();
        assert_eq!(account.total_balance, Decimal::from(750));
        assert_eq!(account.margin_mode, MarginMode::Cross);
    }

    #[test]
    fn test_deposit() {
        let accounts = MemoryAccounts::new();
        let id = AccountId::new();
        accounts.insert(id, Decimal::ZERO, MarginMode::Isolated);

        accounts.deposit(id, Decimal::from(500)).unwrap();
        assert_eq!(accounts.get_account(id).unwrap().total_balance, Decimal::from(500));
    }

    #[test]
    fn test_add_margin_isolated() {
        let accounts = MemoryAccounts::new();
        let id = AccountId::new();
        let symbol = MarketId::new("BTCUSDT");
        accounts.insert(id, Decimal::from(1000), MarginMode::Isolated);
        accounts
            .set_positions(id, vec![Position::flat(id, symbol.clone(), 0)])
            .unwrap();

        accounts
            .add_margin_to_position(id, &symbol, Decimal::from(300))
            .unwrap();

        let account = accounts.get_account(id).unwrap();
        assert_eq!(account.total_balance, Decimal::from(700));
        assert_eq!(account.positions[0].allocated_margin, Decimal::from(300));
    }

    #[test]
    fn test_add_margin_unknown_position() {
        let accounts = MemoryAccounts::new();
        let id = AccountId::new();
        accounts.insert(id, Decimal::from(1000), MarginMode::Isolated);

        let err = accounts
            .add_margin_to_position(id, &MarketId::new("BTCUSDT"), Decimal::from(300))
            .unwrap_err();
        assert!(matches!(err, EngineError::PositionNotFound { .. }));
    }

    #[test]
    fn test_add_margin_insufficient_balance() {
        let accounts = MemoryAccounts::new();
        let id = AccountId::new();
        accounts.insert(id, Decimal::from(100), MarginMode::Isolated);

        let err = accounts
            .add_margin_to_position(id, &MarketId::new("BTCUSDT"), Decimal::from(300))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientMargin { .. }));
    }
}
