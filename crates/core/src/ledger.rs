//! Collateral and debt ledgers.
//!
//! Rows are created at zero on first touch and never removed. Every mutation
//! returns the [`LedgerEntry`] needed to undo it.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;

use crate::error::{EngineError, Result};

/// A single applied ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntry {
    CollateralCredited {
        account: Address,
        asset: Address,
        amount: U256,
    },
    CollateralDebited {
        account: Address,
        asset: Address,
        amount: U256,
    },
    DebtIncreased {
        account: Address,
        amount: U256,
    },
    DebtDecreased {
        account: Address,
        amount: U256,
    },
}

/// Per-account balance tables plus running totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerStore {
    /// account → asset → amount
    collateral: HashMap<Address, HashMap<Address, U256>>,
    /// account → issued debt
    debt: HashMap<Address, U256>,
    /// asset → total deposited
    collateral_totals: HashMap<Address, U256>,
    /// Sum of all debt rows
    total_debt: U256,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collateral balance of `account` in `asset`.
    pub fn collateral_balance(&self, account: &Address, asset: &Address) -> U256 {
        self.collateral
            .get(account)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Outstanding debt of `account`.
    pub fn debt_of(&self, account: &Address) -> U256 {
        self.debt.get(account).copied().unwrap_or(U256::ZERO)
    }

    /// Total deposited across all accounts for `asset`.
    pub fn total_collateral(&self, asset: &Address) -> U256 {
        self.collateral_totals
            .get(asset)
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Total outstanding debt.
    pub fn total_debt(&self) -> U256 {
        self.total_debt
    }

    /// Increase a collateral row.
    pub fn credit_collateral(
        &mut self,
        account: Address,
        asset: Address,
        amount: U256,
    ) -> Result<LedgerEntry> {
        let balance = self.collateral_balance(&account, &asset);
        let total = self.total_collateral(&asset);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(EngineError::ArithmeticOverflow)?;
        let new_total = total
            .checked_add(amount)
            .ok_or(EngineError::ArithmeticOverflow)?;

        self.set_collateral(account, asset, new_balance, new_total);
        Ok(LedgerEntry::CollateralCredited {
            account,
            asset,
            amount,
        })
    }

    /// Decrease a collateral row, refusing to go negative.
    pub fn debit_collateral(
        &mut self,
        account: Address,
        asset: Address,
        amount: U256,
    ) -> Result<LedgerEntry> {
        let balance = self.collateral_balance(&account, &asset);
        let new_balance = balance
            .checked_sub(amount)
            .ok_or(EngineError::ArithmeticUnderflow {
                available: balance,
                requested: amount,
            })?;
        let new_total = self.total_collateral(&asset).saturating_sub(amount);

        self.set_collateral(account, asset, new_balance, new_total);
        Ok(LedgerEntry::CollateralDebited {
            account,
            asset,
            amount,
        })
    }

    /// Increase a debt row.
    pub fn increase_debt(&mut self, account: Address, amount: U256) -> Result<LedgerEntry> {
        let new_debt = self
            .debt_of(&account)
            .checked_add(amount)
            .ok_or(EngineError::ArithmeticOverflow)?;
        let new_total = self
            .total_debt
            .checked_add(amount)
            .ok_or(EngineError::ArithmeticOverflow)?;

        self.debt.insert(account, new_debt);
        self.total_debt = new_total;
        Ok(LedgerEntry::DebtIncreased { account, amount })
    }

    /// Decrease a debt row, refusing to go negative.
    pub fn decrease_debt(&mut self, account: Address, amount: U256) -> Result<LedgerEntry> {
        let debt = self.debt_of(&account);
        let new_debt = debt
            .checked_sub(amount)
            .ok_or(EngineError::ArithmeticUnderflow {
                available: debt,
                requested: amount,
            })?;

        self.debt.insert(account, new_debt);
        self.total_debt = self.total_debt.saturating_sub(amount);
        Ok(LedgerEntry::DebtDecreased { account, amount })
    }

    /// Apply the inverse of `entry`.
    ///
    /// Entries must be reverted newest first; under that order the inverse
    /// arithmetic cannot fail.
    pub fn revert(&mut self, entry: &LedgerEntry) {
        match *entry {
            LedgerEntry::CollateralCredited {
                account,
                asset,
                amount,
            } => {
                let balance = self.collateral_balance(&account, &asset);
                let total = self.total_collateral(&asset);
                debug_assert!(balance >= amount);
                self.set_collateral(
                    account,
                    asset,
                    balance.saturating_sub(amount),
                    total.saturating_sub(amount),
                );
            }
            LedgerEntry::CollateralDebited {
                account,
                asset,
                amount,
            } => {
                let balance = self.collateral_balance(&account, &asset);
                let total = self.total_collateral(&asset);
                self.set_collateral(
                    account,
                    asset,
                    balance.saturating_add(amount),
                    total.saturating_add(amount),
                );
            }
            LedgerEntry::DebtIncreased { account, amount } => {
                let debt = self.debt_of(&account);
                debug_assert!(debt >= amount);
                self.debt.insert(account, debt.saturating_sub(amount));
                self.total_debt = self.total_debt.saturating_sub(amount);
            }
            LedgerEntry::DebtDecreased { account, amount } => {
                let debt = self.debt_of(&account);
                self.debt.insert(account, debt.saturating_add(amount));
                self.total_debt = self.total_debt.saturating_add(amount);
            }
        }
    }

    fn set_collateral(&mut self, account: Address, asset: Address, balance: U256, total: U256) {
        self.collateral
            .entry(account)
            .or_default()
            .insert(asset, balance);
        self.collateral_totals.insert(asset, total);
    }
}
