//! Per-operation unit of work.
//!
//! A [`Transaction`] applies ledger effects immediately (so anything that
//! re-enters during the operation observes them), records how to undo each
//! one, stages events, and queues the external token calls. External calls
//! only run at [`Transaction::commit`], after every check in the operation
//! body has passed.
//!
//! Commit runs the engine-reversible interactions (pulls into custody, burns
//! of custody) before the irreversible ones (pushes out of custody, mints). If
//! any interaction fails, completed ones are compensated newest first and the
//! ledger is reverted.

use alloy::primitives::{Address, U256};
use tracing::{debug, error, warn};

use crate::engine::CollateralEngine;
use crate::error::{EngineError, Result};
use crate::events::EngineEvent;
use crate::ledger::LedgerEntry;

/// A queued external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Pull collateral from `from` into engine custody
    PullCollateral {
        asset: Address,
        from: Address,
        amount: U256,
    },
    /// Push collateral out of engine custody to `to`
    PushCollateral {
        asset: Address,
        to: Address,
        amount: U256,
    },
    /// Pull debt tokens from `from` into engine custody
    PullDebt { from: Address, amount: U256 },
    /// Destroy debt tokens held in engine custody
    BurnDebt { amount: U256 },
    /// Create debt tokens for `to`
    MintDebt { to: Address, amount: U256 },
}

impl Interaction {
    /// Whether the engine can undo this call on its own authority.
    fn is_reversible(&self) -> bool {
        matches!(
            self,
            Self::PullCollateral { .. } | Self::PullDebt { .. } | Self::BurnDebt { .. }
        )
    }

    fn execute(&self, engine: &CollateralEngine) -> Result<()> {
        let this = engine.address();
        match *self {
            Self::PullCollateral {
                asset,
                from,
                amount,
            } => {
                let token = &engine.assets().require(&asset)?.token;
                if !token.transfer_from(from, this, amount) {
                    return Err(EngineError::TransferFailed { token: asset });
                }
            }
            Self::PushCollateral { asset, to, amount } => {
                let token = &engine.assets().require(&asset)?.token;
                if !token.transfer(to, amount) {
                    return Err(EngineError::TransferFailed { token: asset });
                }
            }
            Self::PullDebt { from, amount } => {
                let debt = engine.debt_token_handle();
                if !debt.transfer_from(from, this, amount) {
                    return Err(EngineError::TransferFailed {
                        token: debt.address(),
                    });
                }
            }
            Self::BurnDebt { amount } => {
                if !engine.debt_token_handle().burn(amount) {
                    return Err(EngineError::BurnFailed);
                }
            }
            Self::MintDebt { to, amount } => {
                if !engine.debt_token_handle().mint(to, amount) {
                    return Err(EngineError::MintFailed);
                }
            }
        }
        Ok(())
    }

    /// Undo a completed reversible call. Returns false if the undo failed.
    fn compensate(&self, engine: &CollateralEngine) -> bool {
        match *self {
            Self::PullCollateral {
                asset,
                from,
                amount,
            } => engine
                .assets()
                .get(&asset)
                .is_some_and(|a| a.token.transfer(from, amount)),
            Self::PullDebt { from, amount } => engine.debt_token_handle().transfer(from, amount),
            Self::BurnDebt { amount } => engine
                .debt_token_handle()
                .mint(engine.address(), amount),
            Self::PushCollateral { .. } | Self::MintDebt { .. } => false,
        }
    }
}

/// Unit of work for one guarded engine operation.
pub struct Transaction<'e> {
    engine: &'e CollateralEngine,
    journal: Vec<LedgerEntry>,
    events: Vec<EngineEvent>,
    interactions: Vec<Interaction>,
}

impl<'e> Transaction<'e> {
    pub(crate) fn new(engine: &'e CollateralEngine) -> Self {
        Self {
            engine,
            journal: Vec::new(),
            events: Vec::new(),
            interactions: Vec::new(),
        }
    }

    /// Credit collateral, stage the notification, queue the pull from `account`.
    pub fn deposit(&mut self, account: Address, asset: Address, amount: U256) -> Result<()> {
        require_non_zero(amount)?;
        self.engine.assets().require(&asset)?;

        let entry = self
            .engine
            .store()
            .write()
            .credit_collateral(account, asset, amount)?;
        self.journal.push(entry);
        self.events.push(EngineEvent::CollateralDeposited {
            account,
            asset,
            amount,
        });
        self.interactions.push(Interaction::PullCollateral {
            asset,
            from: account,
            amount,
        });
        Ok(())
    }

    /// Debit collateral from `from`, stage the notification, queue the push to `to`.
    ///
    /// Does not check the health factor of `from`.
    pub fn redeem(
        &mut self,
        from: Address,
        to: Address,
        asset: Address,
        amount: U256,
    ) -> Result<()> {
        require_non_zero(amount)?;
        self.engine.assets().require(&asset)?;

        let entry = self
            .engine
            .store()
            .write()
            .debit_collateral(from, asset, amount)?;
        self.journal.push(entry);
        self.events.push(EngineEvent::CollateralRedeemed {
            from,
            to,
            asset,
            amount,
        });
        self.interactions
            .push(Interaction::PushCollateral { asset, to, amount });
        Ok(())
    }

    /// Increase debt and queue the mint. The caller checks health before commit.
    pub fn mint(&mut self, account: Address, amount: U256) -> Result<()> {
        require_non_zero(amount)?;

        let entry = self.engine.store().write().increase_debt(account, amount)?;
        self.journal.push(entry);
        self.events.push(EngineEvent::DebtMinted { account, amount });
        self.interactions
            .push(Interaction::MintDebt { to: account, amount });
        Ok(())
    }

    /// Decrease debt of `on_behalf_of`, queue pulling `amount` from `payer` and burning it.
    pub fn burn(&mut self, on_behalf_of: Address, payer: Address, amount: U256) -> Result<()> {
        require_non_zero(amount)?;

        let entry = self
            .engine
            .store()
            .write()
            .decrease_debt(on_behalf_of, amount)?;
        self.journal.push(entry);
        self.events.push(EngineEvent::DebtBurned {
            on_behalf_of,
            payer,
            amount,
        });
        self.interactions.push(Interaction::PullDebt {
            from: payer,
            amount,
        });
        self.interactions.push(Interaction::BurnDebt { amount });
        Ok(())
    }

    /// Stage a notification not tied to a single ledger primitive.
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Run the queued interactions and publish events, or undo everything.
    pub fn commit(mut self) -> Result<()> {
        let mut ordered = std::mem::take(&mut self.interactions);
        // Stable: queue order is kept within each class.
        ordered.sort_by_key(|i| !i.is_reversible());
        debug_assert!(ordered.iter().filter(|i| !i.is_reversible()).count() <= 1);

        let mut completed = Vec::with_capacity(ordered.len());
        for interaction in ordered {
            if let Err(err) = interaction.execute(self.engine) {
                warn!(?interaction, error = %err, "Interaction failed, unwinding operation");
                self.compensate(&completed);
                self.rollback();
                return Err(err);
            }
            completed.push(interaction);
        }

        self.engine.publish(std::mem::take(&mut self.events));
        Ok(())
    }

    /// Revert every ledger effect of this transaction and drop its events.
    pub fn rollback(mut self) {
        let mut store = self.engine.store().write();
        for entry in self.journal.drain(..).rev() {
            store.revert(&entry);
        }
        debug!(dropped_events = self.events.len(), "Operation rolled back");
    }

    fn compensate(&self, completed: &[Interaction]) {
        for interaction in completed.iter().rev() {
            if !interaction.compensate(self.engine) {
                error!(?interaction, "Failed to compensate completed interaction");
            }
        }
    }
}

fn require_non_zero(amount: U256) -> Result<()> {
    if amount.is_zero() {
        return Err(EngineError::AmountMustBeMoreThanZero);
    }
    Ok(())
}
