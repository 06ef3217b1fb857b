//! Collateral engine: public operations and read accessors.
//!
//! Every mutating operation runs inside [`CollateralEngine::execute`]: it takes
//! the reentrancy guard, applies its ledger effects through a
//! [`Transaction`], verifies health factors, and only then lets the
//! transaction perform the external token calls.

use alloy::primitives::{Address, U256};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use synth_chain::{CollateralToken, DebtToken, PriceOracle};
use tracing::{debug, info, instrument, warn};

use crate::assets::AssetRegistry;
use crate::error::{EngineError, Result};
use crate::events::EngineEvent;
use crate::guard::ReentrancyGuard;
use crate::health::{RiskParameters, LIQUIDATION_PRECISION};
use crate::ledger::LedgerStore;
use crate::oracle::OracleAdapter;
use crate::transaction::Transaction;
use crate::u256_math::{format_hf, wad_to_f64, ADDITIONAL_FEED_PRECISION, WAD};

/// System-wide collateralization snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolvencyReport {
    /// USD value (WAD) of all deposited collateral
    pub total_collateral_usd: U256,
    /// Outstanding debt recorded in the ledger
    pub total_debt: U256,
    /// Debt token supply reported by the token itself
    pub debt_token_supply: U256,
    /// Collateral value exceeds debt (or there is no debt)
    pub is_solvent: bool,
}

/// Multi-asset collateral and debt engine.
pub struct CollateralEngine {
    /// Identity the engine holds custody under
    address: Address,
    /// Registered collateral assets
    assets: AssetRegistry,
    /// Debt token (engine is sole minter/burner)
    debt_token: Arc<dyn DebtToken>,
    /// Price conversions
    oracle: OracleAdapter,
    /// Threshold, bonus and floor
    params: RiskParameters,
    /// Collateral and debt ledgers
    store: RwLock<LedgerStore>,
    /// Non-reentrant lock
    guard: ReentrancyGuard,
    /// Published notifications
    events: Mutex<Vec<EngineEvent>>,
}

impl std::fmt::Debug for CollateralEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollateralEngine")
            .field("address", &self.address)
            .field("assets", &self.assets.addresses())
            .field("debt_token", &self.debt_token.address())
            .field("params", &self.params)
            .finish()
    }
}

impl CollateralEngine {
    /// Create an engine.
    ///
    /// `tokens` and `price_feeds` are parallel lists; `tokens[i]` is priced by
    /// `price_feeds[i]`.
    pub fn new(
        address: Address,
        tokens: Vec<Arc<dyn CollateralToken>>,
        price_feeds: Vec<Address>,
        debt_token: Arc<dyn DebtToken>,
        oracle: Arc<dyn PriceOracle>,
    ) -> Result<Self> {
        let assets = AssetRegistry::new(tokens, price_feeds)?;
        info!(
            %address,
            assets = assets.len(),
            debt_token = %debt_token.address(),
            "Collateral engine created"
        );

        Ok(Self {
            address,
            assets,
            debt_token,
            oracle: OracleAdapter::new(oracle),
            params: RiskParameters::default(),
            store: RwLock::new(LedgerStore::new()),
            guard: ReentrancyGuard::new(),
            events: Mutex::new(Vec::new()),
        })
    }

    /// Replace the default risk parameters.
    pub fn with_risk_parameters(mut self, params: RiskParameters) -> Self {
        self.params = params;
        self
    }

    // ========================================================================
    // Mutating operations
    // ========================================================================

    /// Deposit collateral from `caller`.
    #[instrument(skip(self), fields(op = "deposit"))]
    pub fn deposit_collateral(&self, caller: Address, asset: Address, amount: U256) -> Result<()> {
        self.execute("deposit", |tx| tx.deposit(caller, asset, amount))
    }

    /// Mint debt to `caller` against their collateral.
    #[instrument(skip(self), fields(op = "mint"))]
    pub fn mint(&self, caller: Address, amount: U256) -> Result<()> {
        self.execute("mint", |tx| {
            tx.mint(caller, amount)?;
            self.ensure_healthy(caller)
        })
    }

    /// Deposit collateral and mint debt in one operation.
    #[instrument(skip(self), fields(op = "deposit_and_mint"))]
    pub fn deposit_collateral_and_mint(
        &self,
        caller: Address,
        asset: Address,
        collateral: U256,
        debt: U256,
    ) -> Result<()> {
        self.execute("deposit_and_mint", |tx| {
            tx.deposit(caller, asset, collateral)?;
            tx.mint(caller, debt)?;
            self.ensure_healthy(caller)
        })
    }

    /// Withdraw `caller`'s own collateral.
    #[instrument(skip(self), fields(op = "redeem"))]
    pub fn redeem_collateral(&self, caller: Address, asset: Address, amount: U256) -> Result<()> {
        self.execute("redeem", |tx| {
            tx.redeem(caller, caller, asset, amount)?;
            self.ensure_healthy(caller)
        })
    }

    /// Repay `caller`'s own debt with their debt tokens.
    ///
    /// Repaying only raises the health factor, so an account below the floor
    /// may still burn part of its debt.
    #[instrument(skip(self), fields(op = "burn"))]
    pub fn burn(&self, caller: Address, amount: U256) -> Result<()> {
        self.execute("burn", |tx| tx.burn(caller, caller, amount))
    }

    /// Repay debt and withdraw collateral in one operation.
    #[instrument(skip(self), fields(op = "redeem_for_debt"))]
    pub fn redeem_collateral_for_debt(
        &self,
        caller: Address,
        asset: Address,
        collateral: U256,
        debt: U256,
    ) -> Result<()> {
        self.execute("redeem_for_debt", |tx| {
            tx.burn(caller, caller, debt)?;
            tx.redeem(caller, caller, asset, collateral)?;
            self.ensure_healthy(caller)
        })
    }

    /// Run `body` as one guarded, all-or-nothing operation.
    pub(crate) fn execute<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let _entered = self.guard.enter().map_err(|err| {
            warn!(operation, "Rejected reentrant call");
            err
        })?;

        let mut tx = Transaction::new(self);
        match body(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                debug!(operation, "Operation committed");
                Ok(value)
            }
            Err(err) => {
                debug!(operation, error = %err, "Operation aborted");
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Fail with `BreaksHealthFactor` if `account` is below the floor.
    pub(crate) fn ensure_healthy(&self, account: Address) -> Result<()> {
        let health_factor = self.health_factor(account)?;
        if self.params.is_liquidatable(health_factor) {
            debug!(%account, hf = %format_hf(health_factor), "Health factor broken");
            return Err(EngineError::BreaksHealthFactor {
                account,
                health_factor,
            });
        }
        Ok(())
    }

    pub(crate) fn publish(&self, events: Vec<EngineEvent>) {
        for event in &events {
            debug!(event = event.name(), ?event, "Engine event");
        }
        self.events.lock().extend(events);
    }

    // ========================================================================
    // Health and valuation
    // ========================================================================

    /// Debt and collateral USD value (WAD) of `account`.
    pub fn account_information(&self, account: Address) -> Result<(U256, U256)> {
        let debt = self.debt_of(account);
        let collateral_usd = self.collateral_usd_value(account)?;
        Ok((debt, collateral_usd))
    }

    /// Sum of the USD values of `account`'s collateral, in registration order.
    ///
    /// Assets the account holds none of contribute zero and their feeds are
    /// not queried, so a stale feed only fails accounts holding that asset.
    pub fn collateral_usd_value(&self, account: Address) -> Result<U256> {
        // Snapshot balances first; the oracle is an external call and must not
        // run under the store lock.
        let holdings: Vec<(Address, U256)> = {
            let store = self.store.read();
            self.assets
                .iter()
                .map(|asset| (asset.price_feed, store.collateral_balance(&account, &asset.address)))
                .filter(|(_, balance)| !balance.is_zero())
                .collect()
        };

        let mut total = U256::ZERO;
        for (feed, balance) in holdings {
            let value = self.oracle.to_usd(feed, balance)?;
            total = total
                .checked_add(value)
                .ok_or(EngineError::ArithmeticOverflow)?;
        }
        Ok(total)
    }

    /// Current health factor of `account` (WAD, `U256::MAX` without debt).
    pub fn health_factor(&self, account: Address) -> Result<U256> {
        let debt = self.debt_of(account);
        if debt.is_zero() {
            return Ok(U256::MAX);
        }
        let collateral_usd = self.collateral_usd_value(account)?;
        Ok(self.params.health_factor(debt, collateral_usd))
    }

    /// Health factor for arbitrary debt and collateral value.
    pub fn calculate_health_factor(&self, debt: U256, collateral_usd: U256) -> U256 {
        self.params.health_factor(debt, collateral_usd)
    }

    /// USD value (WAD) of `amount` of `asset`.
    pub fn usd_value(&self, asset: Address, amount: U256) -> Result<U256> {
        let feed = self.assets.require(&asset)?.price_feed;
        self.oracle.to_usd(feed, amount)
    }

    /// Amount of `asset` worth `usd_amount` (WAD).
    pub fn asset_amount_from_usd(&self, asset: Address, usd_amount: U256) -> Result<U256> {
        let feed = self.assets.require(&asset)?.price_feed;
        self.oracle.to_asset_amount(feed, usd_amount)
    }

    /// Aggregate collateral value against aggregate debt.
    pub fn solvency_report(&self) -> Result<SolvencyReport> {
        let totals: Vec<(Address, U256)> = {
            let store = self.store.read();
            self.assets
                .iter()
                .map(|asset| (asset.price_feed, store.total_collateral(&asset.address)))
                .filter(|(_, total)| !total.is_zero())
                .collect()
        };

        let mut total_collateral_usd = U256::ZERO;
        for (feed, amount) in totals {
            total_collateral_usd = total_collateral_usd.saturating_add(self.oracle.to_usd(feed, amount)?);
        }

        let total_debt = self.total_debt();
        let report = SolvencyReport {
            total_collateral_usd,
            total_debt,
            debt_token_supply: self.debt_token.total_supply(),
            is_solvent: total_debt.is_zero() || total_collateral_usd > total_debt,
        };

        if !report.is_solvent {
            warn!(
                collateral_usd = wad_to_f64(total_collateral_usd),
                debt = wad_to_f64(total_debt),
                "System undercollateralized"
            );
        }
        Ok(report)
    }

    // ========================================================================
    // Ledger accessors
    // ========================================================================

    /// Collateral of `account` held in `asset`.
    pub fn collateral_balance(&self, account: Address, asset: Address) -> U256 {
        self.store.read().collateral_balance(&account, &asset)
    }

    /// Debt minted by `account`.
    pub fn debt_of(&self, account: Address) -> U256 {
        self.store.read().debt_of(&account)
    }

    /// Total collateral deposited in `asset`.
    pub fn total_collateral(&self, asset: Address) -> U256 {
        self.store.read().total_collateral(&asset)
    }

    /// Total outstanding debt.
    pub fn total_debt(&self) -> U256 {
        self.store.read().total_debt()
    }

    /// Published events, oldest first.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Take and clear the published events.
    pub fn drain_events(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    // ========================================================================
    // Configuration accessors
    // ========================================================================

    /// Engine custody address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Registered collateral assets in registration order.
    pub fn collateral_assets(&self) -> Vec<Address> {
        self.assets.addresses()
    }

    /// Oracle reference for `asset` (zero address if unregistered).
    pub fn price_feed(&self, asset: Address) -> Address {
        self.assets.price_feed(&asset)
    }

    /// Debt token address.
    pub fn debt_token(&self) -> Address {
        self.debt_token.address()
    }

    pub fn precision(&self) -> U256 {
        WAD
    }

    pub fn additional_feed_precision(&self) -> U256 {
        ADDITIONAL_FEED_PRECISION
    }

    pub fn liquidation_threshold(&self) -> u8 {
        self.params.liquidation_threshold
    }

    pub fn liquidation_bonus(&self) -> u8 {
        self.params.liquidation_bonus
    }

    pub fn liquidation_precision(&self) -> u8 {
        LIQUIDATION_PRECISION
    }

    pub fn min_health_factor(&self) -> U256 {
        self.params.min_health_factor
    }

    pub fn risk_parameters(&self) -> RiskParameters {
        self.params
    }

    /// Whether a guarded operation is in flight.
    pub fn is_locked(&self) -> bool {
        self.guard.is_entered()
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    pub(crate) fn debt_token_handle(&self) -> &Arc<dyn DebtToken> {
        &self.debt_token
    }

    pub(crate) fn store(&self) -> &RwLock<LedgerStore> {
        &self.store
    }
}
