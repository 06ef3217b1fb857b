//! Liquidation coordinator.
//!
//! A liquidator repays part of an undercollateralized account's debt with
//! their own debt tokens and receives the equivalent collateral plus a bonus.
//! Each call seizes a single collateral asset.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::engine::CollateralEngine;
use crate::error::{EngineError, Result};
use crate::events::EngineEvent;
use crate::u256_math::{apply_percent, format_hf, wad_to_f64};

/// Collateral owed to a liquidator for covering some debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeizureAmounts {
    /// Collateral equal in value to the debt covered
    pub base: U256,
    /// Incentive on top of `base`
    pub bonus: U256,
    /// `base + bonus`
    pub total: U256,
}

/// Result of a completed liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    pub account: Address,
    pub asset: Address,
    pub debt_covered: U256,
    pub seized: SeizureAmounts,
    pub starting_health_factor: U256,
    pub ending_health_factor: U256,
}

/// Read-only preview of a liquidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationQuote {
    /// Current health factor of the target
    pub health_factor: U256,
    /// Target is below the floor
    pub liquidatable: bool,
    /// Collateral the liquidator would receive
    pub seized: SeizureAmounts,
    /// Target holds enough of the asset to cover `seized.total`
    pub sufficient_collateral: bool,
    /// USD value (WAD) of the bonus
    pub bonus_usd: U256,
}

impl LiquidationQuote {
    /// Whether `liquidate` would get past its precondition checks.
    ///
    /// Does not predict the ending health factor checks.
    pub fn is_executable(&self) -> bool {
        self.liquidatable && self.sufficient_collateral
    }
}

impl CollateralEngine {
    /// Collateral of `asset` owed for covering `debt_to_cover`.
    pub fn seizure_amounts(&self, asset: Address, debt_to_cover: U256) -> Result<SeizureAmounts> {
        let base = self.asset_amount_from_usd(asset, debt_to_cover)?;
        let bonus = apply_percent(base, self.liquidation_bonus())
            .ok_or(EngineError::ArithmeticOverflow)?;
        let total = base
            .checked_add(bonus)
            .ok_or(EngineError::ArithmeticOverflow)?;
        Ok(SeizureAmounts { base, bonus, total })
    }

    /// Preview liquidating `account` for `debt_to_cover`, seizing `asset`.
    pub fn quote_liquidation(
        &self,
        asset: Address,
        account: Address,
        debt_to_cover: U256,
    ) -> Result<LiquidationQuote> {
        let health_factor = self.health_factor(account)?;
        let seized = self.seizure_amounts(asset, debt_to_cover)?;
        let bonus_usd = self.usd_value(asset, seized.bonus)?;

        Ok(LiquidationQuote {
            health_factor,
            liquidatable: self.risk_parameters().is_liquidatable(health_factor),
            seized,
            sufficient_collateral: self.collateral_balance(account, asset) >= seized.total,
            bonus_usd,
        })
    }

    /// Cover `debt_to_cover` of `account`'s debt as `liquidator`, seizing `asset`.
    ///
    /// The liquidator pays with debt tokens they hold. Seizure is not capped:
    /// if the account holds less than the owed collateral the call fails.
    #[instrument(skip(self), fields(op = "liquidate"))]
    pub fn liquidate(
        &self,
        liquidator: Address,
        asset: Address,
        account: Address,
        debt_to_cover: U256,
    ) -> Result<LiquidationOutcome> {
        self.execute("liquidate", |tx| {
            if debt_to_cover.is_zero() {
                return Err(EngineError::AmountMustBeMoreThanZero);
            }
            self.assets().require(&asset)?;

            let params = self.risk_parameters();
            let starting = self.health_factor(account)?;
            if !params.is_liquidatable(starting) {
                return Err(EngineError::HealthFactorOk);
            }

            let seized = self.seizure_amounts(asset, debt_to_cover)?;
            tx.redeem(account, liquidator, asset, seized.total)?;
            tx.burn(account, liquidator, debt_to_cover)?;

            let ending = self.health_factor(account)?;
            if params.is_liquidatable(ending) {
                warn!(
                    %account,
                    starting = %format_hf(starting),
                    ending = %format_hf(ending),
                    "Liquidation leaves account below floor"
                );
                return Err(EngineError::HealthFactorNotImproved { starting, ending });
            }
            self.ensure_healthy(liquidator)?;

            tx.emit(EngineEvent::Liquidated {
                liquidator,
                account,
                asset,
                debt_covered: debt_to_cover,
                collateral_seized: seized.total,
            });

            info!(
                %liquidator,
                %account,
                %asset,
                debt_covered = wad_to_f64(debt_to_cover),
                seized = wad_to_f64(seized.total),
                hf_before = %format_hf(starting),
                hf_after = %format_hf(ending),
                "Liquidation executed"
            );

            Ok(LiquidationOutcome {
                account,
                asset,
                debt_covered: debt_to_cover,
                seized,
                starting_health_factor: starting,
                ending_health_factor: ending,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::*;
    use crate::u256_math::WAD;
    use std::sync::Arc;
    use synth_chain::{CollateralToken, DebtToken, TokenCall};

    /// Scenario fixture: user and liquidator open at $2000, then ETH drops to $18.
    fn crashed() -> Fixture {
        let fx = Fixture::new();
        fx.open_position(USER, wad(10), wad(100));
        fx.open_position(LIQUIDATOR, wad(20), wad(100));
        fx.set_weth_price(18);
        fx.engine.drain_events();
        fx
    }

    #[test]
    fn test_healthy_account_not_liquidatable() {
        let fx = Fixture::new();
        fx.open_position(USER, wad(10), wad(100));
        fx.open_position(LIQUIDATOR, wad(20), wad(100));
        fx.engine.drain_events();

        let err = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap_err();
        assert_eq!(err, EngineError::HealthFactorOk);
        assert_eq!(err.kind(), ErrorKind::Liquidation);

        assert_eq!(fx.engine.debt_of(USER), wad(100));
        assert_eq!(fx.engine.collateral_balance(USER, WETH), wad(10));
        assert!(fx.engine.events().is_empty());
    }

    #[test]
    fn test_zero_debt_to_cover() {
        let fx = crashed();
        let err = fx.engine.liquidate(LIQUIDATOR, WETH, USER, U256::ZERO).unwrap_err();
        assert_eq!(err, EngineError::AmountMustBeMoreThanZero);
    }

    #[test]
    fn test_full_liquidation_amounts() {
        let fx = crashed();

        let outcome = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap();

        let base = U256::from(5_555_555_555_555_555_555u64);
        let bonus = U256::from(555_555_555_555_555_555u64);
        let total = U256::from(6_111_111_111_111_111_110u64);
        assert_eq!(outcome.seized, SeizureAmounts { base, bonus, total });
        assert_eq!(outcome.ending_health_factor, U256::MAX);
        assert!(outcome.starting_health_factor < WAD);

        // Target: debt cleared, collateral reduced by the seizure
        assert_eq!(fx.engine.debt_of(USER), U256::ZERO);
        assert_eq!(fx.engine.collateral_balance(USER, WETH), wad(10) - total);

        // Liquidator: received collateral, spent debt tokens, own debt untouched
        assert_eq!(fx.weth.balance_of(LIQUIDATOR), total);
        assert_eq!(fx.debt.balance_of(LIQUIDATOR), U256::ZERO);
        assert_eq!(fx.engine.debt_of(LIQUIDATOR), wad(100));

        assert_eq!(fx.engine.total_debt(), wad(100));
        assert_eq!(fx.debt.total_supply(), wad(100));
        assert_eq!(fx.weth.balance_of(ENGINE), wad(30) - total);
    }

    #[test]
    fn test_liquidation_events() {
        let fx = crashed();
        fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap();

        let names: Vec<_> = fx.engine.events().iter().map(EngineEvent::name).collect();
        assert_eq!(names, vec!["collateral_redeemed", "debt_burned", "liquidated"]);
        assert_eq!(
            fx.engine.events()[1],
            EngineEvent::DebtBurned {
                on_behalf_of: USER,
                payer: LIQUIDATOR,
                amount: wad(100),
            }
        );
    }

    #[test]
    fn test_partial_liquidation_must_reach_floor() {
        let fx = crashed();

        let err = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(10)).unwrap_err();
        match err {
            EngineError::HealthFactorNotImproved { starting, ending } => {
                assert!(ending > starting);
                assert!(ending < WAD);
            }
            other => panic!("expected HealthFactorNotImproved, got {other:?}"),
        }

        assert_eq!(fx.engine.debt_of(USER), wad(100));
        assert_eq!(fx.engine.collateral_balance(USER, WETH), wad(10));
        assert_eq!(fx.weth.balance_of(LIQUIDATOR), U256::ZERO);
        assert_eq!(fx.debt.balance_of(LIQUIDATOR), wad(100));
        assert!(fx.engine.events().is_empty());
    }

    #[test]
    fn test_seizure_beyond_balance_fails() {
        let fx = Fixture::new();
        fx.open_position(USER, wad(10), wad(100));
        fx.open_position(LIQUIDATOR, wad(50), wad(100));
        fx.set_weth_price(9);

        // 100 / 9 = 11.1 WETH owed, target only holds 10
        let err = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap_err();
        assert!(matches!(err, EngineError::ArithmeticUnderflow { available, .. } if available == wad(10)));
        assert_eq!(fx.engine.collateral_balance(USER, WETH), wad(10));
    }

    #[test]
    fn test_liquidator_must_stay_healthy() {
        let fx = Fixture::new();
        fx.open_position(USER, wad(30), wad(100));
        fx.open_position(LIQUIDATOR, wad(20), wad(100));
        // User at 0.9, liquidator at 0.6
        fx.set_weth_price(6);

        let err = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap_err();
        assert!(matches!(err, EngineError::BreaksHealthFactor { account, .. } if account == LIQUIDATOR));
        assert_eq!(fx.engine.debt_of(USER), wad(100));
        assert_eq!(fx.engine.collateral_balance(USER, WETH), wad(30));
    }

    #[test]
    fn test_liquidator_without_debt_tokens() {
        let fx = crashed();
        // Liquidator spends their debt tokens elsewhere
        assert!(fx.debt.transfer_from(LIQUIDATOR, ATTACKER, wad(100)));

        let err = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap_err();
        assert_eq!(err, EngineError::TransferFailed { token: DEBT_TOKEN });
        assert_eq!(fx.engine.debt_of(USER), wad(100));
        assert_eq!(fx.engine.collateral_balance(USER, WETH), wad(10));
        assert_eq!(fx.weth.balance_of(LIQUIDATOR), U256::ZERO);
    }

    #[test]
    fn test_collateral_push_failure_unwinds_repayment() {
        let fx = crashed();
        fx.weth.set_fail_transfers(true);

        let err = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap_err();
        assert_eq!(err, EngineError::TransferFailed { token: WETH });

        // Burned debt tokens were reissued to the liquidator
        assert_eq!(fx.debt.balance_of(LIQUIDATOR), wad(100));
        assert_eq!(fx.debt.total_supply(), wad(200));
        assert_eq!(fx.engine.debt_of(USER), wad(100));
    }

    #[test]
    fn test_reentrant_calls_from_debt_token_are_rejected() {
        let fx = crashed();

        let results = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let engine = Arc::downgrade(&fx.engine);
        let sink = results.clone();
        fx.debt.set_hook(Arc::new(move |_: &TokenCall| {
            if let Some(engine) = engine.upgrade() {
                sink.lock().push(engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).map(|_| ()));
                sink.lock().push(engine.burn(LIQUIDATOR, wad(1)));
            }
        }));

        let outcome = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap();
        fx.debt.clear_hook();

        let results = results.lock();
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r == &Err(EngineError::Reentrancy)));

        // Only the outer liquidation took effect
        assert_eq!(fx.engine.debt_of(USER), U256::ZERO);
        assert_eq!(fx.engine.debt_of(LIQUIDATOR), wad(100));
        assert_eq!(fx.engine.collateral_balance(USER, WETH), wad(10) - outcome.seized.total);
        assert_eq!(fx.weth.balance_of(LIQUIDATOR), outcome.seized.total);
        assert_eq!(fx.debt.total_supply(), wad(100));
        assert!(!fx.engine.is_locked());
    }

    #[test]
    fn test_unregistered_asset() {
        let fx = crashed();
        let unknown = Address::repeat_byte(0x77);
        let err = fx.engine.liquidate(LIQUIDATOR, unknown, USER, wad(100)).unwrap_err();
        assert_eq!(err, EngineError::TokenNotAllowed(unknown));
    }

    #[test]
    fn test_quote_matches_execution() {
        let fx = crashed();

        let quote = fx.engine.quote_liquidation(WETH, USER, wad(100)).unwrap();
        assert!(quote.liquidatable);
        assert!(quote.sufficient_collateral);
        assert!(quote.is_executable());
        // 0.5555 WETH at $18
        assert_eq!(quote.bonus_usd, U256::from(9_999_999_999_999_999_990u64));

        let outcome = fx.engine.liquidate(LIQUIDATOR, WETH, USER, wad(100)).unwrap();
        assert_eq!(outcome.seized, quote.seized);
    }
}
