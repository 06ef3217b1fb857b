//! Health factor calculation.
//!
//! HF = (collateral_usd * threshold / 100) * 10^18 / debt
//!
//! With the default 50% threshold an account must hold twice its debt in
//! collateral value to sit exactly at the 1.0 floor.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::u256_math::{self, calculate_hf_wad, mul_div_saturating, PERCENT_DENOMINATOR, WAD};

/// Share of collateral value counted toward backing debt (percent).
pub const LIQUIDATION_THRESHOLD: u8 = 50;

/// Collateral bonus paid to liquidators on top of the repaid value (percent).
pub const LIQUIDATION_BONUS: u8 = 10;

/// Denominator of the threshold and bonus percentages.
pub const LIQUIDATION_PRECISION: u8 = 100;

/// Health factor floor (1.0 in WAD).
pub const MIN_HEALTH_FACTOR: U256 = WAD;

/// Runtime risk parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Liquidation threshold in percent
    pub liquidation_threshold: u8,
    /// Liquidation bonus in percent
    pub liquidation_bonus: u8,
    /// Health factor floor (WAD)
    pub min_health_factor: U256,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            liquidation_threshold: LIQUIDATION_THRESHOLD,
            liquidation_bonus: LIQUIDATION_BONUS,
            min_health_factor: MIN_HEALTH_FACTOR,
        }
    }
}

impl RiskParameters {
    /// Health factor for `debt` against `collateral_usd` (both WAD).
    ///
    /// Debt-free accounts get `U256::MAX` regardless of collateral.
    pub fn health_factor(&self, debt: U256, collateral_usd: U256) -> U256 {
        if debt.is_zero() {
            return U256::MAX;
        }
        let adjusted = mul_div_saturating(
            collateral_usd,
            U256::from(self.liquidation_threshold),
            PERCENT_DENOMINATOR,
        );
        calculate_hf_wad(adjusted, debt)
    }

    /// Whether a health factor marks the account liquidatable.
    pub fn is_liquidatable(&self, health_factor: U256) -> bool {
        u256_math::is_below_floor(health_factor, self.min_health_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wad(n: u64) -> U256 {
        U256::from(n) * WAD
    }

    #[test]
    fn test_debt_free_is_max() {
        let params = RiskParameters::default();
        assert_eq!(params.health_factor(U256::ZERO, U256::ZERO), U256::MAX);
        assert_eq!(params.health_factor(U256::ZERO, wad(1_000)), U256::MAX);
        assert_ne!(params.health_factor(U256::from(1u64), U256::MAX), U256::ZERO);
    }

    #[test]
    fn test_healthy_position() {
        // $20000 collateral, 100 debt => (20000 * 0.5) / 100 = 100
        let params = RiskParameters::default();
        assert_eq!(params.health_factor(wad(100), wad(20_000)), wad(100));
    }

    #[test]
    fn test_liquidatable_position() {
        // $180 collateral, 100 debt => 0.9
        let params = RiskParameters::default();
        let hf = params.health_factor(wad(100), wad(180));
        assert_eq!(hf, WAD * U256::from(9u64) / U256::from(10u64));
        assert!(params.is_liquidatable(hf));
        assert!(!params.is_liquidatable(MIN_HEALTH_FACTOR));
    }

    #[test]
    fn test_monotonic() {
        let params = RiskParameters::default();
        let debt = wad(100);

        let mut previous = U256::ZERO;
        for collateral in [0u64, 1, 50, 199, 200, 201, 10_000] {
            let hf = params.health_factor(debt, wad(collateral));
            assert!(hf >= previous);
            previous = hf;
        }

        let mut previous = U256::MAX;
        for debt in [1u64, 10, 100, 1_000, 1_000_000] {
            let hf = params.health_factor(wad(debt), wad(500));
            assert!(hf <= previous);
            previous = hf;
        }
    }

    #[test]
    fn test_max_only_for_debt_free() {
        let params = RiskParameters::default();
        assert!(params.health_factor(U256::from(1u64), U256::MAX) < U256::MAX);
        assert!(params.health_factor(U256::from(1u64), U256::MAX / U256::from(2u64)) < U256::MAX);
        assert_eq!(params.health_factor(U256::ZERO, U256::MAX), U256::MAX);
    }
}
