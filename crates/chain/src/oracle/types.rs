//! Oracle type definitions.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Target precision every feed is normalized to.
pub const NORMALIZED_DECIMALS: u8 = 18;

/// Price data with metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceData {
    /// Price value (in feed decimals)
    pub price: U256,
    /// Price decimals
    pub decimals: u8,
    /// Unix timestamp of the last feed update
    pub updated_at: u64,
}

impl PriceData {
    /// Create new price data.
    pub fn new(price: U256, decimals: u8, updated_at: u64) -> Self {
        Self {
            price,
            decimals,
            updated_at,
        }
    }

    /// Get price as f64.
    /// Use only for display/logging, not for computation.
    pub fn price_f64(&self) -> f64 {
        let divisor = 10_f64.powi(self.decimals as i32);
        self.price.to_string().parse::<f64>().unwrap_or(0.0) / divisor
    }

    /// Check if price is stale.
    pub fn is_stale(&self, threshold_secs: u64, current_time: u64) -> bool {
        current_time.saturating_sub(self.updated_at) > threshold_secs
    }

    /// Get age in seconds.
    pub fn age_secs(&self, current_time: u64) -> u64 {
        current_time.saturating_sub(self.updated_at)
    }

    /// Normalize price to 18 decimals.
    ///
    /// Returns `None` if scaling up overflows.
    pub fn normalize_to_18(&self) -> Option<U256> {
        if self.decimals == NORMALIZED_DECIMALS {
            Some(self.price)
        } else if self.decimals < NORMALIZED_DECIMALS {
            let scale = U256::from(10u64).pow(U256::from(NORMALIZED_DECIMALS - self.decimals));
            self.price.checked_mul(scale)
        } else {
            let scale = U256::from(10u64).pow(U256::from(self.decimals - NORMALIZED_DECIMALS));
            Some(self.price / scale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_data_conversion() {
        let price = PriceData::new(
            U256::from(200_000_000_000u64), // $2000 with 8 decimals
            8,
            1700000000,
        );

        assert!((price.price_f64() - 2000.0).abs() < 0.01);
    }

    #[test]
    fn test_price_normalization() {
        // 8 decimal price → 18 decimals
        let price = PriceData::new(U256::from(100_000_000u64), 8, 1700000000);
        assert_eq!(price.normalize_to_18(), Some(U256::from(10u128.pow(18))));

        // Already 18 decimals
        let price = PriceData::new(U256::from(10u128.pow(18)), 18, 1700000000);
        assert_eq!(price.normalize_to_18(), Some(U256::from(10u128.pow(18))));

        // 20 decimals scales down
        let price = PriceData::new(U256::from(10u128.pow(20)), 20, 1700000000);
        assert_eq!(price.normalize_to_18(), Some(U256::from(10u128.pow(18))));
    }

    #[test]
    fn test_normalization_overflow() {
        let price = PriceData::new(U256::MAX, 0, 1700000000);
        assert_eq!(price.normalize_to_18(), None);
    }

    #[test]
    fn test_staleness() {
        let price = PriceData::new(U256::from(100_000_000u64), 8, 1700000000);

        // 3 hour threshold
        let threshold = 10_800;
        assert!(price.is_stale(threshold, 1700000000 + 10_801));
        assert!(!price.is_stale(threshold, 1700000000 + 10_799));
        assert_eq!(price.age_secs(1700000000 + 60), 60);
    }
}
