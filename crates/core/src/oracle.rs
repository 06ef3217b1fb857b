//! Price oracle adapter: asset amounts to and from USD.
//!
//! Every conversion is an independent read of the feed. Two conversions in the
//! same operation may see different prices if the feed updates in between.

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use synth_chain::PriceOracle;
use tracing::trace;

use crate::error::{EngineError, Result};
use crate::u256_math::{mul_div, WAD};

/// Converts between asset base units and WAD USD values.
#[derive(Debug, Clone)]
pub struct OracleAdapter {
    oracle: Arc<dyn PriceOracle>,
}

impl OracleAdapter {
    pub fn new(oracle: Arc<dyn PriceOracle>) -> Self {
        Self { oracle }
    }

    /// Latest price behind `feed`, normalized to 18 decimals.
    pub fn normalized_price(&self, feed: Address) -> Result<U256> {
        let data = self.oracle.latest_price(feed)?;
        let price = data
            .normalize_to_18()
            .ok_or(EngineError::ArithmeticOverflow)?;
        trace!(%feed, raw = %data.price, decimals = data.decimals, %price, "Feed price");
        Ok(price)
    }

    /// USD value (WAD) of `amount` priced by `feed`.
    ///
    /// Formula: amount * price_18 / 10^18
    pub fn to_usd(&self, feed: Address, amount: U256) -> Result<U256> {
        let price = self.normalized_price(feed)?;
        mul_div(amount, price, WAD).ok_or(EngineError::ArithmeticOverflow)
    }

    /// Asset amount worth `usd_amount` (WAD) at the price behind `feed`.
    ///
    /// Formula: usd * 10^18 / price_18
    pub fn to_asset_amount(&self, feed: Address, usd_amount: U256) -> Result<U256> {
        let price = self.normalized_price(feed)?;
        if price.is_zero() {
            return Err(EngineError::InvalidPrice { feed });
        }
        mul_div(usd_amount, WAD, price).ok_or(EngineError::ArithmeticOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::u256_math::pow10;
    use synth_chain::{ManualOracle, OracleError};

    const FEED: Address = Address::repeat_byte(0xf1);

    fn adapter(price: u64, decimals: u8) -> (Arc<ManualOracle>, OracleAdapter) {
        let oracle = Arc::new(ManualOracle::starting_at(1_700_000_000));
        oracle.set_price(FEED, U256::from(price), decimals);
        (oracle.clone(), OracleAdapter::new(oracle))
    }

    #[test]
    fn test_to_usd_eight_decimal_feed() {
        // 15 units at $2000
        let (_, adapter) = adapter(2_000_0000_0000, 8);
        let usd = adapter.to_usd(FEED, U256::from(15u64) * WAD).unwrap();
        assert_eq!(usd, U256::from(30_000u64) * WAD);
    }

    #[test]
    fn test_feed_precisions_agree() {
        // The same $18 price published at 6, 8, 18 and 20 decimals
        let answers = [
            (U256::from(18_000_000u64), 6u8),
            (U256::from(1_800_000_000u64), 8),
            (U256::from(18u64) * WAD, 18),
            (U256::from(18u64) * pow10(20), 20),
        ];

        for (price, decimals) in answers {
            let oracle = Arc::new(ManualOracle::starting_at(0));
            oracle.set_price(FEED, price, decimals);
            let adapter = OracleAdapter::new(oracle);
            assert_eq!(adapter.to_usd(FEED, WAD).unwrap(), U256::from(18u64) * WAD);
        }
    }

    #[test]
    fn test_to_asset_amount() {
        // $100 at $2000 => 0.05 units
        let (_, adapter) = adapter(2_000_0000_0000, 8);
        let amount = adapter
            .to_asset_amount(FEED, U256::from(100u64) * WAD)
            .unwrap();
        assert_eq!(amount, U256::from(50_000_000_000_000_000u64));
    }

    #[test]
    fn test_round_trip_within_rounding() {
        // 8-decimal answers: $1999.99999999, $0.5, $18.33333333, $3.14159265, $0.00000001
        let answers = [199_999_999_999u64, 50_000_000, 1_833_333_333, 314_159_265, 1];
        let amounts = [
            U256::from(1u64),
            U256::from(7u64),
            U256::from(123_456_789_012_345_678u64),
            U256::from(999_999_999_999_999_999u64),
            U256::from(1_000_003u64) * WAD,
        ];

        for answer in answers {
            let (_, adapter) = adapter(answer, 8);
            let price = adapter.normalized_price(FEED).unwrap();
            let tolerance = WAD / price + U256::from(1u64);

            for amount in amounts {
                let usd = adapter.to_usd(FEED, amount).unwrap();
                let back = adapter.to_asset_amount(FEED, usd).unwrap();
                assert!(back <= amount, "answer {answer}, amount {amount}");
                assert!(amount - back <= tolerance, "answer {answer}, amount {amount}");
            }
        }
    }

    #[test]
    fn test_stale_feed_propagates() {
        let (oracle, adapter) = adapter(1_800_000_000, 8);
        oracle.advance(3 * 60 * 60 + 1);
        assert!(matches!(
            adapter.to_usd(FEED, WAD),
            Err(EngineError::StalePrice(OracleError::Stale { .. }))
        ));
    }
}
