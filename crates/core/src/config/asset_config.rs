//! Collateral asset configuration loaded from TOML.

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::u256_math::f64_to_fixed;

/// One collateral asset and the feed that prices it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Asset symbol (e.g., "WETH", "WBTC")
    pub symbol: String,
    /// Token address (as hex string)
    pub token: String,
    /// Price feed address (as hex string)
    pub price_feed: String,
    /// Decimals of the feed's answers
    #[serde(default = "default_feed_decimals")]
    pub feed_decimals: u8,
    /// USD price to publish at startup (simulation only)
    #[serde(default)]
    pub initial_price: Option<f64>,
}

fn default_feed_decimals() -> u8 {
    8
}

impl AssetConfig {
    /// Parse token address.
    pub fn token_address(&self) -> Result<Address> {
        self.token
            .parse()
            .map_err(|e| anyhow!("Invalid token address '{}' for {}: {}", self.token, self.symbol, e))
    }

    /// Parse price feed address.
    pub fn price_feed_address(&self) -> Result<Address> {
        self.price_feed.parse().map_err(|e| {
            anyhow!(
                "Invalid price feed address '{}' for {}: {}",
                self.price_feed,
                self.symbol,
                e
            )
        })
    }

    /// Initial price as a raw feed answer in `feed_decimals` precision.
    pub fn initial_answer(&self) -> Result<Option<U256>> {
        self.initial_price
            .map(|price| {
                f64_to_fixed(price, self.feed_decimals).ok_or_else(|| {
                    anyhow!(
                        "initial_price {} for {} does not fit {} feed decimals",
                        price,
                        self.symbol,
                        self.feed_decimals
                    )
                })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_asset_config() {
        let toml_str = r#"
            symbol = "WETH"
            token = "0x1111111111111111111111111111111111111111"
            price_feed = "0x2222222222222222222222222222222222222222"
            initial_price = 2000.0
        "#;

        let asset: AssetConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(asset.symbol, "WETH");
        assert_eq!(asset.feed_decimals, 8);
        assert_eq!(asset.token_address().unwrap(), Address::repeat_byte(0x11));
        assert_eq!(asset.price_feed_address().unwrap(), Address::repeat_byte(0x22));
        assert_eq!(asset.initial_answer().unwrap(), Some(U256::from(2_000_0000_0000u64)));
    }

    #[test]
    fn test_bad_address() {
        let asset = AssetConfig {
            symbol: "BAD".to_string(),
            token: "0x1234".to_string(),
            price_feed: "0x2222222222222222222222222222222222222222".to_string(),
            feed_decimals: 18,
            initial_price: None,
        };

        let err = asset.token_address().unwrap_err();
        assert!(err.to_string().contains("BAD"));
        assert_eq!(asset.initial_answer().unwrap(), None);
    }

    #[test]
    fn test_initial_answer_on_wide_feed() {
        let mut asset = AssetConfig {
            symbol: "WETH".to_string(),
            token: "0x1111111111111111111111111111111111111111".to_string(),
            price_feed: "0x2222222222222222222222222222222222222222".to_string(),
            feed_decimals: 36,
            initial_price: Some(2000.0),
        };
        assert_eq!(
            asset.initial_answer().unwrap(),
            Some(U256::from(2000u64) * U256::from(10u64).pow(U256::from(36u64)))
        );

        asset.initial_price = Some(1e30);
        let err = asset.initial_answer().unwrap_err();
        assert!(err.to_string().contains("WETH"));
    }
}
