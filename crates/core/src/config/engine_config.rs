//! Engine configuration: identities, risk parameters and collateral assets.

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::AssetConfig;
use crate::health::{RiskParameters, LIQUIDATION_BONUS, LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD};
use crate::u256_math::f64_to_wad;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "SYNTH_ENGINE_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name for logging/identification
    #[serde(default = "default_name")]
    pub name: String,

    /// Engine custody address (as hex string)
    pub engine: String,

    /// Debt token address (as hex string)
    pub debt_token: String,

    /// Price feed staleness timeout (seconds)
    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_secs: u64,

    /// Liquidation parameters
    #[serde(default)]
    pub risk: RiskConfig,

    /// Collateral assets in registration order
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

fn default_name() -> String {
    "default".to_string()
}
fn default_oracle_timeout() -> u64 {
    synth_chain::DEFAULT_TIMEOUT_SECS
}

/// Liquidation threshold, bonus and health factor floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Percent of collateral value counted toward health
    #[serde(default = "default_threshold")]
    pub liquidation_threshold: u8,

    /// Percent of seized collateral paid as liquidator bonus
    #[serde(default = "default_bonus")]
    pub liquidation_bonus: u8,

    /// Health factor below which accounts are liquidatable
    #[serde(default = "default_min_hf")]
    pub min_health_factor: f64,
}

fn default_threshold() -> u8 {
    LIQUIDATION_THRESHOLD
}
fn default_bonus() -> u8 {
    LIQUIDATION_BONUS
}
fn default_min_hf() -> f64 {
    1.0
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            liquidation_threshold: default_threshold(),
            liquidation_bonus: default_bonus(),
            min_health_factor: default_min_hf(),
        }
    }
}

impl RiskConfig {
    /// Fixed-point runtime parameters.
    pub fn to_params(&self) -> RiskParameters {
        RiskParameters {
            liquidation_threshold: self.liquidation_threshold,
            liquidation_bonus: self.liquidation_bonus,
            min_health_factor: f64_to_wad(self.min_health_factor),
        }
    }
}

impl EngineConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content).context("Failed to parse engine config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load the file named by `SYNTH_ENGINE_CONFIG`, or the default path.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(path)
    }

    /// Parse engine address.
    pub fn engine_address(&self) -> Result<Address> {
        self.engine
            .parse()
            .with_context(|| format!("Invalid engine address '{}'", self.engine))
    }

    /// Parse debt token address.
    pub fn debt_token_address(&self) -> Result<Address> {
        self.debt_token
            .parse()
            .with_context(|| format!("Invalid debt token address '{}'", self.debt_token))
    }

    /// Reject configs the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.engine_address()?;
        self.debt_token_address()?;

        let risk = &self.risk;
        if risk.liquidation_threshold == 0 || risk.liquidation_threshold > LIQUIDATION_PRECISION {
            bail!(
                "liquidation_threshold must be in 1..={}, got {}",
                LIQUIDATION_PRECISION,
                risk.liquidation_threshold
            );
        }
        if risk.liquidation_bonus >= LIQUIDATION_PRECISION {
            bail!("liquidation_bonus must be below {}, got {}", LIQUIDATION_PRECISION, risk.liquidation_bonus);
        }
        if !(risk.min_health_factor > 0.0 && risk.min_health_factor.is_finite()) {
            bail!("min_health_factor must be positive, got {}", risk.min_health_factor);
        }

        if self.assets.is_empty() {
            bail!("at least one collateral asset is required");
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            let token = asset.token_address()?;
            asset.price_feed_address()?;
            if !seen.insert(token) {
                bail!("collateral asset {} ({}) listed twice", asset.symbol, token);
            }
            if asset.feed_decimals > 36 {
                bail!("feed_decimals for {} too large: {}", asset.symbol, asset.feed_decimals);
            }
            asset.initial_answer()?;
        }
        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(
            name = %self.name,
            engine = %self.engine,
            debt_token = %self.debt_token,
            oracle_timeout_secs = self.oracle_timeout_secs,
            "Engine configuration loaded"
        );
        tracing::info!(
            threshold = self.risk.liquidation_threshold,
            bonus = self.risk.liquidation_bonus,
            min_hf = self.risk.min_health_factor,
            "Risk parameters"
        );
        for asset in &self.assets {
            tracing::info!(
                symbol = %asset.symbol,
                token = %asset.token,
                feed = %asset.price_feed,
                feed_decimals = asset.feed_decimals,
                "Collateral asset"
            );
        }
    }
}
