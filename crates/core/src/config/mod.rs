//! Configuration for the collateral engine.
//!
//! This module provides:
//! - Engine configuration (identities, oracle timeout)
//! - Risk configuration (threshold, bonus, health factor floor)
//! - Collateral asset configuration (tokens, price feeds)

mod asset_config;
mod engine_config;

pub use asset_config::AssetConfig;
pub use engine_config::{EngineConfig, RiskConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
