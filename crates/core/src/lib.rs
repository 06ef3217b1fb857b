//! Collateral engine core logic.
//!
//! This crate provides an overcollateralized synthetic-debt engine:
//! - Collateral and debt ledgers with an undo journal
//! - Health factor calculation against a liquidation threshold
//! - Oracle adapter normalizing feed prices to 18 decimals
//! - Partial liquidation with a fixed collateral bonus
//! - Non-reentrant, all-or-nothing public operations
//!
//! External collaborators (collateral tokens, the debt token, price feeds) are
//! the traits in `synth-chain`.

mod assets;
pub mod config;
mod engine;
mod error;
mod events;
mod guard;
mod health;
mod ledger;
mod liquidation;
mod oracle;
mod transaction;
pub mod u256_math;

#[cfg(test)]
mod test_support;

pub use assets::{Asset, AssetRegistry};
pub use config::{AssetConfig, EngineConfig, RiskConfig};
pub use engine::{CollateralEngine, SolvencyReport};
pub use error::{EngineError, ErrorKind, Result};
pub use events::EngineEvent;
pub use guard::ReentrancyGuard;
pub use health::{
    RiskParameters, LIQUIDATION_BONUS, LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD,
    MIN_HEALTH_FACTOR,
};
pub use liquidation::{LiquidationOutcome, LiquidationQuote, SeizureAmounts};
pub use oracle::OracleAdapter;
