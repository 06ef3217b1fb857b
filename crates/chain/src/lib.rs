//! Synthetic-debt engine collaborator layer.
//!
//! This crate provides:
//! - Collateral and debt token interfaces the engine transfers through
//! - Price oracle interface and price data normalization
//! - In-memory token and oracle implementations for tests and simulation
//!
//! Every call through these interfaces is an external interaction from the
//! engine's point of view and may fail or re-enter.

pub mod oracle;
pub mod token;

pub use oracle::{
    LookupHook, ManualOracle, OracleError, PriceData, PriceOracle, DEFAULT_TIMEOUT_SECS,
    NORMALIZED_DECIMALS,
};
pub use token::{
    CallHook, CollateralToken, DebtToken, MemoryCollateralToken, MemoryDebtToken, TokenCall,
};
