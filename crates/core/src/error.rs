//! Engine error taxonomy.

use alloy::primitives::{Address, U256};
use synth_chain::OracleError;
use thiserror::Error;

use crate::u256_math::format_hf;

/// Broad failure category of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any mutation (bad amount, unknown asset, bad config)
    Validation,
    /// Ledger arithmetic would leave a negative balance or overflow
    Arithmetic,
    /// An external token call reported failure
    TransferFailed,
    /// Post-operation health factor below the floor
    InvariantViolation,
    /// Liquidation preconditions not met
    Liquidation,
    /// Nested entry into a guarded operation
    Reentrancy,
    /// Price lookup failed
    Oracle,
}

/// Errors returned by engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("amount must be more than zero")]
    AmountMustBeMoreThanZero,

    #[error("token {0} is not an allowed collateral asset")]
    TokenNotAllowed(Address),

    #[error("collateral list has {tokens} assets but {feeds} price feeds")]
    LengthMismatch { tokens: usize, feeds: usize },

    #[error("collateral asset {0} registered twice")]
    DuplicateAsset(Address),

    #[error("balance {available} is less than requested {requested}")]
    ArithmeticUnderflow { available: U256, requested: U256 },

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    #[error("transfer of token {token} failed")]
    TransferFailed { token: Address },

    #[error("debt token mint failed")]
    MintFailed,

    #[error("debt token burn failed")]
    BurnFailed,

    #[error("health factor of {account} would be {}", hf(.health_factor))]
    BreaksHealthFactor { account: Address, health_factor: U256 },

    #[error("health factor is ok, account is not liquidatable")]
    HealthFactorOk,

    #[error("health factor not improved to the floor (now {})", hf(.ending))]
    HealthFactorNotImproved { starting: U256, ending: U256 },

    #[error("reentrant call rejected")]
    Reentrancy,

    #[error("stale price: {0}")]
    StalePrice(#[from] OracleError),

    #[error("price feed {feed} returned an unusable price")]
    InvalidPrice { feed: Address },
}

impl EngineError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AmountMustBeMoreThanZero
            | Self::TokenNotAllowed(_)
            | Self::LengthMismatch { .. }
            | Self::DuplicateAsset(_) => ErrorKind::Validation,
            Self::ArithmeticUnderflow { .. } | Self::ArithmeticOverflow => ErrorKind::Arithmetic,
            Self::TransferFailed { .. } | Self::MintFailed | Self::BurnFailed => {
                ErrorKind::TransferFailed
            }
            Self::BreaksHealthFactor { .. } => ErrorKind::InvariantViolation,
            Self::HealthFactorOk | Self::HealthFactorNotImproved { .. } => ErrorKind::Liquidation,
            Self::Reentrancy => ErrorKind::Reentrancy,
            Self::StalePrice(_) | Self::InvalidPrice { .. } => ErrorKind::Oracle,
        }
    }
}

fn hf(value: &U256) -> String {
    format_hf(*value)
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
