//! Price oracle collaborator interface.
//!
//! The engine never talks to a feed directly; it asks a [`PriceOracle`] for
//! the latest price behind an oracle reference (the feed address). The oracle
//! is responsible for its own sanity and staleness checks and reports any
//! problem as an [`OracleError`].
//!
//! # Example
//!
//! ```rust,ignore
//! use synth_chain::oracle::{ManualOracle, PriceOracle};
//!
//! let oracle = ManualOracle::new();
//! oracle.set_price(feed, U256::from(2000_0000_0000u64), 8);
//!
//! let price = oracle.latest_price(feed)?;
//! ```

mod manual;
mod types;

pub use manual::{LookupHook, ManualOracle, DEFAULT_TIMEOUT_SECS};
pub use types::{PriceData, NORMALIZED_DECIMALS};

use alloy::primitives::Address;
use std::fmt::Debug;
use thiserror::Error;

/// Failures reported by a price oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The latest round is older than the oracle's timeout.
    #[error("price feed {feed} is stale ({age_secs}s old, timeout {timeout_secs}s)")]
    Stale {
        feed: Address,
        age_secs: u64,
        timeout_secs: u64,
    },

    /// No price has ever been published for this feed.
    #[error("price feed {0} has no answer")]
    NoAnswer(Address),

    /// The feed answered with an unusable value.
    #[error("price feed {feed} answered an invalid price: {reason}")]
    InvalidAnswer { feed: Address, reason: String },
}

/// Core trait for oracle interactions.
///
/// Implementations may be adversarial: `latest_price` is an external call and
/// can call back into whoever asked.
pub trait PriceOracle: Send + Sync + Debug {
    /// Latest staleness-checked price for `feed`.
    fn latest_price(&self, feed: Address) -> Result<PriceData, OracleError>;
}
