//! Manually driven oracle used by tests and the scenario simulator.

use alloy::primitives::{Address, U256};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{OracleError, PriceData, PriceOracle};

/// Feeds older than this are rejected as stale (3 hours).
pub const DEFAULT_TIMEOUT_SECS: u64 = 3 * 60 * 60;

/// Hook invoked on every price lookup, before the answer is produced.
pub type LookupHook = Arc<dyn Fn(Address) + Send + Sync>;

/// Oracle whose prices and clock are set by hand.
pub struct ManualOracle {
    /// Latest answer per feed
    prices: RwLock<HashMap<Address, PriceData>>,
    /// Simulated unix time (seconds)
    now: AtomicU64,
    /// Staleness timeout
    timeout_secs: u64,
    /// Optional callback fired on lookup
    hook: RwLock<Option<LookupHook>>,
}

impl std::fmt::Debug for ManualOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualOracle")
            .field("feeds", &self.prices.read().len())
            .field("now", &self.now.load(Ordering::Relaxed))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ManualOracle {
    /// Create an oracle whose clock starts at the current wall-clock time.
    pub fn new() -> Self {
        Self::starting_at(chrono::Utc::now().timestamp().max(0) as u64)
    }

    /// Create an oracle whose clock starts at `now`.
    pub fn starting_at(now: u64) -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            now: AtomicU64::new(now),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            hook: RwLock::new(None),
        }
    }

    /// Set the staleness timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Publish a new answer for `feed`, stamped with the current clock.
    pub fn set_price(&self, feed: Address, price: U256, decimals: u8) {
        let updated_at = self.now();
        debug!(%feed, %price, decimals, updated_at, "Manual price update");
        self.prices
            .write()
            .insert(feed, PriceData::new(price, decimals, updated_at));
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::Relaxed);
    }

    /// Current simulated time.
    pub fn now(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }

    /// Install a callback fired on every lookup.
    pub fn set_hook(&self, hook: LookupHook) {
        *self.hook.write() = Some(hook);
    }

    /// Remove the lookup callback.
    pub fn clear_hook(&self) {
        *self.hook.write() = None;
    }
}

impl Default for ManualOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceOracle for ManualOracle {
    fn latest_price(&self, feed: Address) -> Result<PriceData, OracleError> {
        // Clone out of the lock so the hook may freely call back in.
        let hook = self.hook.read().clone();
        if let Some(hook) = hook {
            hook(feed);
        }

        let data = self
            .prices
            .read()
            .get(&feed)
            .copied()
            .ok_or(OracleError::NoAnswer(feed))?;

        let now = self.now();
        if data.is_stale(self.timeout_secs, now) {
            return Err(OracleError::Stale {
                feed,
                age_secs: data.age_secs(now),
                timeout_secs: self.timeout_secs,
            });
        }
        if data.price.is_zero() {
            return Err(OracleError::InvalidAnswer {
                feed,
                reason: "zero price".to_string(),
            });
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const FEED: Address = Address::repeat_byte(0xfe);

    #[test]
    fn test_fresh_price() {
        let oracle = ManualOracle::starting_at(1_700_000_000);
        oracle.set_price(FEED, U256::from(2_000_0000_0000u64), 8);

        let data = oracle.latest_price(FEED).unwrap();
        assert_eq!(data.decimals, 8);
        assert_eq!(data.updated_at, 1_700_000_000);
    }

    #[test]
    fn test_stale_price() {
        let oracle = ManualOracle::starting_at(1_700_000_000).with_timeout(60);
        oracle.set_price(FEED, U256::from(1u64), 8);
        oracle.advance(61);

        match oracle.latest_price(FEED) {
            Err(OracleError::Stale { age_secs, .. }) => assert_eq!(age_secs, 61),
            other => panic!("expected stale error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_and_zero_price() {
        let oracle = ManualOracle::starting_at(0);
        assert_eq!(oracle.latest_price(FEED), Err(OracleError::NoAnswer(FEED)));

        oracle.set_price(FEED, U256::ZERO, 8);
        assert!(matches!(
            oracle.latest_price(FEED),
            Err(OracleError::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn test_hook_fires_on_lookup() {
        let oracle = ManualOracle::starting_at(0);
        oracle.set_price(FEED, U256::from(1u64), 8);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        oracle.set_hook(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        oracle.latest_price(FEED).unwrap();
        oracle.latest_price(FEED).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        oracle.clear_hook();
        oracle.latest_price(FEED).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
