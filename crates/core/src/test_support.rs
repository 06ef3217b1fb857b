//! Shared fixtures for engine tests.

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use synth_chain::{CollateralToken, DebtToken, ManualOracle, MemoryCollateralToken, MemoryDebtToken};

use crate::engine::CollateralEngine;
use crate::u256_math::WAD;

pub const ENGINE: Address = Address::repeat_byte(0xee);
pub const DEBT_TOKEN: Address = Address::repeat_byte(0xd5);
pub const WETH: Address = Address::repeat_byte(0x01);
pub const WBTC: Address = Address::repeat_byte(0x02);
pub const WETH_FEED: Address = Address::repeat_byte(0xf1);
pub const WBTC_FEED: Address = Address::repeat_byte(0xf2);
pub const USER: Address = Address::repeat_byte(0x0a);
pub const LIQUIDATOR: Address = Address::repeat_byte(0x0b);
pub const ATTACKER: Address = Address::repeat_byte(0x0c);

const FEED_DECIMALS: u8 = 8;

pub fn wad(n: u64) -> U256 {
    U256::from(n) * WAD
}

/// Engine with WETH ($2000) and WBTC ($30000) on 8-decimal feeds.
pub struct Fixture {
    pub engine: Arc<CollateralEngine>,
    pub weth: Arc<MemoryCollateralToken>,
    pub wbtc: Arc<MemoryCollateralToken>,
    pub debt: Arc<MemoryDebtToken>,
    pub oracle: Arc<ManualOracle>,
}

impl Fixture {
    pub fn new() -> Self {
        let weth = Arc::new(MemoryCollateralToken::new("WETH", WETH, ENGINE));
        let wbtc = Arc::new(MemoryCollateralToken::new("WBTC", WBTC, ENGINE));
        let debt = Arc::new(MemoryDebtToken::new(DEBT_TOKEN, ENGINE));
        let oracle = Arc::new(ManualOracle::starting_at(1_700_000_000));

        let fixture_tokens: Vec<Arc<dyn CollateralToken>> = vec![weth.clone(), wbtc.clone()];
        let debt_token: Arc<dyn DebtToken> = debt.clone();
        let engine = CollateralEngine::new(
            ENGINE,
            fixture_tokens,
            vec![WETH_FEED, WBTC_FEED],
            debt_token,
            oracle.clone(),
        )
        .unwrap();

        let fx = Self {
            engine: Arc::new(engine),
            weth,
            wbtc,
            debt,
            oracle,
        };
        fx.set_weth_price(2_000);
        fx.set_price(WBTC_FEED, 30_000);
        fx
    }

    pub fn set_weth_price(&self, usd: u64) {
        self.set_price(WETH_FEED, usd);
    }

    pub fn set_price(&self, feed: Address, usd: u64) {
        let answer = U256::from(usd) * U256::from(10u64).pow(U256::from(FEED_DECIMALS));
        self.oracle.set_price(feed, answer, FEED_DECIMALS);
    }

    /// Fund `account` with WETH, deposit it and mint `debt`.
    pub fn open_position(&self, account: Address, collateral: U256, debt: U256) {
        self.weth.fund(account, collateral);
        self.engine
            .deposit_collateral_and_mint(account, WETH, collateral, debt)
            .unwrap();
    }
}
