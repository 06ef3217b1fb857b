//! Scenario files and the in-memory simulation that runs them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use synth_chain::{
    CollateralToken, DebtToken, ManualOracle, MemoryCollateralToken, MemoryDebtToken,
};
use synth_core::u256_math::{f64_to_fixed, f64_to_wad, format_hf, wad_to_f64};
use synth_core::{CollateralEngine, EngineConfig, EngineError};

/// A scenario: named accounts plus steps run in order.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Account name -> address (as hex string)
    #[serde(default)]
    pub accounts: HashMap<String, String>,
    pub steps: Vec<Step>,
}

/// One step; amounts are human decimal numbers (18-decimal fixed point).
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub action: Action,
    /// The step is expected to be rejected by the engine
    #[serde(default)]
    pub expect_error: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Fund {
        account: String,
        asset: String,
        amount: f64,
    },
    SetPrice {
        asset: String,
        price: f64,
    },
    Deposit {
        account: String,
        asset: String,
        amount: f64,
    },
    Mint {
        account: String,
        amount: f64,
    },
    DepositAndMint {
        account: String,
        asset: String,
        collateral: f64,
        debt: f64,
    },
    Redeem {
        account: String,
        asset: String,
        amount: f64,
    },
    Burn {
        account: String,
        amount: f64,
    },
    RedeemForDebt {
        account: String,
        asset: String,
        collateral: f64,
        debt: f64,
    },
    Liquidate {
        liquidator: String,
        asset: String,
        account: String,
        debt_to_cover: f64,
    },
    AdvanceTime {
        secs: u64,
    },
    Report,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::Fund { .. } => "fund",
            Self::SetPrice { .. } => "set_price",
            Self::Deposit { .. } => "deposit",
            Self::Mint { .. } => "mint",
            Self::DepositAndMint { .. } => "deposit_and_mint",
            Self::Redeem { .. } => "redeem",
            Self::Burn { .. } => "burn",
            Self::RedeemForDebt { .. } => "redeem_for_debt",
            Self::Liquidate { .. } => "liquidate",
            Self::AdvanceTime { .. } => "advance_time",
            Self::Report => "report",
        }
    }
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid scenario {}", path.display()))
    }
}

/// JSON line printed for each account by a `report` step.
#[derive(Debug, Serialize)]
struct AccountReport<'a> {
    report: &'static str,
    account: &'a str,
    debt: f64,
    collateral_usd: f64,
    health_factor: String,
    debt_tokens: f64,
}

/// Oracle feed behind a collateral asset.
#[derive(Debug, Clone, Copy)]
struct Feed {
    address: Address,
    decimals: u8,
}

/// Engine wired to in-memory tokens and a manual oracle.
pub struct Simulation {
    engine: CollateralEngine,
    oracle: Arc<ManualOracle>,
    debt: Arc<MemoryDebtToken>,
    /// Symbol -> token
    tokens: HashMap<String, Arc<MemoryCollateralToken>>,
    feeds: HashMap<Address, Feed>,
    /// Report order
    accounts: Vec<(String, Address)>,
    names: HashMap<String, Address>,
}

/// Outcome counts of a scenario run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub steps: usize,
    pub rejected: usize,
    pub unexpected: usize,
}

impl Simulation {
    /// Build the engine and its collaborators from a validated config.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let engine_address = config.engine_address()?;
        let oracle = Arc::new(ManualOracle::new().with_timeout(config.oracle_timeout_secs));
        let debt = Arc::new(MemoryDebtToken::new(config.debt_token_address()?, engine_address));

        let mut tokens = HashMap::new();
        let mut feeds = HashMap::new();
        let mut collateral: Vec<Arc<dyn CollateralToken>> = Vec::with_capacity(config.assets.len());
        let mut price_feeds = Vec::with_capacity(config.assets.len());

        for asset in &config.assets {
            let address = asset.token_address()?;
            let feed = Feed {
                address: asset.price_feed_address()?,
                decimals: asset.feed_decimals,
            };
            let token = Arc::new(MemoryCollateralToken::new(&asset.symbol, address, engine_address));

            if let Some(answer) = asset.initial_answer()? {
                oracle.set_price(feed.address, answer, feed.decimals);
            }

            collateral.push(token.clone());
            price_feeds.push(feed.address);
            feeds.insert(address, feed);
            tokens.insert(asset.symbol.clone(), token);
        }

        let debt_token: Arc<dyn DebtToken> = debt.clone();
        let engine = CollateralEngine::new(engine_address, collateral, price_feeds, debt_token, oracle.clone())?
            .with_risk_parameters(config.risk.to_params());

        Ok(Self {
            engine,
            oracle,
            debt,
            tokens,
            feeds,
            accounts: Vec::new(),
            names: HashMap::new(),
        })
    }

    /// Register the scenario's named accounts.
    pub fn with_accounts(mut self, accounts: &HashMap<String, String>) -> Result<Self> {
        let mut named: Vec<(String, Address)> = accounts
            .iter()
            .map(|(name, address)| {
                address
                    .parse::<Address>()
                    .map(|a| (name.clone(), a))
                    .map_err(|e| anyhow!("Invalid address '{}' for account {}: {}", address, name, e))
            })
            .collect::<Result<_>>()?;
        named.sort();

        self.names = named.iter().cloned().collect();
        self.accounts = named;
        Ok(self)
    }

    pub fn engine(&self) -> &CollateralEngine {
        &self.engine
    }

    /// Run every step, printing events and reports as JSON lines.
    pub fn run(&self, scenario: &Scenario) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for (index, step) in scenario.steps.iter().enumerate() {
            let action = step.action.name();
            let outcome = self
                .apply(&step.action)
                .with_context(|| format!("Step {} ({}) is malformed", index, action))?;
            summary.steps += 1;

            match (outcome, step.expect_error) {
                (Ok(()), false) => debug!(step = index, action, "Step succeeded"),
                (Err(err), true) => {
                    summary.rejected += 1;
                    info!(step = index, action, kind = ?err.kind(), error = %err, "Step rejected as expected");
                }
                (Ok(()), true) => {
                    summary.unexpected += 1;
                    warn!(step = index, action, "Step succeeded but was expected to fail");
                }
                (Err(err), false) => {
                    summary.rejected += 1;
                    summary.unexpected += 1;
                    warn!(step = index, action, kind = ?err.kind(), error = %err, "Step rejected");
                }
            }

            for event in self.engine.drain_events() {
                println!("{}", serde_json::to_string(&event)?);
            }
        }

        Ok(summary)
    }

    /// Apply one action. The outer error is a scenario problem, the inner one
    /// the engine's verdict.
    fn apply(&self, action: &Action) -> Result<Result<(), EngineError>> {
        let engine = &self.engine;
        let outcome = match action {
            Action::Fund {
                account,
                asset,
                amount,
            } => {
                let account = self.account(account)?;
                self.token(asset)?.fund(account, f64_to_wad(*amount));
                Ok(())
            }
            Action::SetPrice { asset, price } => {
                let feed = self.feed(asset)?;
                let answer = f64_to_fixed(*price, feed.decimals)
                    .ok_or_else(|| anyhow!("Price {} for {} overflows the feed", price, asset))?;
                self.oracle.set_price(feed.address, answer, feed.decimals);
                Ok(())
            }
            Action::Deposit {
                account,
                asset,
                amount,
            } => engine.deposit_collateral(self.account(account)?, self.asset(asset)?, f64_to_wad(*amount)),
            Action::Mint { account, amount } => engine.mint(self.account(account)?, f64_to_wad(*amount)),
            Action::DepositAndMint {
                account,
                asset,
                collateral,
                debt,
            } => engine.deposit_collateral_and_mint(
                self.account(account)?,
                self.asset(asset)?,
                f64_to_wad(*collateral),
                f64_to_wad(*debt),
            ),
            Action::Redeem {
                account,
                asset,
                amount,
            } => engine.redeem_collateral(self.account(account)?, self.asset(asset)?, f64_to_wad(*amount)),
            Action::Burn { account, amount } => engine.burn(self.account(account)?, f64_to_wad(*amount)),
            Action::RedeemForDebt {
                account,
                asset,
                collateral,
                debt,
            } => engine.redeem_collateral_for_debt(
                self.account(account)?,
                self.asset(asset)?,
                f64_to_wad(*collateral),
                f64_to_wad(*debt),
            ),
            Action::Liquidate {
                liquidator,
                asset,
                account,
                debt_to_cover,
            } => engine
                .liquidate(
                    self.account(liquidator)?,
                    self.asset(asset)?,
                    self.account(account)?,
                    f64_to_wad(*debt_to_cover),
                )
                .map(|outcome| {
                    info!(
                        seized = wad_to_f64(outcome.seized.total),
                        bonus = wad_to_f64(outcome.seized.bonus),
                        hf_after = %format_hf(outcome.ending_health_factor),
                        "Liquidation outcome"
                    );
                }),
            Action::AdvanceTime { secs } => {
                self.oracle.advance(*secs);
                Ok(())
            }
            Action::Report => {
                self.report()?;
                Ok(())
            }
        };
        Ok(outcome)
    }

    /// Print every named account and the system totals.
    pub fn report(&self) -> Result<()> {
        for (name, address) in &self.accounts {
            let (debt, collateral_usd) = self.engine.account_information(*address)?;
            let line = AccountReport {
                report: "account",
                account: name,
                debt: wad_to_f64(debt),
                collateral_usd: wad_to_f64(collateral_usd),
                health_factor: format_hf(self.engine.calculate_health_factor(debt, collateral_usd)),
                debt_tokens: wad_to_f64(self.debt.balance_of(*address)),
            };
            println!("{}", serde_json::to_string(&line)?);
        }

        let solvency = self.engine.solvency_report()?;
        println!(
            "{}",
            serde_json::json!({
                "report": "system",
                "total_collateral_usd": wad_to_f64(solvency.total_collateral_usd),
                "total_debt": wad_to_f64(solvency.total_debt),
                "debt_token_supply": wad_to_f64(solvency.debt_token_supply),
                "is_solvent": solvency.is_solvent,
            })
        );
        Ok(())
    }

    fn account(&self, name: &str) -> Result<Address> {
        if let Some(address) = self.names.get(name) {
            return Ok(*address);
        }
        name.parse()
            .map_err(|_| anyhow!("Unknown account '{}'", name))
    }

    fn token(&self, symbol: &str) -> Result<&Arc<MemoryCollateralToken>> {
        self.tokens
            .get(symbol)
            .ok_or_else(|| anyhow!("Unknown asset '{}'", symbol))
    }

    /// Asset by symbol, or any address (unregistered ones are left to the engine).
    fn asset(&self, symbol: &str) -> Result<Address> {
        match self.tokens.get(symbol) {
            Some(token) => Ok(token.address()),
            None => symbol
                .parse()
                .map_err(|_| anyhow!("Unknown asset '{}'", symbol)),
        }
    }

    fn feed(&self, symbol: &str) -> Result<Feed> {
        let asset = self.asset(symbol)?;
        self.feeds
            .get(&asset)
            .copied()
            .ok_or_else(|| anyhow!("No price feed for '{}'", symbol))
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} steps, {} rejected, {} unexpected",
            self.steps, self.rejected, self.unexpected
        )
    }
}
