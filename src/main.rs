//! Synthetic debt engine simulator
//!
//! Runs a scenario of deposits, mints, price moves and liquidations against
//! the collateral engine wired to in-memory tokens and a manual price oracle.
//! Engine events and reports are printed to stdout as JSON lines.
//!
//! Usage: `synth-engine [CONFIG] [SCENARIO]`

mod scenario;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use synth_core::u256_math::wad_to_f64;
use synth_core::EngineConfig;

use crate::scenario::{Scenario, Simulation};

/// Environment variable names.
mod env {
    pub const SCENARIO: &str = "SYNTH_ENGINE_SCENARIO";
}

const DEFAULT_SCENARIO_PATH: &str = "config/scenario.toml";

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the JSON lines
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,synth_core=debug")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::from_env()?,
    };
    config.log_config();

    let scenario_path = args
        .next()
        .or_else(|| std::env::var(env::SCENARIO).ok())
        .unwrap_or_else(|| DEFAULT_SCENARIO_PATH.to_string());
    let scenario = Scenario::from_file(&scenario_path)?;
    info!(path = %scenario_path, steps = scenario.steps.len(), "Scenario loaded");

    let simulation = Simulation::new(&config)?.with_accounts(&scenario.accounts)?;
    let summary = simulation.run(&scenario)?;
    simulation.report()?;

    info!(
        %summary,
        total_debt = wad_to_f64(simulation.engine().total_debt()),
        "Scenario finished"
    );
    if summary.unexpected > 0 {
        bail!("{} step(s) did not match expectations", summary.unexpected);
    }
    Ok(())
}
