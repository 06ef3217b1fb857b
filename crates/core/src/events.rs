//! Engine notifications.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// State change notifications, published when an operation commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    CollateralDeposited {
        account: Address,
        asset: Address,
        amount: U256,
    },
    CollateralRedeemed {
        from: Address,
        to: Address,
        asset: Address,
        amount: U256,
    },
    DebtMinted {
        account: Address,
        amount: U256,
    },
    DebtBurned {
        on_behalf_of: Address,
        payer: Address,
        amount: U256,
    },
    Liquidated {
        liquidator: Address,
        account: Address,
        asset: Address,
        debt_covered: U256,
        collateral_seized: U256,
    },
}

impl EngineEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollateralDeposited { .. } => "collateral_deposited",
            Self::CollateralRedeemed { .. } => "collateral_redeemed",
            Self::DebtMinted { .. } => "debt_minted",
            Self::DebtBurned { .. } => "debt_burned",
            Self::Liquidated { .. } => "liquidated",
        }
    }
}
