//! Token collaborator interfaces.
//!
//! Every method is an external call from the engine's point of view: it may
//! fail (reported as `false`) and it may call back into the engine before
//! returning.

mod memory;

pub use memory::{CallHook, MemoryCollateralToken, MemoryDebtToken, TokenCall};

use alloy::primitives::{Address, U256};
use std::fmt::Debug;

/// A collateral asset the engine holds in custody.
pub trait CollateralToken: Send + Sync + Debug {
    /// Token contract address (the asset identifier).
    fn address(&self) -> Address;

    /// Move `amount` from `from` to `to` on the engine's authority.
    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> bool;

    /// Move `amount` out of the caller's (engine's) own balance.
    fn transfer(&self, to: Address, amount: U256) -> bool;

    /// Balance held by `account`.
    fn balance_of(&self, account: Address) -> U256;
}

/// The synthetic debt token. The engine is its only minter and burner.
pub trait DebtToken: Send + Sync + Debug {
    /// Token contract address.
    fn address(&self) -> Address;

    /// Create `amount` new tokens for `to`.
    fn mint(&self, to: Address, amount: U256) -> bool;

    /// Destroy `amount` tokens out of the engine's own balance.
    fn burn(&self, amount: U256) -> bool;

    /// Move `amount` from `from` to `to` on the engine's authority.
    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> bool;

    /// Move `amount` out of the engine's own balance.
    fn transfer(&self, to: Address, amount: U256) -> bool;

    /// Balance held by `account`.
    fn balance_of(&self, account: Address) -> U256;

    /// Total tokens in circulation.
    fn total_supply(&self) -> U256;
}
