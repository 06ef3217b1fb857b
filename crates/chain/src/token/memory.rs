//! In-memory token implementations.
//!
//! Balances live in a [`DashMap`]; each token has switches to make its calls
//! report failure and an optional hook fired at the start of every call, which
//! tests use to simulate tokens that call back into the engine.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

use super::{CollateralToken, DebtToken};

/// A token call as seen by a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCall {
    TransferFrom { from: Address, to: Address, amount: U256 },
    Transfer { to: Address, amount: U256 },
    Mint { to: Address, amount: U256 },
    Burn { amount: U256 },
}

/// Hook invoked at the start of every state-changing token call.
pub type CallHook = Arc<dyn Fn(&TokenCall) + Send + Sync>;

/// Balance book shared by both token kinds.
#[derive(Default)]
struct Balances {
    accounts: DashMap<Address, U256>,
    supply: RwLock<U256>,
}

impl Balances {
    fn of(&self, account: &Address) -> U256 {
        self.accounts.get(account).map(|b| *b).unwrap_or(U256::ZERO)
    }

    fn credit(&self, account: Address, amount: U256) {
        *self.accounts.entry(account).or_insert(U256::ZERO) += amount;
    }

    fn debit(&self, account: &Address, amount: U256) -> bool {
        match self.accounts.get_mut(account) {
            Some(mut balance) if *balance >= amount => {
                *balance -= amount;
                true
            }
            _ => amount.is_zero(),
        }
    }

    fn transfer(&self, from: Address, to: Address, amount: U256) -> bool {
        if !self.debit(&from, amount) {
            return false;
        }
        self.credit(to, amount);
        true
    }

    fn mint(&self, to: Address, amount: U256) {
        self.credit(to, amount);
        *self.supply.write() += amount;
    }

    fn burn(&self, from: &Address, amount: U256) -> bool {
        if !self.debit(from, amount) {
            return false;
        }
        *self.supply.write() -= amount;
        true
    }
}

/// Shared hook slot.
#[derive(Default)]
struct HookSlot(RwLock<Option<CallHook>>);

impl HookSlot {
    fn fire(&self, call: TokenCall) {
        // Clone out of the lock so the hook may re-enter the token.
        let hook = self.0.read().clone();
        if let Some(hook) = hook {
            hook(&call);
        }
    }

    fn set(&self, hook: Option<CallHook>) {
        *self.0.write() = hook;
    }
}

/// In-memory collateral token.
pub struct MemoryCollateralToken {
    symbol: String,
    address: Address,
    /// The spender the engine acts as; `transfer` moves its balance
    custodian: Address,
    balances: Balances,
    fail_transfers: AtomicBool,
    hook: HookSlot,
}

impl std::fmt::Debug for MemoryCollateralToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCollateralToken")
            .field("symbol", &self.symbol)
            .field("address", &self.address)
            .field("custodian", &self.custodian)
            .finish()
    }
}

impl MemoryCollateralToken {
    /// Create a token at `address` whose outgoing `transfer`s debit `custodian`.
    pub fn new(symbol: impl Into<String>, address: Address, custodian: Address) -> Self {
        Self {
            symbol: symbol.into(),
            address,
            custodian,
            balances: Balances::default(),
            fail_transfers: AtomicBool::new(false),
            hook: HookSlot::default(),
        }
    }

    /// Token symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Give `account` freshly created tokens.
    pub fn fund(&self, account: Address, amount: U256) {
        self.balances.mint(account, amount);
    }

    /// Make every subsequent transfer report failure.
    pub fn set_fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }

    /// Install a hook fired at the start of every transfer.
    pub fn set_hook(&self, hook: CallHook) {
        self.hook.set(Some(hook));
    }

    /// Remove the transfer hook.
    pub fn clear_hook(&self) {
        self.hook.set(None);
    }

    /// Total tokens in existence.
    pub fn total_supply(&self) -> U256 {
        *self.balances.supply.read()
    }
}

impl CollateralToken for MemoryCollateralToken {
    fn address(&self) -> Address {
        self.address
    }

    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> bool {
        self.hook.fire(TokenCall::TransferFrom { from, to, amount });
        if self.fail_transfers.load(Ordering::SeqCst) {
            return false;
        }
        let ok = self.balances.transfer(from, to, amount);
        trace!(token = %self.symbol, %from, %to, %amount, ok, "transferFrom");
        ok
    }

    fn transfer(&self, to: Address, amount: U256) -> bool {
        self.hook.fire(TokenCall::Transfer { to, amount });
        if self.fail_transfers.load(Ordering::SeqCst) {
            return false;
        }
        let ok = self.balances.transfer(self.custodian, to, amount);
        trace!(token = %self.symbol, %to, %amount, ok, "transfer");
        ok
    }

    fn balance_of(&self, account: Address) -> U256 {
        self.balances.of(&account)
    }
}

/// In-memory synthetic debt token, minted and burned only by its owner.
pub struct MemoryDebtToken {
    address: Address,
    /// Sole minter/burner (the engine)
    owner: Address,
    balances: Balances,
    fail_transfers: AtomicBool,
    fail_mints: AtomicBool,
    fail_burns: AtomicBool,
    hook: HookSlot,
}

impl std::fmt::Debug for MemoryDebtToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDebtToken")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("total_supply", &*self.balances.supply.read())
            .finish()
    }
}

impl MemoryDebtToken {
    /// Create a debt token at `address` owned by `owner`.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            balances: Balances::default(),
            fail_transfers: AtomicBool::new(false),
            fail_mints: AtomicBool::new(false),
            fail_burns: AtomicBool::new(false),
            hook: HookSlot::default(),
        }
    }

    /// Minting authority.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Make every subsequent transfer report failure.
    pub fn set_fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent mint report failure.
    pub fn set_fail_mints(&self, fail: bool) {
        self.fail_mints.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent burn report failure.
    pub fn set_fail_burns(&self, fail: bool) {
        self.fail_burns.store(fail, Ordering::SeqCst);
    }

    /// Install a hook fired at the start of every state-changing call.
    pub fn set_hook(&self, hook: CallHook) {
        self.hook.set(Some(hook));
    }

    /// Remove the call hook.
    pub fn clear_hook(&self) {
        self.hook.set(None);
    }
}

impl DebtToken for MemoryDebtToken {
    fn address(&self) -> Address {
        self.address
    }

    fn mint(&self, to: Address, amount: U256) -> bool {
        self.hook.fire(TokenCall::Mint { to, amount });
        if self.fail_mints.load(Ordering::SeqCst) || amount.is_zero() {
            return false;
        }
        self.balances.mint(to, amount);
        trace!(%to, %amount, "mint");
        true
    }

    fn burn(&self, amount: U256) -> bool {
        self.hook.fire(TokenCall::Burn { amount });
        if self.fail_burns.load(Ordering::SeqCst) || amount.is_zero() {
            return false;
        }
        let ok = self.balances.burn(&self.owner, amount);
        trace!(%amount, ok, "burn");
        ok
    }

    fn transfer_from(&self, from: Address, to: Address, amount: U256) -> bool {
        self.hook.fire(TokenCall::TransferFrom { from, to, amount });
        if self.fail_transfers.load(Ordering::SeqCst) {
            return false;
        }
        self.balances.transfer(from, to, amount)
    }

    fn transfer(&self, to: Address, amount: U256) -> bool {
        self.hook.fire(TokenCall::Transfer { to, amount });
        if self.fail_transfers.load(Ordering::SeqCst) {
            return false;
        }
        self.balances.transfer(self.owner, to, amount)
    }

    fn balance_of(&self, account: Address) -> U256 {
        self.balances.of(&account)
    }

    fn total_supply(&self) -> U256 {
        *self.balances.supply.read()
    }
}
