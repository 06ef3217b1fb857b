//! Non-reentrant lock around mutating engine operations.
//!
//! Other threads block until the current operation finishes. A nested entry
//! from the thread already inside an operation (an external call looping back
//! into the engine) is rejected instead of deadlocking.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::Cell;

use crate::error::{EngineError, Result};

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: ReentrantMutex<Cell<bool>>,
}

/// Held for the lifetime of one guarded operation.
pub struct Entered<'a> {
    entered: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a guarded section, or fail if this thread is already inside one.
    pub fn enter(&self) -> Result<Entered<'_>> {
        let entered = self.entered.lock();
        if entered.replace(true) {
            return Err(EngineError::Reentrancy);
        }
        Ok(Entered { entered })
    }

    /// Whether an operation is in flight (on any thread).
    pub fn is_entered(&self) -> bool {
        self.entered
            .try_lock()
            .map(|entered| entered.get())
            .unwrap_or(true)
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.entered.set(false);
    }
}
