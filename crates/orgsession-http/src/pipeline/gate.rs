//! The handler gate: whether lifecycle callbacks fire.
//!
//! The enabled flag and a generation counter share one atomic word (low
//! bit = enabled) so a timed re-enable can check "nobody touched the gate
//! since I disabled it" and flip the flag in a single compare-exchange.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

const ENABLED_BIT: u64 = 1;

/// Shared on/off switch for a pipeline's callbacks.
#[derive(Debug)]
pub(crate) struct HandlerGate {
    word: AtomicU64,
}

impl HandlerGate {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            word: AtomicU64::new(u64::from(enabled)),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.word.load(Ordering::Acquire) & ENABLED_BIT == ENABLED_BIT
    }

    /// Set the flag and start a new generation. Returns the new word.
    pub(crate) fn set(&self, enabled: bool) -> u64 {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            let next = ((current >> 1).wrapping_add(1) << 1) | u64::from(enabled);
            match self.word.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Disable now and re-enable after `duration` unless the gate changes
    /// in the meantime.
    pub(crate) fn suspend(self: &Arc<Self>, duration: Duration) -> JoinHandle<()> {
        let disabled = self.set(false);
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = gate.word.compare_exchange(
                disabled,
                disabled | ENABLED_BIT,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        })
    }
}
