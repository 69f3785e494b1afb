//! Parent sign-out subscriptions.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use orgsession_core::result::AppResult;

/// Callback run when the parent signs out.
pub type SignOutCallback = Arc<dyn Fn() -> AppResult<()> + Send + Sync>;

/// Outcome of notifying every subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignOutReport {
    /// Subscribers invoked.
    pub notified: usize,
    /// Subscribers whose callback returned an error or panicked.
    pub failed: usize,
}

/// The set of registered sign-out callbacks.
#[derive(Default)]
pub struct SignOutSubscribers {
    /// Next subscription id.
    next_id: AtomicU64,
    /// Callbacks keyed by subscription id.
    callbacks: DashMap<u64, SignOutCallback>,
}

impl std::fmt::Debug for SignOutSubscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignOutSubscribers")
            .field("count", &self.callbacks.len())
            .finish()
    }
}

impl SignOutSubscribers {
    /// Add a callback. Returns its subscription id.
    pub fn add(&self, callback: SignOutCallback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.insert(id, callback);
        id
    }

    /// Remove exactly the callback registered under `id`.
    pub fn remove(&self, id: u64) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invoke every callback once, in subscription order.
    ///
    /// A failing or panicking callback is logged and the rest still run.
    pub fn notify_all(&self) -> SignOutReport {
        // Snapshot first so callbacks may unsubscribe without deadlocking a shard.
        let mut snapshot: Vec<(u64, SignOutCallback)> = self
            .callbacks
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);

        let mut report = SignOutReport::default();
        for (id, callback) in snapshot {
            report.notified += 1;
            match catch_unwind(AssertUnwindSafe(|| callback())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(subscription = id, error = %e, "Sign-out subscriber failed");
                }
                Err(_) => {
                    report.failed += 1;
                    warn!(subscription = id, "Sign-out subscriber panicked");
                }
            }
        }
        report
    }
}

/// Handle returned by a sign-out subscription.
///
/// Dropping the handle keeps the subscription; call [`unsubscribe`](Self::unsubscribe)
/// to remove it.
#[derive(Debug)]
pub struct SignOutSubscription {
    id: u64,
    subscribers: Weak<SignOutSubscribers>,
}

impl SignOutSubscription {
    pub(crate) fn new(id: u64, subscribers: &Arc<SignOutSubscribers>) -> Self {
        Self {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }

    /// Subscription id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove this subscription. Returns whether it was still registered.
    pub fn unsubscribe(self) -> bool {
        self.subscribers
            .upgrade()
            .is_some_and(|subscribers| subscribers.remove(self.id))
    }
}
