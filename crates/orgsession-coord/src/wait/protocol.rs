//! Waiting for a parent instance to finish signing in.
//!
//! A sub-instance cannot call into its parent, so it watches the parent's
//! record in the shared status table. Each round checks the timeout, reads
//! the record once, and then sleeps for one poll interval. A status event
//! for the parent written in this process cuts the sleep short.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use orgsession_core::config::CoordinationConfig;
use orgsession_core::events::StatusEvent;
use orgsession_core::types::{InstanceId, InstanceStatus, now_millis};

use super::outcome::{ParentObservation, WaitOutcome};
use crate::status::InstanceStatusStore;

/// Shortest delay between two reads of the parent's record.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timeout and poll interval of one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up once this much time has passed since the wait started.
    pub timeout: Duration,
    /// Delay between two reads of the parent's record. Never below
    /// [`MIN_POLL_INTERVAL`].
    pub poll_interval: Duration,
}

impl WaitOptions {
    /// Create wait options. `poll_interval` is raised to
    /// [`MIN_POLL_INTERVAL`].
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Build options from millisecond values.
    pub fn from_millis(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_interval_ms),
        )
    }

    /// Options taken from the coordination configuration.
    pub fn from_config(config: &CoordinationConfig) -> Self {
        Self::new(config.wait_timeout(), config.poll_interval())
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_config(&CoordinationConfig::default())
    }
}

/// Observes a parent instance's record until it becomes terminal.
#[derive(Debug, Clone)]
pub struct ParentWaitProtocol {
    /// Shared status table.
    store: InstanceStatusStore,
    /// Age after which a record counts as dead.
    stale_after: Duration,
    /// Whether status events short-circuit the poll interval.
    listen_for_updates: bool,
}

impl ParentWaitProtocol {
    /// Create a protocol over `store` with the configured staleness policy.
    pub fn new(store: InstanceStatusStore, config: &CoordinationConfig) -> Self {
        Self {
            store,
            stale_after: config.stale_after(),
            listen_for_updates: config.listen_for_updates,
        }
    }

    /// The status table this protocol reads.
    pub fn store(&self) -> &InstanceStatusStore {
        &self.store
    }

    /// Staleness threshold.
    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Whether the parent is authenticated right now. Never waits and
    /// never looks at the record's age.
    pub async fn is_parent_ready(&self, parent: InstanceId) -> bool {
        matches!(
            self.store.get_status(parent).await,
            Some(record) if record.status == InstanceStatus::Authenticated
        )
    }

    /// Read the parent's record once and classify it.
    ///
    /// Age is checked before status, so an old `authenticated` record is
    /// reported as [`ParentObservation::Stale`].
    pub async fn observe(&self, parent: InstanceId) -> ParentObservation {
        let Some(record) = self.store.get_status(parent).await else {
            return ParentObservation::Missing;
        };

        if record.is_stale_at(self.stale_after, now_millis()) {
            return ParentObservation::Stale;
        }

        match record.status {
            InstanceStatus::Authenticated => ParentObservation::Ready,
            InstanceStatus::Failed => ParentObservation::Failed,
            other => ParentObservation::Pending(other),
        }
    }

    /// Wait until the parent is authenticated. `false` on failure,
    /// staleness, or timeout.
    pub async fn wait_for_parent(&self, parent: InstanceId, options: WaitOptions) -> bool {
        self.wait_for_parent_until(parent, options, &CancellationToken::new())
            .await
            .is_ready()
    }

    /// Wait for the parent, ending early if `cancel` fires.
    pub async fn wait_for_parent_until(
        &self,
        parent: InstanceId,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        let started = Instant::now();
        let deadline = started + options.timeout;
        let poll_interval = options.poll_interval.max(MIN_POLL_INTERVAL);

        // Subscribe before the first read so no write slips between them.
        let mut events = self.listen_for_updates.then(|| self.store.subscribe());

        debug!(
            parent = %parent,
            timeout_ms = options.timeout.as_millis() as u64,
            poll_ms = poll_interval.as_millis() as u64,
            "Waiting for parent instance"
        );

        let outcome = loop {
            if cancel.is_cancelled() {
                break WaitOutcome::Cancelled;
            }
            if Instant::now() >= deadline {
                break WaitOutcome::TimedOut;
            }

            if let Some(outcome) = self.observe(parent).await.outcome() {
                break outcome;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::select! {
                _ = cancel.cancelled() => break WaitOutcome::Cancelled,
                _ = sleep(poll_interval.min(remaining)) => {}
                _ = next_relevant_event(events.as_mut(), parent) => {}
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if outcome.is_ready() {
            info!(parent = %parent, elapsed_ms, "Parent instance is ready");
        } else {
            info!(parent = %parent, elapsed_ms, outcome = %outcome, "Parent instance unavailable");
        }
        outcome
    }
}

/// Resolve on the next event that can change `parent`'s record.
///
/// Never resolves when listening is off or the channel is gone, leaving the
/// poll timer in charge.
async fn next_relevant_event(
    events: Option<&mut broadcast::Receiver<StatusEvent>>,
    parent: InstanceId,
) {
    let Some(events) = events else {
        return std::future::pending().await;
    };

    loop {
        match events.recv().await {
            Ok(event) if event.concerns(parent) => return,
            Ok(_) => continue,
            // Missed events may include ours.
            Err(RecvError::Lagged(_)) => return,
            Err(RecvError::Closed) => return std::future::pending().await,
        }
    }
}
