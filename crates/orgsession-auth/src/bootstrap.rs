//! Sub-instance mount and unmount.
//!
//! Mounting a sub-instance publishes `initializing`, waits for the parent
//! to be ready, publishes `authenticating`, registers the sub-organization
//! through the parent's coordinator, and finally publishes `authenticated`
//! or `failed`. While mounted, a parent sign-out moves the sub-instance to
//! `idle` once and ends the mount.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use orgsession_coord::{InstanceStatusStore, ParentWaitProtocol, WaitOptions, WaitOutcome};
use orgsession_core::error::AppError;
use orgsession_core::result::AppResult;
use orgsession_core::types::{InstanceId, InstanceStatus, OrganizationId, TokenResult};

use crate::multiorg::{MultiOrgCoordinator, SignOutSubscription};

/// Drives sub-instances of one parent through their lifecycle.
#[derive(Debug)]
pub struct SubInstanceBootstrap {
    /// The parent instance.
    parent_instance: InstanceId,
    /// The parent's coordinator.
    coordinator: Arc<MultiOrgCoordinator>,
    /// Parent wait protocol over the shared status table.
    protocol: ParentWaitProtocol,
    /// Wait policy for mounts.
    wait_options: WaitOptions,
    /// Sign-out subscriptions of mounted sub-instances.
    subscriptions: Arc<DashMap<InstanceId, SignOutSubscription>>,
    /// Sub-instances signed out whose `idle` write has not landed yet.
    pending_idle: Arc<DashMap<InstanceId, ()>>,
    /// Orders `idle` writes against mount and unmount status writes.
    lifecycle: Arc<Mutex<()>>,
}

impl SubInstanceBootstrap {
    /// Create a bootstrap for sub-instances of `parent_instance`.
    pub fn new(
        parent_instance: InstanceId,
        coordinator: Arc<MultiOrgCoordinator>,
        protocol: ParentWaitProtocol,
        wait_options: WaitOptions,
    ) -> Self {
        Self {
            parent_instance,
            coordinator,
            protocol,
            wait_options,
            subscriptions: Arc::new(DashMap::new()),
            pending_idle: Arc::new(DashMap::new()),
            lifecycle: Arc::new(Mutex::new(())),
        }
    }

    /// The parent's coordinator.
    pub fn coordinator(&self) -> &Arc<MultiOrgCoordinator> {
        &self.coordinator
    }

    fn store(&self) -> &InstanceStatusStore {
        self.protocol.store()
    }

    /// Mount `sub_instance` as a session of `organization_id`.
    ///
    /// Cancellation while waiting for the parent removes the sub-instance's
    /// record and returns a `Cancelled` error. Any other failure leaves it
    /// `failed`.
    pub async fn mount(
        &self,
        sub_instance: InstanceId,
        organization_id: &OrganizationId,
        cancel: &CancellationToken,
    ) -> AppResult<TokenResult> {
        let store = self.store();
        {
            let _lifecycle = self.lifecycle.lock().await;
            self.pending_idle.remove(&sub_instance);
            store.set_status(sub_instance, InstanceStatus::Initializing).await;
        }

        let outcome = self
            .protocol
            .wait_for_parent_until(self.parent_instance, self.wait_options, cancel)
            .await;

        match outcome {
            WaitOutcome::Ready => {}
            WaitOutcome::Cancelled => {
                store.clear_status(sub_instance).await;
                return Err(AppError::cancelled(format!(
                    "Mount of instance {sub_instance} was cancelled"
                )));
            }
            other => {
                store.set_status(sub_instance, InstanceStatus::Failed).await;
                warn!(
                    sub_instance = %sub_instance,
                    parent = %self.parent_instance,
                    outcome = %other,
                    "Parent instance not ready"
                );
                return Err(AppError::parent_unavailable(format!(
                    "Parent instance {} is not ready ({other})",
                    self.parent_instance
                )));
            }
        }

        store.set_status(sub_instance, InstanceStatus::Authenticating).await;

        let token = match self
            .coordinator
            .register_sub_org(organization_id, sub_instance)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                store.set_status(sub_instance, InstanceStatus::Failed).await;
                warn!(
                    sub_instance = %sub_instance,
                    organization_id = %organization_id,
                    error = %e,
                    "Sub-organization registration failed"
                );
                return Err(e);
            }
        };

        store.set_status(sub_instance, InstanceStatus::Authenticated).await;
        self.watch_parent_sign_out(sub_instance);

        info!(
            sub_instance = %sub_instance,
            organization_id = %organization_id,
            "Sub-instance mounted"
        );
        Ok(token)
    }

    /// Unmount `sub_instance`: deactivate its session and remove its record.
    pub async fn unmount(&self, sub_instance: InstanceId, organization_id: &OrganizationId) {
        let _lifecycle = self.lifecycle.lock().await;
        self.pending_idle.remove(&sub_instance);
        if let Some((_, subscription)) = self.subscriptions.remove(&sub_instance) {
            subscription.unsubscribe();
        }
        self.coordinator.unregister_sub_org(organization_id).await;
        self.store().clear_status(sub_instance).await;

        info!(
            sub_instance = %sub_instance,
            organization_id = %organization_id,
            "Sub-instance unmounted"
        );
    }

    /// Whether `sub_instance` is currently mounted through this bootstrap.
    pub fn is_mounted(&self, sub_instance: InstanceId) -> bool {
        self.subscriptions.contains_key(&sub_instance)
    }

    fn watch_parent_sign_out(&self, sub_instance: InstanceId) {
        let store = self.store().clone();
        let subscriptions = Arc::clone(&self.subscriptions);
        let pending_idle = Arc::clone(&self.pending_idle);
        let lifecycle = Arc::clone(&self.lifecycle);

        let subscription = self.coordinator.on_parent_sign_out(move || {
            // One-shot: the mount ends with the parent session.
            if let Some((_, subscription)) = subscriptions.remove(&sub_instance) {
                subscription.unsubscribe();
            }
            pending_idle.insert(sub_instance, ());

            let store = store.clone();
            let pending_idle = Arc::clone(&pending_idle);
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move {
                let _lifecycle = lifecycle.lock().await;
                // Skipped when unmount or a new mount got here first.
                if pending_idle.remove(&sub_instance).is_some() {
                    store.set_status(sub_instance, InstanceStatus::Idle).await;
                }
            });
            Ok(())
        });

        if let Some(previous) = self.subscriptions.insert(sub_instance, subscription) {
            previous.unsubscribe();
        }
    }
}
