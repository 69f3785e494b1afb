//! Multi-organization coordinator of a parent instance.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, warn};

use orgsession_core::error::AppError;
use orgsession_core::events::SubOrgEvent;
use orgsession_core::result::AppResult;
use orgsession_core::traits::{ParentSession, TokenExchanger};
use orgsession_core::types::{InstanceId, Organization, OrganizationId, TokenResult};

use super::session::SubOrgSession;
use super::signout::{SignOutReport, SignOutSubscribers, SignOutSubscription};

/// Capacity of the sub-organization event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Hosts the organization-scoped sub-sessions of one parent instance.
pub struct MultiOrgCoordinator {
    /// The parent's session state.
    parent: Arc<dyn ParentSession>,
    /// Token exchange with the identity provider.
    exchanger: Arc<dyn TokenExchanger>,
    /// Sub-sessions keyed by organization id, including inactive history.
    sessions: RwLock<BTreeMap<OrganizationId, SubOrgSession>>,
    /// One registration at a time per organization.
    registration_locks: DashMap<OrganizationId, Arc<Mutex<()>>>,
    /// Bumped on every parent sign-out, under the `sessions` write lock.
    sign_out_epoch: AtomicU64,
    /// Parent sign-out subscribers.
    subscribers: Arc<SignOutSubscribers>,
    /// Session lifecycle events.
    events: broadcast::Sender<SubOrgEvent>,
}

impl std::fmt::Debug for MultiOrgCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiOrgCoordinator")
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

impl MultiOrgCoordinator {
    /// Create a coordinator for `parent`.
    pub fn new(parent: Arc<dyn ParentSession>, exchanger: Arc<dyn TokenExchanger>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            parent,
            exchanger,
            sessions: RwLock::new(BTreeMap::new()),
            registration_locks: DashMap::new(),
            sign_out_epoch: AtomicU64::new(0),
            subscribers: Arc::new(SignOutSubscribers::default()),
            events,
        }
    }

    /// Subscribe to sub-organization session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SubOrgEvent> {
        self.events.subscribe()
    }

    /// Whether `organization_id` is in the parent's membership list.
    ///
    /// An empty or unloaded list is `false`, not an error.
    pub async fn validate_membership(&self, organization_id: &OrganizationId) -> bool {
        self.find_organization(organization_id).await.is_some()
    }

    /// Exchange the parent's credential for `organization_id` and bind the
    /// resulting session to `sub_instance`.
    ///
    /// Preconditions are checked in order: parent signed in, organization
    /// in the membership list, no active session for the organization.
    /// Exchange failures are returned unchanged. A second registration of
    /// the same organization waits for the first to finish and then fails
    /// with `AlreadyExists` if the first succeeded. A parent sign-out while
    /// the exchange is in flight fails the registration with `NotSignedIn`
    /// and records nothing.
    pub async fn register_sub_org(
        &self,
        organization_id: &OrganizationId,
        sub_instance: InstanceId,
    ) -> AppResult<TokenResult> {
        let epoch = self.sign_out_epoch.load(Ordering::Acquire);

        // Step 1: the parent must be signed in
        if !self.parent.is_signed_in().await {
            return Err(AppError::not_signed_in(format!(
                "Cannot register '{organization_id}' before the parent has signed in"
            )));
        }

        // Step 2: the organization must be one the parent belongs to
        let Some(organization) = self.find_organization(organization_id).await else {
            return Err(AppError::invalid_organization(format!(
                "'{organization_id}' is not an organization of the signed-in user"
            )));
        };

        // Step 3: serialize with other registrations of this organization
        let lock = self.registration_lock(organization_id);
        let _guard = lock.lock().await;

        if self.has_active_session(organization_id).await {
            return Err(AppError::already_exists(format!(
                "An active session already exists for '{organization_id}'"
            )));
        }

        // Step 4: token exchange
        debug!(organization_id = %organization_id, sub_instance = %sub_instance, "Exchanging token");
        let token = self.exchanger.exchange(organization_id).await?;

        // Step 5: record the active session, replacing any inactive history
        {
            let mut sessions = self.sessions.write().await;
            if self.sign_out_epoch.load(Ordering::Acquire) != epoch {
                warn!(
                    organization_id = %organization_id,
                    sub_instance = %sub_instance,
                    "Parent signed out during token exchange, discarding session"
                );
                return Err(AppError::not_signed_in(format!(
                    "The parent signed out while '{organization_id}' was being registered"
                )));
            }
            sessions.insert(
                organization_id.clone(),
                SubOrgSession::active(organization, sub_instance),
            );
        }

        let _ = self.events.send(SubOrgEvent::Registered {
            organization_id: organization_id.clone(),
            instance_id: sub_instance,
        });

        info!(
            organization_id = %organization_id,
            sub_instance = %sub_instance,
            "Sub-organization registered"
        );

        Ok(token)
    }

    /// Mark the session of `organization_id` inactive. The record is kept.
    ///
    /// Returns whether an active session was deactivated.
    pub async fn unregister_sub_org(&self, organization_id: &OrganizationId) -> bool {
        let deactivated = {
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(organization_id) {
                Some(session) if session.is_active => {
                    session.is_active = false;
                    true
                }
                _ => false,
            }
        };

        if deactivated {
            let _ = self.events.send(SubOrgEvent::Unregistered {
                organization_id: organization_id.clone(),
            });
            info!(organization_id = %organization_id, "Sub-organization unregistered");
        }
        deactivated
    }

    /// Tell every sign-out subscriber the parent signed out, then forget
    /// all sessions.
    pub async fn sign_out_all_sub_orgs(&self) -> SignOutReport {
        let report = self.subscribers.notify_all();

        let cleared = {
            let mut sessions = self.sessions.write().await;
            self.sign_out_epoch.fetch_add(1, Ordering::AcqRel);
            let count = sessions.len();
            sessions.clear();
            count
        };

        if report.failed > 0 {
            warn!(
                notified = report.notified,
                failed = report.failed,
                "Some sign-out subscribers failed"
            );
        }
        info!(
            notified = report.notified,
            sessions_cleared = cleared,
            "Parent signed out of all sub-organizations"
        );

        let _ = self.events.send(SubOrgEvent::ParentSignedOut {
            notified: report.notified,
            failed: report.failed,
        });
        report
    }

    /// Register a callback for parent sign-out.
    pub fn on_parent_sign_out(
        &self,
        callback: impl Fn() -> AppResult<()> + Send + Sync + 'static,
    ) -> SignOutSubscription {
        let id = self.subscribers.add(Arc::new(callback));
        SignOutSubscription::new(id, &self.subscribers)
    }

    /// Number of sign-out subscribers.
    pub fn sign_out_subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The parent's current access token. Never cached here.
    pub async fn get_parent_access_token(&self) -> AppResult<String> {
        self.parent.access_token().await
    }

    /// Every session, active or not, ordered by organization id.
    pub async fn sessions(&self) -> Vec<SubOrgSession> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Active sessions, ordered by organization id.
    pub async fn active_sessions(&self) -> Vec<SubOrgSession> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|session| session.is_active)
            .cloned()
            .collect()
    }

    /// The session of `organization_id`, if any.
    pub async fn session(&self, organization_id: &OrganizationId) -> Option<SubOrgSession> {
        self.sessions.read().await.get(organization_id).cloned()
    }

    async fn has_active_session(&self, organization_id: &OrganizationId) -> bool {
        self.sessions
            .read()
            .await
            .get(organization_id)
            .is_some_and(|session| session.is_active)
    }

    async fn find_organization(&self, organization_id: &OrganizationId) -> Option<Organization> {
        self.parent
            .available_organizations()
            .await
            .unwrap_or_default()
            .into_iter()
            .find(|organization| organization.id == *organization_id)
    }

    fn registration_lock(&self, organization_id: &OrganizationId) -> Arc<Mutex<()>> {
        let entry = self
            .registration_locks
            .entry(organization_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }
}
