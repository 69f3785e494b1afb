//! Instance runtime: the explicit home of every per-instance registry.
//!
//! One runtime owns the storage handle, the status table, the parent wait
//! protocol and the pipeline registry. Hosts that run several runtimes
//! against the same storage see the same status table.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use orgsession_auth::{MultiOrgCoordinator, SubInstanceBootstrap};
use orgsession_coord::{InstanceStatusStore, ParentWaitProtocol, WaitOptions};
use orgsession_core::config::AppConfig;
use orgsession_core::result::AppResult;
use orgsession_core::traits::{ParentSession, SessionStorage, TokenExchanger};
use orgsession_core::types::{InstanceId, OrganizationId, TokenResult};
use orgsession_http::{
    AuthHttpClient, BearerTokenAttacher, LifecycleCallbacks, PipelineRegistry, PipelineSettings,
    RequestPipeline, StaticTokenAttacher,
};
use orgsession_storage::StorageManager;

/// Owns the shared state of all session instances in this process.
#[derive(Debug)]
pub struct InstanceRuntime {
    /// Runtime configuration.
    config: AppConfig,
    /// Session storage backend.
    storage: Arc<dyn SessionStorage>,
    /// Shared instance status table.
    store: InstanceStatusStore,
    /// Parent wait protocol over `store`.
    protocol: ParentWaitProtocol,
    /// One request pipeline per instance.
    pipelines: PipelineRegistry,
}

impl InstanceRuntime {
    /// Build a runtime with the storage backend named in `config`.
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let manager = StorageManager::new(&config.storage).await?;
        Ok(Self::with_storage(config, manager.storage()))
    }

    /// Build a runtime on an existing storage handle.
    pub fn with_storage(config: AppConfig, storage: Arc<dyn SessionStorage>) -> Self {
        let store = InstanceStatusStore::from_config(Arc::clone(&storage), &config.storage);
        let protocol = ParentWaitProtocol::new(store.clone(), &config.coordination);
        let pipelines = PipelineRegistry::new(config.pipeline.clone());

        info!(
            provider = storage.provider_type(),
            status_key = store.key(),
            "Instance runtime ready"
        );

        Self {
            config,
            storage,
            store,
            protocol,
            pipelines,
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Session storage backend.
    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Shared instance status table.
    pub fn status_store(&self) -> &InstanceStatusStore {
        &self.store
    }

    /// Parent wait protocol.
    pub fn wait_protocol(&self) -> &ParentWaitProtocol {
        &self.protocol
    }

    /// Wait options from configuration.
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::from_config(&self.config.coordination)
    }

    /// Pipeline registry.
    pub fn pipelines(&self) -> &PipelineRegistry {
        &self.pipelines
    }

    /// The request pipeline of `instance_id`, created on first use.
    pub fn pipeline(&self, instance_id: InstanceId) -> Arc<RequestPipeline> {
        self.pipelines.get_or_create(instance_id)
    }

    /// An HTTP client bound to `instance_id`'s pipeline.
    pub fn http_client(&self, instance_id: InstanceId) -> AppResult<AuthHttpClient> {
        AuthHttpClient::new(self.pipeline(instance_id), &self.config.pipeline)
    }

    /// Configure `instance_id`'s pipeline to attach the parent's current token.
    pub async fn attach_parent_session(
        &self,
        instance_id: InstanceId,
        parent: Arc<dyn ParentSession>,
        callbacks: LifecycleCallbacks,
    ) {
        let settings = PipelineSettings::from_config(&self.config.pipeline)
            .with_attacher(Arc::new(BearerTokenAttacher::new(parent)))
            .with_callbacks(callbacks);
        self.pipeline(instance_id).init(settings).await;
    }

    /// A coordinator for sub-organizations of `parent`.
    pub fn coordinator(
        &self,
        parent: Arc<dyn ParentSession>,
        exchanger: Arc<dyn TokenExchanger>,
    ) -> Arc<MultiOrgCoordinator> {
        Arc::new(MultiOrgCoordinator::new(parent, exchanger))
    }

    /// A bootstrap for sub-instances of `parent_instance`.
    pub fn bootstrap(
        &self,
        parent_instance: InstanceId,
        coordinator: Arc<MultiOrgCoordinator>,
    ) -> SubInstanceBootstrap {
        SubInstanceBootstrap::new(
            parent_instance,
            coordinator,
            self.protocol.clone(),
            self.wait_options(),
        )
    }

    /// Mount a sub-instance and point its pipeline at the exchanged token.
    pub async fn mount_sub_instance(
        &self,
        bootstrap: &SubInstanceBootstrap,
        sub_instance: InstanceId,
        organization_id: &OrganizationId,
        cancel: &CancellationToken,
    ) -> AppResult<TokenResult> {
        let token = bootstrap.mount(sub_instance, organization_id, cancel).await?;

        let settings = PipelineSettings::from_config(&self.config.pipeline)
            .with_attacher(Arc::new(StaticTokenAttacher::new(&token.access_token)?));
        self.pipeline(sub_instance).init(settings).await;

        Ok(token)
    }

    /// Remove `instance_id`'s status record and dispose its pipeline.
    pub async fn teardown(&self, instance_id: InstanceId) {
        self.store.clear_status(instance_id).await;
        self.pipelines.dispose(instance_id);
        info!(instance_id = %instance_id, "Instance torn down");
    }
}
