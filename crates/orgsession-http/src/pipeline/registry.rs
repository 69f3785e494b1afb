//! Per-instance pipeline registry.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use orgsession_core::config::PipelineConfig;
use orgsession_core::types::InstanceId;

use super::stages::RequestPipeline;

/// Owns one [`RequestPipeline`] per instance id.
///
/// Asking twice for the same id returns the same pipeline; different ids
/// never share one.
#[derive(Debug)]
pub struct PipelineRegistry {
    /// Pipelines keyed by instance.
    pipelines: DashMap<InstanceId, Arc<RequestPipeline>>,
    /// Defaults for newly created pipelines.
    defaults: PipelineConfig,
}

impl PipelineRegistry {
    /// Create an empty registry.
    pub fn new(defaults: PipelineConfig) -> Self {
        Self {
            pipelines: DashMap::new(),
            defaults,
        }
    }

    /// Defaults applied to new pipelines.
    pub fn defaults(&self) -> &PipelineConfig {
        &self.defaults
    }

    /// The pipeline of `instance_id`, created on first use.
    pub fn get_or_create(&self, instance_id: InstanceId) -> Arc<RequestPipeline> {
        let entry = self.pipelines.entry(instance_id).or_insert_with(|| {
            debug!(instance_id = %instance_id, "Creating request pipeline");
            Arc::new(RequestPipeline::new(instance_id, &self.defaults))
        });
        Arc::clone(entry.value())
    }

    /// The pipeline of `instance_id`, if it exists.
    pub fn get(&self, instance_id: InstanceId) -> Option<Arc<RequestPipeline>> {
        self.pipelines
            .get(&instance_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Drop the pipeline of `instance_id`. Returns whether one existed.
    ///
    /// Holders of the old `Arc` keep a working pipeline; the next
    /// `get_or_create` builds a fresh one.
    pub fn dispose(&self, instance_id: InstanceId) -> bool {
        let removed = self.pipelines.remove(&instance_id).is_some();
        if removed {
            debug!(instance_id = %instance_id, "Disposed request pipeline");
        }
        removed
    }

    /// Ids with a live pipeline, ascending.
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<InstanceId> = self.pipelines.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    /// Number of live pipelines.
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Whether no pipeline exists.
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
