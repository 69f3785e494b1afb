//! Instance status events.

use serde::{Deserialize, Serialize};

use crate::types::{InstanceId, InstanceRecord};

/// Changes to the shared instance status table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StatusEvent {
    /// An instance published a new record.
    Changed {
        /// The record as written.
        record: InstanceRecord,
    },
    /// An instance's record was removed.
    Cleared {
        /// The instance whose record was removed.
        instance_id: InstanceId,
    },
    /// The whole table was removed.
    AllCleared,
}

impl StatusEvent {
    /// Whether the event can affect `instance_id`'s record.
    pub fn concerns(&self, instance_id: InstanceId) -> bool {
        match self {
            Self::Changed { record } => record.instance_id == instance_id,
            Self::Cleared { instance_id: id } => *id == instance_id,
            Self::AllCleared => true,
        }
    }
}
