//! Persisted record of a course instance having landed on a node.
//!
//! Only the persistent node types produce one of these (Design Notes
//! item 3): ENTER, STEP, and MULTIPLEXER are transient way-stations the
//! executor passes through within a single `advance` call and leaves no
//! trace of.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::NodeInstanceId;
use crate::spec::NodeType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: NodeInstanceId,
    /// Code of the `NodeSpec` this instance landed on.
    pub node_code: String,
    pub node_type: NodeType,
    pub entered_at: DateTime<Utc>,
    /// Snapshot of the node spec's `exit_value`, set only when
    /// `node_type` is EXIT. Captured at landing time so a status map can
    /// be built without re-resolving the spec (spec.md §4.4.3).
    pub exit_value: Option<i64>,
}

impl NodeInstance {
    pub fn new(node_code: impl Into<String>, node_type: NodeType, entered_at: DateTime<Utc>) -> Self {
        Self {
            id: NodeInstanceId::new(),
            node_code: node_code.into(),
            node_type,
            entered_at,
            exit_value: None,
        }
    }

    pub fn with_exit_value(mut self, exit_value: u32) -> Self {
        self.exit_value = Some(exit_value as i64);
        self
    }
}
