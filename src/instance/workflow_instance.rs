//! A running workflow bound to one document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::WorkflowInstanceId;

use super::course_instance::CourseInstance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    pub id: WorkflowInstanceId,
    /// Code of the `WorkflowSpec` this instance runs.
    pub workflow_code: String,
    pub document_type: String,
    pub object_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// The single parent-less course instance (the root course).
    /// `spec.md` §9's Open Question is resolved in favor of exactly one;
    /// `WorkflowInstance::new` enforces it by construction.
    pub root: CourseInstance,
}

impl WorkflowInstance {
    pub fn new(
        workflow_code: impl Into<String>,
        document_type: impl Into<String>,
        object_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WorkflowInstanceId::new(),
            workflow_code: workflow_code.into(),
            document_type: document_type.into(),
            object_id,
            started_at,
            root: CourseInstance::new_pending("", started_at),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.root.is_terminated()
    }
}
