//! The subject document a workflow instance is bound to.
//!
//! The persistence layer and the document's own domain model are out of
//! scope for this crate (spec.md §1); the engine only needs enough of the
//! document to identify it (for the `(document_type, object_id)` pair on
//! `WorkflowInstance`) and to hand it to permission checks and callables.
//! Hosts implement [`Document`] over their own aggregate/entity type.

use uuid::Uuid;

/// A document a workflow instance is attached to.
pub trait Document: std::fmt::Debug + Send + Sync {
    /// Type tag identifying which document class this is, matching
    /// `WorkflowSpec::document_type`.
    fn document_type(&self) -> &str;

    /// The document's identity within its type.
    fn object_id(&self) -> Uuid;
}

/// Minimal [`Document`] implementation for tests and simple hosts that
/// have no richer document model of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRef {
    document_type: &'static str,
    object_id: Uuid,
}

impl DocumentRef {
    pub fn new(document_type: &'static str, object_id: Uuid) -> Self {
        Self {
            document_type,
            object_id,
        }
    }
}

impl Document for DocumentRef {
    fn document_type(&self) -> &str {
        self.document_type
    }

    fn object_id(&self) -> Uuid {
        self.object_id
    }
}
