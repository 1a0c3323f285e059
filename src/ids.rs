//! Identifiers for instance-level entities.
//!
//! Spec entities (`WorkflowSpec`, `CourseSpec`, `NodeSpec`, `TransitionSpec`)
//! are addressed by author-chosen codes and reconstructed by lookup (see
//! the Design Notes in spec.md §9); only runtime instances get generated
//! `Uuid`-backed identifiers, matching the teacher's `WorkflowInstanceId`
//! newtype style.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(WorkflowInstanceId);
uuid_id!(CourseInstanceId);
uuid_id!(NodeInstanceId);

/// Opaque permission identifier of the form `app.permission`; the host's
/// permission oracle interprets it (spec.md §6).
pub type PermissionId = String;

/// Name key into the [`crate::callables::CallableRegistry`].
pub type CallableName = String;
