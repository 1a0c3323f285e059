//! A permission-gated workflow state machine core.
//!
//! A [`spec::WorkflowSpec`] declares a graph of courses, nodes, and
//! transitions; a [`installer`] turns a declarative input tree into one,
//! validated once at install time. An [`executor::WorkflowExecutor`]
//! then drives [`instance::WorkflowInstance`]s through that graph via
//! four externally-initiated operations — Start, Advance, Cancel, Join —
//! gated by a host-supplied [`permission::PermissionOracle`] and backed
//! by host-supplied [`repository`] traits. Persistence, the permission
//! oracle, and the subject [`document::Document`] itself are external
//! collaborators; this crate owns only the graph and its traversal.

pub mod callables;
pub mod document;
pub mod error;
pub mod executor;
pub mod ids;
pub mod installer;
pub mod instance;
pub mod navigation;
pub mod permission;
pub mod repository;
pub mod spec;

pub use callables::{CallableRegistry, Condition, Joiner, LandingHandler};
pub use document::{Document, DocumentRef};
pub use error::{PermissionError, SpecError, StructuralError, ValidationErrors, WorkflowError, WorkflowResult};
pub use executor::WorkflowExecutor;
pub use ids::{CallableName, CourseInstanceId, NodeInstanceId, PermissionId, WorkflowInstanceId};
pub use instance::{CourseInstance, NodeInstance, WorkflowInstance};
pub use permission::{PermissionGate, PermissionOracle};
pub use repository::{
    InMemoryWorkflowInstanceRepository, InMemoryWorkflowSpecRepository, WorkflowInstanceRepository,
    WorkflowSpecRepository,
};
pub use spec::{CourseSpec, NodeKind, NodeSpec, NodeType, TransitionSpec, WorkflowSpec};
