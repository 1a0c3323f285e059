//! Unified error taxonomy for the workflow engine.
//!
//! Spec/validation errors surface from authoring (`spec::*::validate`);
//! permission errors surface from the permission gate; structural errors
//! surface from the executor and navigation helpers. All three collapse
//! into [`WorkflowError`] so callers at the boundary only need to match
//! on one type, while code closer to the source can still work with the
//! narrower error.

use thiserror::Error;

/// Errors raised while authoring or installing a workflow spec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("course '{course}': node '{node}' field '{field}': {reason}")]
    InvalidNodeConfiguration {
        course: String,
        node: String,
        field: &'static str,
        reason: String,
    },

    #[error("course '{course}': transition from '{origin}' field '{field}': {reason}")]
    InvalidTransitionConfiguration {
        course: String,
        origin: String,
        field: &'static str,
        reason: String,
    },

    #[error("course '{course}': duplicate action_name '{action_name}' among outbounds of '{origin}'")]
    DuplicateActionName {
        course: String,
        origin: String,
        action_name: String,
    },

    #[error("course '{course}': duplicate priority {priority} among outbounds of '{origin}'")]
    DuplicatePriority {
        course: String,
        origin: String,
        priority: u32,
    },

    #[error("course '{course}': node '{node}' is unreachable from ENTER")]
    UnreachableNode { course: String, node: String },

    #[error("course '{course}' has no ENTER node")]
    MissingEnter { course: String },

    #[error("course '{course}' has no EXIT node")]
    MissingExit { course: String },

    #[error("non-root course '{course}' has no CANCEL node")]
    MissingCancel { course: String },

    #[error("non-root course '{course}' has an automatic ENTER-to-EXIT path that bypasses INPUT/SPLIT")]
    RootCourseMustPause { course: String },

    #[error("split node '{split_node}': branch course '{branch_course}' has depth {found}, expected {expected}")]
    BranchDepthMismatch {
        split_node: String,
        branch_course: String,
        expected: u32,
        found: u32,
    },

    #[error("split node '{split_node}': unknown branch course code '{code}'")]
    UnknownBranchCode { split_node: String, code: String },

    #[error("split node '{node}' has no branches; a SPLIT must name at least one branch course")]
    EmptySplitBranches { node: String },

    #[error("course '{course}': transition references unknown node code '{code}'")]
    UnknownNodeCode { course: String, code: String },

    #[error("duplicate course code '{code}'")]
    DuplicateCourseCode { code: String },

    #[error("course '{course}': duplicate node code '{code}'")]
    DuplicateNodeCode { course: String, code: String },

    #[error("workflow has no root course (course with empty code and depth 0)")]
    MissingRootCourse,

    #[error("workflow has more than one root course")]
    MultipleRootCourses,

    #[error("split node '{node}' has no joiner and must have exactly one outbound transition")]
    SplitWithoutJoinerMustHaveSingleOutbound { node: String },

    #[error("split node '{node}' has no joiner but branch '{branch}' has a JOINED node")]
    SplitWithoutJoinerBranchHasJoined { node: String, branch: String },

    #[error("unknown {kind} callable '{name}' referenced by '{reference}'")]
    UnknownCallable {
        kind: &'static str,
        name: String,
        reference: String,
    },

    #[error("workflow code '{code}' is already installed")]
    DuplicateWorkflowCode { code: String },
}

/// A batch of [`SpecError`]s collected during validation, one per
/// offending field where practical (spec.md §4.1).
#[derive(Debug, Clone, Default, Error, PartialEq, Eq)]
#[error("{} validation error(s): {}", .0.len(), join_errors(.0))]
pub struct ValidationErrors(pub Vec<SpecError>);

fn join_errors(errors: &[SpecError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, error: SpecError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Errors raised by the permission gate (spec.md §4.3).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("workflow create denied: missing create_permission")]
    WorkflowCreateDenied,

    #[error("course cancel denied by workflow-level cancel_permission")]
    WorkflowCourseCancelDeniedByWorkflow,

    #[error("course cancel denied by course-level cancel_permission")]
    WorkflowCourseCancelDeniedByCourse,

    #[error("course advance denied by node's execute_permission")]
    WorkflowCourseAdvanceDeniedByNode,

    #[error("course advance denied by transition's permission")]
    WorkflowCourseAdvanceDeniedByTransition,

    #[error("course advance denied: current node type does not accept externally-initiated advances")]
    WorkflowCourseAdvanceDeniedByWrongNodeType,

    #[error("permission oracle failure: {0}")]
    OracleFailure(String),
}

/// Structural runtime errors raised by the executor and navigation helpers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("course '{course}' has no node spec with code '{node}'")]
    CourseNodeDoesNotExist { course: String, node: String },

    #[error("node does not belong to this course instance's course spec")]
    InstanceDoesNotAllowForeignNodes,

    #[error("no such element at path '{path}'")]
    NoSuchElement { path: String },

    #[error("multiple children courses match code at path '{path}'")]
    AmbiguousElement { path: String },

    #[error("multiplexer node '{node}': no outbound condition matched")]
    MultiplexerNoMatch { node: String },

    #[error("course '{course}' is not cancellable: no CANCEL node")]
    NotCancellable { course: String },

    #[error("course '{course}' is not joinable: no JOINED node or course is root")]
    NotJoinable { course: String },

    #[error("split node '{node}' could not be resolved: all siblings terminated but joiner returned no action")]
    SplitUnresolved { node: String },

    #[error("split node '{node}': joiner returned unknown action '{action}'")]
    JoinerReturnedUnknownAction { node: String, action: String },

    #[error("action '{action_name}' not found on current node")]
    NoMatchingAction { action_name: String },

    #[error("action_name must not be provided when advancing a pending course")]
    UnexpectedActionName,
}

/// An error raised by a host-supplied callable (landing handler, condition,
/// or joiner). Surfaced unchanged, per spec.md §7.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("callable '{name}' failed: {reason}")]
pub struct CallableError {
    pub name: String,
    pub reason: String,
}

impl CallableError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type unifying every failure the engine can surface.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Callable(#[from] CallableError),

    /// Failure reported by the host's persistence layer. The engine
    /// never constructs this variant itself; repository implementations
    /// wrap their own errors here so callers have one type to match on.
    #[error("persistence error: {0}")]
    Persistence(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
