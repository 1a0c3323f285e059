//! Node specs: one tagged variant per node type (Design Notes item 1),
//! eliminating the runtime "is this the right type" checks the Python
//! original performs via `node_spec.type in (...)` membership tests.

use serde::{Deserialize, Serialize};

use crate::ids::{CallableName, PermissionId};

/// The eight node types a course spec's graph can contain (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Enter,
    Exit,
    Cancel,
    Joined,
    Input,
    Step,
    Multiplexer,
    Split,
}

impl NodeType {
    /// Transient node types leave no stored `NodeInstance` trace
    /// (spec.md §3, NodeInstance; Design Notes item 3).
    pub fn is_persistent(self) -> bool {
        matches!(
            self,
            NodeType::Input | NodeType::Split | NodeType::Exit | NodeType::Cancel | NodeType::Joined
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, NodeType::Exit | NodeType::Cancel | NodeType::Joined)
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeType::Enter => "ENTER",
            NodeType::Exit => "EXIT",
            NodeType::Cancel => "CANCEL",
            NodeType::Joined => "JOINED",
            NodeType::Input => "INPUT",
            NodeType::Step => "STEP",
            NodeType::Multiplexer => "MULTIPLEXER",
            NodeType::Split => "SPLIT",
        };
        write!(f, "{s}")
    }
}

/// Type-specific payload for each node variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// Unique entry point of a course; exactly one outbound, no action name.
    Enter,
    /// Success terminal with a non-negative value.
    Exit { exit_value: u32 },
    /// Terminal via cancellation.
    Cancel,
    /// Terminal via parent join (non-root courses only).
    Joined,
    /// Awaits a user action; outbounds are keyed by unique action name.
    Input { execute_permission: Option<PermissionId> },
    /// Auto-advances along its single outbound.
    Step,
    /// Picks an outbound by evaluating conditions in ascending priority.
    Multiplexer,
    /// Forks into parallel branch courses.
    Split {
        joiner: Option<CallableName>,
        /// Sibling course codes this split spawns, in spawn order.
        branches: Vec<String>,
    },
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Enter => NodeType::Enter,
            NodeKind::Exit { .. } => NodeType::Exit,
            NodeKind::Cancel => NodeType::Cancel,
            NodeKind::Joined => NodeType::Joined,
            NodeKind::Input { .. } => NodeType::Input,
            NodeKind::Step => NodeType::Step,
            NodeKind::Multiplexer => NodeType::Multiplexer,
            NodeKind::Split { .. } => NodeType::Split,
        }
    }
}

/// A node within a course spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique within its course.
    pub code: String,
    pub name: String,
    pub landing_handler: Option<CallableName>,
    pub kind: NodeKind,
}

impl NodeSpec {
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            landing_handler: None,
            kind,
        }
    }

    pub fn with_landing_handler(mut self, handler: impl Into<CallableName>) -> Self {
        self.landing_handler = Some(handler.into());
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn exit_value(&self) -> Option<u32> {
        match &self.kind {
            NodeKind::Exit { exit_value } => Some(*exit_value),
            _ => None,
        }
    }

    pub fn joiner(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Split { joiner, .. } => joiner.as_deref(),
            _ => None,
        }
    }

    pub fn branches(&self) -> &[String] {
        match &self.kind {
            NodeKind::Split { branches, .. } => branches,
            _ => &[],
        }
    }

    pub fn execute_permission(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Input { execute_permission } => execute_permission.as_deref(),
            _ => None,
        }
    }

    /// Per spec.md §3's inbound/outbound-count table: does this node type
    /// allow an inbound transition?
    pub fn allows_inbound(&self) -> bool {
        !matches!(self.node_type(), NodeType::Enter)
    }
}
