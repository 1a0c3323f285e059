//! A running (or terminated) instantiation of a `CourseSpec`.
//!
//! Modeled as an owned tree rather than a relational table with parent
//! back-pointers: a `CourseInstance`'s `branches` are owned directly by
//! its current `NodeInstance` when that node is a SPLIT. This lets the
//! executor both descend via dotted course paths and bubble up
//! parent-SPLIT notifications during unwind using pure recursive
//! functions, with no need to store or look up a parent reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CourseInstanceId;
use crate::spec::NodeType;

use super::node_instance::NodeInstance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseInstance {
    pub id: CourseInstanceId,
    /// Code of the `CourseSpec` this instance runs, empty for the root.
    pub course_code: String,
    pub started_at: DateTime<Utc>,
    /// Depth at which this course was terminated by `cancelRecursive` or
    /// `joinRecursive`; `None` while running or if terminated by EXIT.
    pub term_level: Option<u32>,
    /// `None` while pending (created, not yet advanced into a node).
    pub current: Option<NodeInstance>,
    /// Branch course instances spawned by a SPLIT; empty unless `current`
    /// is a SPLIT NodeInstance.
    pub branches: Vec<CourseInstance>,
}

impl CourseInstance {
    pub fn new_pending(course_code: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: CourseInstanceId::new(),
            course_code: course_code.into(),
            started_at,
            term_level: None,
            current: None,
            branches: Vec::new(),
        }
    }

    pub fn current_node_type(&self) -> Option<NodeType> {
        self.current.as_ref().map(|n| n.node_type)
    }

    /// No current node: created but never advanced (spec.md §4.5).
    pub fn is_pending(&self) -> bool {
        self.current.is_none()
    }

    pub fn is_waiting(&self) -> bool {
        self.current_node_type() == Some(NodeType::Input)
    }

    pub fn is_splitting(&self) -> bool {
        self.current_node_type() == Some(NodeType::Split)
    }

    pub fn is_ended(&self) -> bool {
        self.current_node_type() == Some(NodeType::Exit)
    }

    pub fn is_cancelled(&self) -> bool {
        self.current_node_type() == Some(NodeType::Cancel)
    }

    pub fn is_joined(&self) -> bool {
        self.current_node_type() == Some(NodeType::Joined)
    }

    /// EXIT, CANCEL, or JOINED: no further advance is possible.
    pub fn is_terminated(&self) -> bool {
        matches!(self.current_node_type(), Some(t) if t.is_terminal())
    }

    /// Exit value of the current node, if it is EXIT.
    pub fn exit_value(&self) -> Option<i64> {
        self.current.as_ref().and_then(|n| n.exit_value)
    }
}
