//! Transition specs: directed edges between two nodes of the same course.

use serde::{Deserialize, Serialize};

use crate::ids::{CallableName, PermissionId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub origin: String,
    pub destination: String,
    pub name: Option<String>,
    pub action_name: Option<String>,
    pub permission: Option<PermissionId>,
    pub condition: Option<CallableName>,
    pub priority: Option<u32>,
}

impl TransitionSpec {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            name: None,
            action_name: None,
            permission: None,
            condition: None,
            priority: None,
        }
    }

    pub fn with_action_name(mut self, action_name: impl Into<String>) -> Self {
        self.action_name = Some(action_name.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<PermissionId>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<CallableName>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }
}
