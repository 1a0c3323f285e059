//! The permission gate: three checks against an external oracle
//! (spec.md §4.3). The oracle itself is the host's IAM/ACL system; this
//! crate only defines the trait boundary and the three call sites.

use async_trait::async_trait;
use uuid::Uuid;

use crate::document::Document;
use crate::error::PermissionError;
use crate::ids::PermissionId;
use crate::instance::CourseInstance;
use crate::spec::{NodeType, TransitionSpec, WorkflowSpec};

/// Host-supplied authority over "does `user` hold `permission` on
/// `document`". DB-backed/IAM-backed implementations are naturally
/// async; the engine never evaluates a permission itself.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn has_permission(
        &self,
        user: Uuid,
        permission: &PermissionId,
        document: &dyn Document,
    ) -> Result<bool, PermissionError>;
}

/// The three permission checks from spec.md §4.3, each consulting the
/// oracle against the workflow's document.
pub struct PermissionGate<'a> {
    pub oracle: &'a dyn PermissionOracle,
}

impl<'a> PermissionGate<'a> {
    pub fn new(oracle: &'a dyn PermissionOracle) -> Self {
        Self { oracle }
    }

    async fn holds(&self, user: Uuid, permission: &PermissionId, document: &dyn Document) -> Result<bool, PermissionError> {
        self.oracle
            .has_permission(user, permission, document)
            .await
            .map_err(|e| PermissionError::OracleFailure(e.to_string()))
    }

    pub async fn can_instantiate(
        &self,
        workflow_spec: &WorkflowSpec,
        user: Uuid,
        document: &dyn Document,
    ) -> Result<(), PermissionError> {
        match &workflow_spec.create_permission {
            None => Ok(()),
            Some(permission) => {
                if self.holds(user, permission, document).await? {
                    Ok(())
                } else {
                    Err(PermissionError::WorkflowCreateDenied)
                }
            }
        }
    }

    pub async fn can_cancel(
        &self,
        workflow_spec: &WorkflowSpec,
        course_cancel_permission: &Option<PermissionId>,
        user: Uuid,
        document: &dyn Document,
    ) -> Result<(), PermissionError> {
        if let Some(permission) = &workflow_spec.cancel_permission {
            if !self.holds(user, permission, document).await? {
                return Err(PermissionError::WorkflowCourseCancelDeniedByWorkflow);
            }
        }
        if let Some(permission) = course_cancel_permission {
            if !self.holds(user, permission, document).await? {
                return Err(PermissionError::WorkflowCourseCancelDeniedByCourse);
            }
        }
        Ok(())
    }

    pub async fn can_advance(
        &self,
        course: &CourseInstance,
        node_execute_permission: Option<&PermissionId>,
        transition: &TransitionSpec,
        user: Uuid,
        document: &dyn Document,
    ) -> Result<(), PermissionError> {
        // Externally-initiated advances only ever originate from a
        // pending course (its ENTER transition) or its current INPUT
        // node. A SPLIT resolves only via its joiner, never a direct
        // user Advance call, even though `runTransition` accepts either
        // as a resolved-transition origin for the internal reuse by
        // parent-SPLIT notification (spec.md §4.3, §4.4.3).
        if !course.is_pending() && course.current_node_type() != Some(NodeType::Input) {
            return Err(PermissionError::WorkflowCourseAdvanceDeniedByWrongNodeType);
        }

        if !course.is_pending() {
            if let Some(permission) = node_execute_permission {
                if !self.holds(user, permission, document).await? {
                    return Err(PermissionError::WorkflowCourseAdvanceDeniedByNode);
                }
            }
        }

        if let Some(permission) = &transition.permission {
            if !self.holds(user, permission, document).await? {
                return Err(PermissionError::WorkflowCourseAdvanceDeniedByTransition);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentRef;
    use chrono::Utc;
    use std::collections::HashSet;
    use tokio::sync::Mutex;

    struct FakeOracle {
        granted: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl PermissionOracle for FakeOracle {
        async fn has_permission(
            &self,
            _user: Uuid,
            permission: &PermissionId,
            _document: &dyn Document,
        ) -> Result<bool, PermissionError> {
            Ok(self.granted.lock().await.contains(permission))
        }
    }

    #[tokio::test]
    async fn instantiate_denied_without_permission() {
        let oracle = FakeOracle {
            granted: Mutex::new(HashSet::new()),
        };
        let gate = PermissionGate::new(&oracle);
        let mut spec = WorkflowSpec::new("wf", "Workflow", "document");
        spec.create_permission = Some("wf.create".to_string());
        let doc = DocumentRef::new("document", Uuid::new_v4());
        let err = gate.can_instantiate(&spec, Uuid::new_v4(), &doc).await.unwrap_err();
        assert_eq!(err, PermissionError::WorkflowCreateDenied);
    }

    #[tokio::test]
    async fn advance_on_wrong_node_type_is_denied() {
        let oracle = FakeOracle {
            granted: Mutex::new(HashSet::new()),
        };
        let gate = PermissionGate::new(&oracle);
        let mut course = CourseInstance::new_pending("", Utc::now());
        course.current = Some(crate::instance::NodeInstance::new(
            "step",
            NodeType::Step,
            Utc::now(),
        ));
        let transition = TransitionSpec::new("step", "exit");
        let doc = DocumentRef::new("document", Uuid::new_v4());
        let err = gate
            .can_advance(&course, None, &transition, Uuid::new_v4(), &doc)
            .await
            .unwrap_err();
        assert_eq!(err, PermissionError::WorkflowCourseAdvanceDeniedByWrongNodeType);
    }
}
