//! Runtime instance model: `WorkflowInstance` -> `CourseInstance` ->
//! (optionally) one `NodeInstance`, with SPLIT branches owned directly by
//! their parent `NodeInstance` rather than stored with a back-pointer.

pub mod course_instance;
pub mod node_instance;
pub mod workflow_instance;

pub use course_instance::CourseInstance;
pub use node_instance::NodeInstance;
pub use workflow_instance::WorkflowInstance;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn new_workflow_instance_has_pending_root() {
        let wf = WorkflowInstance::new("onboarding", "document", Uuid::new_v4(), Utc::now());
        assert!(wf.root.is_pending());
        assert!(!wf.root.is_terminated());
        assert!(!wf.is_complete());
    }

    #[test]
    fn terminal_predicates_agree_with_is_terminated() {
        use crate::instance::node_instance::NodeInstance;
        use crate::spec::NodeType;

        let mut course = CourseInstance::new_pending("", Utc::now());
        course.current = Some(NodeInstance::new("exit", NodeType::Exit, Utc::now()).with_exit_value(7));
        assert!(course.is_ended());
        assert!(course.is_terminated());
        assert!(!course.is_cancelled());
        assert_eq!(course.exit_value(), Some(7));
    }
}
