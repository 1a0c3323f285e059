//! Static spec model: [`WorkflowSpec`] -> [`CourseSpec`] -> [`NodeSpec`] /
//! [`TransitionSpec`], and the validation that runs once at install time
//! rather than being re-checked on every instance operation.

pub mod course_spec;
pub mod node_spec;
pub mod transition_spec;
pub mod workflow_spec;

pub use course_spec::CourseSpec;
pub use node_spec::{NodeKind, NodeSpec, NodeType};
pub use transition_spec::TransitionSpec;
pub use workflow_spec::WorkflowSpec;

use crate::callables::CallableRegistry;
use crate::error::{SpecError, ValidationErrors};

/// Cross-checks every callable reference in a spec against a registry
/// (Design Notes item 4). Graph-shape validation is [`WorkflowSpec::validate`];
/// this pass additionally requires the registry, so it is kept separate.
pub fn validate_callables(spec: &WorkflowSpec, registry: &CallableRegistry) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    for course in spec.courses() {
        for node in course.nodes() {
            if let Some(handler) = &node.landing_handler {
                if !registry.has_handler(handler) {
                    errors.push(SpecError::UnknownCallable {
                        kind: "landing_handler",
                        name: handler.clone(),
                        reference: format!("{}.{}", course.code, node.code),
                    });
                }
            }
            if let Some(joiner) = node.joiner() {
                if !registry.has_joiner(joiner) {
                    errors.push(SpecError::UnknownCallable {
                        kind: "joiner",
                        name: joiner.to_string(),
                        reference: format!("{}.{}", course.code, node.code),
                    });
                }
            }
        }
        for transition in course.transitions() {
            if let Some(condition) = &transition.condition {
                if !registry.has_condition(condition) {
                    errors.push(SpecError::UnknownCallable {
                        kind: "condition",
                        name: condition.clone(),
                        reference: format!("{}.{}", course.code, transition.origin),
                    });
                }
            }
        }
    }

    errors
}

/// Runs full static validation: graph shape plus callable references.
pub fn validate(spec: &WorkflowSpec, registry: &CallableRegistry) -> ValidationErrors {
    let mut errors = spec.validate();
    errors.extend(validate_callables(spec, registry));
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::node_spec::NodeKind;

    fn linear_workflow() -> WorkflowSpec {
        let mut spec = WorkflowSpec::new("onboarding", "Onboarding", "document");
        let mut root = CourseSpec::new("", 0);
        root.add_node(NodeSpec::new("enter", "Enter", NodeKind::Enter)).unwrap();
        root.add_node(NodeSpec::new(
            "review",
            "Review",
            NodeKind::Input { execute_permission: None },
        ))
        .unwrap();
        root.add_node(NodeSpec::new("exit", "Done", NodeKind::Exit { exit_value: 0 }))
            .unwrap();
        root.add_transition(TransitionSpec::new("enter", "review"));
        root.add_transition(TransitionSpec::new("review", "exit").with_action_name("approve"));
        spec.add_course(root).unwrap();
        spec
    }

    #[test]
    fn linear_workflow_is_valid() {
        let spec = linear_workflow();
        let registry = CallableRegistry::new();
        assert!(validate(&spec, &registry).is_empty());
    }

    #[test]
    fn missing_root_course_is_rejected() {
        let spec = WorkflowSpec::new("empty", "Empty", "document");
        let registry = CallableRegistry::new();
        let errors = validate(&spec, &registry);
        assert!(errors.0.contains(&SpecError::MissingRootCourse));
    }

    #[test]
    fn root_course_has_no_pause_requirement() {
        // Root course has no pause requirement: ENTER -> EXIT directly is fine.
        let mut spec = WorkflowSpec::new("direct", "Direct", "document");
        let mut root = CourseSpec::new("", 0);
        root.add_node(NodeSpec::new("enter", "Enter", NodeKind::Enter)).unwrap();
        root.add_node(NodeSpec::new("exit", "Done", NodeKind::Exit { exit_value: 0 }))
            .unwrap();
        root.add_transition(TransitionSpec::new("enter", "exit"));
        spec.add_course(root).unwrap();
        let registry = CallableRegistry::new();
        assert!(validate(&spec, &registry).is_empty());
    }

    #[test]
    fn non_root_course_without_pause_point_is_rejected() {
        let mut spec = WorkflowSpec::new("with-split", "With Split", "document");

        let mut root = CourseSpec::new("", 0);
        root.add_node(NodeSpec::new("enter", "Enter", NodeKind::Enter)).unwrap();
        root.add_node(NodeSpec::new(
            "split",
            "Split",
            NodeKind::Split {
                joiner: None,
                branches: vec!["branch-a".to_string()],
            },
        ))
        .unwrap();
        root.add_node(NodeSpec::new("exit", "Done", NodeKind::Exit { exit_value: 0 }))
            .unwrap();
        root.add_transition(TransitionSpec::new("enter", "split"));
        root.add_transition(TransitionSpec::new("split", "exit").with_action_name("joined"));
        spec.add_course(root).unwrap();

        let mut branch = CourseSpec::new("branch-a", 1);
        branch.add_node(NodeSpec::new("enter", "Enter", NodeKind::Enter)).unwrap();
        branch.add_node(NodeSpec::new("cancel", "Cancel", NodeKind::Cancel)).unwrap();
        branch
            .add_node(NodeSpec::new("exit", "Done", NodeKind::Exit { exit_value: 0 }))
            .unwrap();
        branch.add_transition(TransitionSpec::new("enter", "exit"));
        spec.add_course(branch).unwrap();

        let registry = CallableRegistry::new();
        let errors = validate(&spec, &registry);
        assert!(errors
            .0
            .iter()
            .any(|e| matches!(e, SpecError::RootCourseMustPause { course } if course == "branch-a")));
    }

    #[test]
    fn unknown_callable_reference_is_rejected() {
        let mut spec = linear_workflow();
        spec.course_mut("")
            .unwrap()
            .node_mut("enter")
            .unwrap()
            .landing_handler = Some("does_not_exist".to_string());
        let registry = CallableRegistry::new();
        let errors = validate(&spec, &registry);
        assert!(errors
            .0
            .iter()
            .any(|e| matches!(e, SpecError::UnknownCallable { name, .. } if name == "does_not_exist")));
    }
}
