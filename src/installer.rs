//! Declarative spec installer (spec.md §4.2).
//!
//! Input is a nested-map tree describing one workflow with its courses,
//! nodes, and transitions, branch courses referenced by code. Branch
//! codes are resolved only after every `CourseSpec` exists, so a branch
//! may forward-reference a course declared later in the same list.
//! Installation is transactional: any validation error aborts with no
//! partial persistence, and re-installing an existing workflow code
//! fails (`SpecError::DuplicateWorkflowCode`, raised by the repository).

use serde::{Deserialize, Serialize};

use crate::callables::CallableRegistry;
use crate::error::{SpecError, ValidationErrors, WorkflowError};
use crate::ids::{CallableName, PermissionId};
use crate::repository::WorkflowSpecRepository;
use crate::spec::{self, CourseSpec, NodeKind, NodeSpec, TransitionSpec, WorkflowSpec};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTypeInput {
    Enter,
    Exit,
    Cancel,
    Joined,
    Input,
    Step,
    Multiplexer,
    Split,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInput {
    #[serde(rename = "type")]
    pub node_type: NodeTypeInput,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub landing_handler: Option<CallableName>,
    #[serde(default)]
    pub exit_value: Option<u32>,
    #[serde(default)]
    pub execute_permission: Option<PermissionId>,
    #[serde(default)]
    pub joiner: Option<CallableName>,
    #[serde(default)]
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionInput {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub permission: Option<PermissionId>,
    #[serde(default)]
    pub condition: Option<CallableName>,
    #[serde(default)]
    pub priority: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseInput {
    /// Empty for the root course.
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub cancel_permission: Option<PermissionId>,
    pub nodes: Vec<NodeInput>,
    #[serde(default)]
    pub transitions: Vec<TransitionInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpecInput {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub document_type: String,
    #[serde(default)]
    pub create_permission: Option<PermissionId>,
    #[serde(default)]
    pub cancel_permission: Option<PermissionId>,
    pub courses: Vec<CourseInput>,
}

fn node_kind(input: &NodeInput) -> Result<NodeKind, SpecError> {
    Ok(match input.node_type {
        NodeTypeInput::Enter => NodeKind::Enter,
        NodeTypeInput::Exit => NodeKind::Exit {
            exit_value: input.exit_value.ok_or_else(|| SpecError::InvalidNodeConfiguration {
                course: String::new(),
                node: input.code.clone(),
                field: "exit_value",
                reason: "EXIT nodes require exit_value".to_string(),
            })?,
        },
        NodeTypeInput::Cancel => NodeKind::Cancel,
        NodeTypeInput::Joined => NodeKind::Joined,
        NodeTypeInput::Input => NodeKind::Input {
            execute_permission: input.execute_permission.clone(),
        },
        NodeTypeInput::Step => NodeKind::Step,
        NodeTypeInput::Multiplexer => NodeKind::Multiplexer,
        NodeTypeInput::Split => NodeKind::Split {
            joiner: input.joiner.clone(),
            branches: input.branches.clone(),
        },
    })
}

fn build_node(input: &NodeInput) -> Result<NodeSpec, SpecError> {
    let mut node = NodeSpec::new(input.code.clone(), input.name.clone(), node_kind(input)?);
    if let Some(handler) = &input.landing_handler {
        node = node.with_landing_handler(handler.clone());
    }
    Ok(node)
}

fn build_transition(input: &TransitionInput) -> TransitionSpec {
    let mut transition = TransitionSpec::new(input.origin.clone(), input.destination.clone());
    transition.name = input.name.clone();
    if let Some(action_name) = &input.action_name {
        transition = transition.with_action_name(action_name.clone());
    }
    if let Some(permission) = &input.permission {
        transition = transition.with_permission(permission.clone());
    }
    if let Some(condition) = &input.condition {
        transition = transition.with_condition(condition.clone());
    }
    if let Some(priority) = input.priority {
        transition = transition.with_priority(priority);
    }
    transition
}

fn build_course(input: &CourseInput, depth: u32) -> Result<CourseSpec, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut course = CourseSpec::new(input.code.clone(), depth);
    course.cancel_permission = input.cancel_permission.clone();

    for node_input in &input.nodes {
        match build_node(node_input) {
            Ok(node) => {
                if let Err(e) = course.add_node(node) {
                    errors.push(e);
                }
            }
            Err(e) => errors.push(e),
        }
    }
    for transition_input in &input.transitions {
        course.add_transition(build_transition(transition_input));
    }

    errors.into_result().map(|_| course).map_err(|_| errors)
}

/// Builds a `WorkflowSpec` from the declarative input, without touching
/// a repository. Branch course codes are resolved structurally (every
/// SPLIT's `branches` must reference a `CourseInput.code` present in the
/// same `courses` list, at depth + 1) as part of `WorkflowSpec::validate`;
/// depth is assigned here by a breadth-first walk from the root course so
/// that validation can compare it without re-deriving it.
pub fn build_spec(input: &WorkflowSpecInput) -> Result<WorkflowSpec, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut spec = WorkflowSpec::new(input.code.clone(), input.name.clone(), input.document_type.clone());
    spec.description = input.description.clone();
    spec.create_permission = input.create_permission.clone();
    spec.cancel_permission = input.cancel_permission.clone();

    let depths = assign_depths(input);

    for course_input in &input.courses {
        let depth = *depths.get(&course_input.code).unwrap_or(&0);
        match build_course(course_input, depth) {
            Ok(course) => {
                if let Err(e) = spec.add_course(course) {
                    errors.push(e);
                }
            }
            Err(course_errors) => errors.extend(course_errors),
        }
    }

    errors.into_result().map_err(|_| errors)?;

    let graph_errors = spec.validate();
    if !graph_errors.is_empty() {
        return Err(graph_errors);
    }

    Ok(spec)
}

/// Breadth-first depth assignment from the root course (code `""`),
/// following each SPLIT's `branches`. Courses unreachable from the root
/// default to depth 0 and are reported as orphaned by other validation
/// (an unknown branch code, or simply never referenced).
fn assign_depths(input: &WorkflowSpecInput) -> std::collections::HashMap<String, u32> {
    use std::collections::{HashMap, VecDeque};

    let mut depths = HashMap::new();
    depths.insert(String::new(), 0u32);
    let mut queue = VecDeque::new();
    queue.push_back(String::new());

    while let Some(code) = queue.pop_front() {
        let Some(course) = input.courses.iter().find(|c| c.code == code) else {
            continue;
        };
        let depth = depths[&code];
        for node in &course.nodes {
            if let NodeTypeInput::Split = node.node_type {
                for branch_code in &node.branches {
                    if !depths.contains_key(branch_code) {
                        depths.insert(branch_code.clone(), depth + 1);
                        queue.push_back(branch_code.clone());
                    }
                }
            }
        }
    }

    depths
}

/// Installs a workflow spec end to end: build, validate callables,
/// persist. Transactional in the sense that nothing is written to
/// `repository` unless every validation step succeeds.
pub async fn install(
    input: WorkflowSpecInput,
    registry: &CallableRegistry,
    repository: &dyn WorkflowSpecRepository,
) -> Result<WorkflowSpec, WorkflowError> {
    let spec = build_spec(&input)?;

    let callable_errors = spec::validate_callables(&spec, registry);
    if !callable_errors.is_empty() {
        return Err(WorkflowError::Validation(callable_errors));
    }

    repository.save(spec.clone()).await?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryWorkflowSpecRepository;

    fn sample_input() -> WorkflowSpecInput {
        WorkflowSpecInput {
            code: "wfspec".to_string(),
            name: "Workflow Spec".to_string(),
            description: String::new(),
            document_type: "sample.Task".to_string(),
            create_permission: None,
            cancel_permission: None,
            courses: vec![
                CourseInput {
                    code: String::new(),
                    name: "Main".to_string(),
                    cancel_permission: None,
                    nodes: vec![
                        NodeInput {
                            node_type: NodeTypeInput::Enter,
                            code: "origin".to_string(),
                            name: "Origin".to_string(),
                            landing_handler: None,
                            exit_value: None,
                            execute_permission: None,
                            joiner: None,
                            branches: vec![],
                        },
                        NodeInput {
                            node_type: NodeTypeInput::Input,
                            code: "input".to_string(),
                            name: "Input".to_string(),
                            landing_handler: None,
                            exit_value: None,
                            execute_permission: None,
                            joiner: None,
                            branches: vec![],
                        },
                        NodeInput {
                            node_type: NodeTypeInput::Split,
                            code: "split".to_string(),
                            name: "Split".to_string(),
                            landing_handler: None,
                            exit_value: None,
                            execute_permission: None,
                            joiner: Some("dummy_joiner".to_string()),
                            branches: vec!["foo".to_string()],
                        },
                        NodeInput {
                            node_type: NodeTypeInput::Exit,
                            code: "exit".to_string(),
                            name: "Exit".to_string(),
                            landing_handler: None,
                            exit_value: Some(1),
                            execute_permission: None,
                            joiner: None,
                            branches: vec![],
                        },
                    ],
                    transitions: vec![
                        TransitionInput {
                            origin: "origin".to_string(),
                            destination: "input".to_string(),
                            name: None,
                            action_name: None,
                            permission: None,
                            condition: None,
                            priority: None,
                        },
                        TransitionInput {
                            origin: "input".to_string(),
                            destination: "split".to_string(),
                            name: None,
                            action_name: Some("do".to_string()),
                            permission: None,
                            condition: None,
                            priority: None,
                        },
                        TransitionInput {
                            origin: "split".to_string(),
                            destination: "exit".to_string(),
                            name: None,
                            action_name: Some("done".to_string()),
                            permission: None,
                            condition: None,
                            priority: None,
                        },
                    ],
                },
                CourseInput {
                    code: "foo".to_string(),
                    name: "Foo".to_string(),
                    cancel_permission: None,
                    nodes: vec![
                        NodeInput {
                            node_type: NodeTypeInput::Enter,
                            code: "origin".to_string(),
                            name: "Origin".to_string(),
                            landing_handler: None,
                            exit_value: None,
                            execute_permission: None,
                            joiner: None,
                            branches: vec![],
                        },
                        NodeInput {
                            node_type: NodeTypeInput::Cancel,
                            code: "cancel".to_string(),
                            name: "Cancel".to_string(),
                            landing_handler: None,
                            exit_value: None,
                            execute_permission: None,
                            joiner: None,
                            branches: vec![],
                        },
                        NodeInput {
                            node_type: NodeTypeInput::Joined,
                            code: "joined".to_string(),
                            name: "Joined".to_string(),
                            landing_handler: None,
                            exit_value: None,
                            execute_permission: None,
                            joiner: None,
                            branches: vec![],
                        },
                        NodeInput {
                            node_type: NodeTypeInput::Input,
                            code: "input".to_string(),
                            name: "Input".to_string(),
                            landing_handler: None,
                            exit_value: None,
                            execute_permission: None,
                            joiner: None,
                            branches: vec![],
                        },
                        NodeInput {
                            node_type: NodeTypeInput::Exit,
                            code: "exit".to_string(),
                            name: "Exit".to_string(),
                            landing_handler: None,
                            exit_value: Some(100),
                            execute_permission: None,
                            joiner: None,
                            branches: vec![],
                        },
                    ],
                    transitions: vec![
                        TransitionInput {
                            origin: "origin".to_string(),
                            destination: "input".to_string(),
                            name: None,
                            action_name: None,
                            permission: None,
                            condition: None,
                            priority: None,
                        },
                        TransitionInput {
                            origin: "input".to_string(),
                            destination: "exit".to_string(),
                            name: None,
                            action_name: Some("end".to_string()),
                            permission: None,
                            condition: None,
                            priority: None,
                        },
                    ],
                },
            ],
        }
    }

    #[test]
    fn builds_valid_spec_with_forward_referenced_branch() {
        let input = sample_input();
        let spec = build_spec(&input).expect("spec should validate");
        assert_eq!(spec.course("foo").unwrap().depth, 1);
    }

    #[tokio::test]
    async fn install_rejects_unknown_joiner_callable() {
        let input = sample_input();
        let registry = CallableRegistry::new();
        let repo = InMemoryWorkflowSpecRepository::default();
        let err = install(input, &registry, &repo).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[tokio::test]
    async fn install_succeeds_with_registered_joiner() {
        let input = sample_input();
        let mut registry = CallableRegistry::new();
        registry.register_joiner("dummy_joiner", |_: &dyn crate::document::Document, _: &std::collections::HashMap<String, Option<i64>>, _: &str| Ok(None));
        let repo = InMemoryWorkflowSpecRepository::default();
        let spec = install(input, &registry, &repo).await.unwrap();
        assert_eq!(spec.code, "wfspec");
        assert!(repo.load("wfspec").await.unwrap().is_some());
    }
}
