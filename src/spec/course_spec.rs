//! Course specs: a subgraph of nodes and transitions within a workflow.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{SpecError, ValidationErrors};
use crate::ids::PermissionId;

use super::node_spec::{NodeSpec, NodeType};
use super::transition_spec::TransitionSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSpec {
    /// Empty string for the root course, a slug otherwise.
    pub code: String,
    pub depth: u32,
    pub cancel_permission: Option<PermissionId>,
    nodes: HashMap<String, NodeSpec>,
    transitions: Vec<TransitionSpec>,
}

impl CourseSpec {
    pub fn new(code: impl Into<String>, depth: u32) -> Self {
        Self {
            code: code.into(),
            depth,
            cancel_permission: None,
            nodes: HashMap::new(),
            transitions: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.code.is_empty()
    }

    pub fn node(&self, code: &str) -> Option<&NodeSpec> {
        self.nodes.get(code)
    }

    pub fn node_mut(&mut self, code: &str) -> Option<&mut NodeSpec> {
        self.nodes.get_mut(code)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.values()
    }

    pub fn transitions(&self) -> &[TransitionSpec] {
        &self.transitions
    }

    pub fn outbounds_from<'a>(&'a self, node_code: &'a str) -> impl Iterator<Item = &'a TransitionSpec> {
        self.transitions.iter().filter(move |t| t.origin == node_code)
    }

    /// Insert a node, rejecting a duplicate code.
    pub fn add_node(&mut self, node: NodeSpec) -> Result<(), SpecError> {
        if self.nodes.contains_key(&node.code) {
            return Err(SpecError::DuplicateNodeCode {
                course: self.code.clone(),
                code: node.code,
            });
        }
        self.nodes.insert(node.code.clone(), node);
        Ok(())
    }

    pub fn add_transition(&mut self, transition: TransitionSpec) {
        self.transitions.push(transition);
    }

    pub fn enter_node(&self) -> Option<&NodeSpec> {
        self.nodes.values().find(|n| n.node_type() == NodeType::Enter)
    }

    fn node_type_of(&self, code: &str) -> Option<NodeType> {
        self.nodes.get(code).map(|n| n.node_type())
    }

    /// Field-local and cross-entity validation for this course in
    /// isolation (spec.md §4.1). Branch-depth/unknown-branch-code checks
    /// need sibling courses and are validated one level up, by
    /// [`super::workflow_spec::WorkflowSpec::validate`].
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();

        let enters: Vec<_> = self.nodes.values().filter(|n| n.node_type() == NodeType::Enter).collect();
        if enters.is_empty() {
            errors.push(SpecError::MissingEnter {
                course: self.code.clone(),
            });
        }

        let exits: Vec<_> = self.nodes.values().filter(|n| n.node_type() == NodeType::Exit).collect();
        if exits.is_empty() {
            errors.push(SpecError::MissingExit {
                course: self.code.clone(),
            });
        }

        if !self.is_root() {
            let has_cancel = self.nodes.values().any(|n| n.node_type() == NodeType::Cancel);
            if !has_cancel {
                errors.push(SpecError::MissingCancel {
                    course: self.code.clone(),
                });
            }
        }

        self.validate_transitions(&mut errors);
        self.validate_single_outbound_nodes(&mut errors);
        self.validate_minimum_outbound_nodes(&mut errors);
        self.validate_reachability(&mut errors);
        if !self.is_root() && enters.len() == 1 {
            self.validate_pause_rule(enters[0], &mut errors);
        }

        errors
    }

    /// ENTER and STEP each auto-advance along exactly one outbound
    /// (spec.md §3, §4.4.2); unlike INPUT/SPLIT/MULTIPLEXER there is no
    /// action name or condition to disambiguate more than one.
    fn validate_single_outbound_nodes(&self, errors: &mut ValidationErrors) {
        for node in self.nodes.values() {
            if matches!(node.node_type(), NodeType::Enter | NodeType::Step) {
                let count = self.outbounds_from(&node.code).count();
                if count != 1 {
                    errors.push(SpecError::InvalidNodeConfiguration {
                        course: self.code.clone(),
                        node: node.code.clone(),
                        field: "outbound_count",
                        reason: format!("{} must have exactly one outbound transition, found {count}", node.node_type()),
                    });
                }
            }
        }
    }

    /// INPUT/SPLIT need at least one outbound (an action to take) and
    /// MULTIPLEXER needs at least two (otherwise it isn't picking between
    /// anything), per spec.md §3's inbound/outbound-count table.
    fn validate_minimum_outbound_nodes(&self, errors: &mut ValidationErrors) {
        for node in self.nodes.values() {
            let (type_name, minimum) = match node.node_type() {
                NodeType::Input => ("INPUT", 1),
                NodeType::Split => ("SPLIT", 1),
                NodeType::Multiplexer => ("MULTIPLEXER", 2),
                _ => continue,
            };
            let count = self.outbounds_from(&node.code).count();
            if count < minimum {
                errors.push(SpecError::InvalidNodeConfiguration {
                    course: self.code.clone(),
                    node: node.code.clone(),
                    field: "outbound_count",
                    reason: format!("{type_name} must have at least {minimum} outbound transition(s), found {count}"),
                });
            }
        }
    }

    fn validate_transitions(&self, errors: &mut ValidationErrors) {
        let mut action_names: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut priorities: HashMap<&str, HashSet<u32>> = HashMap::new();

        for t in &self.transitions {
            let Some(origin_type) = self.node_type_of(&t.origin) else {
                errors.push(SpecError::UnknownNodeCode {
                    course: self.code.clone(),
                    code: t.origin.clone(),
                });
                continue;
            };
            match self.node_type_of(&t.destination) {
                None => errors.push(SpecError::UnknownNodeCode {
                    course: self.code.clone(),
                    code: t.destination.clone(),
                }),
                Some(NodeType::Enter | NodeType::Cancel | NodeType::Joined) => {
                    errors.push(SpecError::InvalidTransitionConfiguration {
                        course: self.code.clone(),
                        origin: t.origin.clone(),
                        field: "destination",
                        reason: format!(
                            "destination '{}' has type {:?} which cannot be a destination",
                            t.destination,
                            self.node_type_of(&t.destination)
                        ),
                    })
                }
                Some(_) => {}
            }

            match origin_type {
                NodeType::Exit | NodeType::Cancel | NodeType::Joined => {
                    errors.push(SpecError::InvalidTransitionConfiguration {
                        course: self.code.clone(),
                        origin: t.origin.clone(),
                        field: "origin",
                        reason: format!("{} nodes cannot originate a transition", origin_type),
                    });
                }
                NodeType::Enter => {
                    self.forbid(errors, t, "action_name", t.action_name.is_some());
                    self.forbid(errors, t, "condition", t.condition.is_some());
                    self.forbid(errors, t, "priority", t.priority.is_some());
                    self.forbid(errors, t, "permission", t.permission.is_some());
                }
                NodeType::Step => {
                    self.forbid(errors, t, "action_name", t.action_name.is_some());
                    self.forbid(errors, t, "condition", t.condition.is_some());
                    self.forbid(errors, t, "priority", t.priority.is_some());
                    self.forbid(errors, t, "permission", t.permission.is_some());
                }
                NodeType::Input | NodeType::Split => {
                    self.require(errors, t, "action_name", t.action_name.is_some());
                    self.forbid(errors, t, "condition", t.condition.is_some());
                    self.forbid(errors, t, "priority", t.priority.is_some());
                    if origin_type == NodeType::Split {
                        self.forbid(errors, t, "permission", t.permission.is_some());
                    }
                    if let Some(name) = &t.action_name {
                        action_names.entry(&t.origin).or_default();
                        if !action_names.get_mut(t.origin.as_str()).unwrap().insert(name.as_str()) {
                            errors.push(SpecError::DuplicateActionName {
                                course: self.code.clone(),
                                origin: t.origin.clone(),
                                action_name: name.clone(),
                            });
                        }
                    }
                }
                NodeType::Multiplexer => {
                    self.require(errors, t, "condition", t.condition.is_some());
                    self.require(errors, t, "priority", t.priority.is_some());
                    self.forbid(errors, t, "action_name", t.action_name.is_some());
                    self.forbid(errors, t, "permission", t.permission.is_some());
                    if let Some(priority) = t.priority {
                        if !priorities.entry(&t.origin).or_default().insert(priority) {
                            errors.push(SpecError::DuplicatePriority {
                                course: self.code.clone(),
                                origin: t.origin.clone(),
                                priority,
                            });
                        }
                    }
                }
            }
        }
    }

    fn forbid(&self, errors: &mut ValidationErrors, t: &TransitionSpec, field: &'static str, present: bool) {
        if present {
            errors.push(SpecError::InvalidTransitionConfiguration {
                course: self.code.clone(),
                origin: t.origin.clone(),
                field,
                reason: format!("{field} is not allowed on a transition from this origin type"),
            });
        }
    }

    fn require(&self, errors: &mut ValidationErrors, t: &TransitionSpec, field: &'static str, present: bool) {
        if !present {
            errors.push(SpecError::InvalidTransitionConfiguration {
                course: self.code.clone(),
                origin: t.origin.clone(),
                field,
                reason: format!("{field} is required on a transition from this origin type"),
            });
        }
    }

    fn validate_reachability(&self, errors: &mut ValidationErrors) {
        let Some(enter) = self.enter_node() else { return };
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(enter.code.clone());
        seen.insert(enter.code.clone());
        while let Some(code) = queue.pop_front() {
            for t in self.outbounds_from(&code) {
                if seen.insert(t.destination.clone()) {
                    queue.push_back(t.destination.clone());
                }
            }
        }
        for node in self.nodes.values() {
            // CANCEL/JOINED are never a valid transition destination (see
            // `validate_transitions`) — they're landed on directly by the
            // executor's cancelRecursive/joinRecursive, not reached via any
            // outbound edge, so they're implicitly reachable.
            if matches!(node.node_type(), NodeType::Cancel | NodeType::Joined) {
                continue;
            }
            if !seen.contains(&node.code) {
                errors.push(SpecError::UnreachableNode {
                    course: self.code.clone(),
                    node: node.code.clone(),
                });
            }
        }
    }

    /// A non-root course must pause somewhere: no automatic path from
    /// ENTER to any EXIT that bypasses every INPUT and SPLIT node
    /// (spec.md §3, CourseSpec invariants).
    fn validate_pause_rule(&self, enter: &NodeSpec, errors: &mut ValidationErrors) {
        let mut seen = HashSet::new();
        let mut stack = vec![enter.code.clone()];
        while let Some(code) = stack.pop() {
            if !seen.insert(code.clone()) {
                continue;
            }
            let Some(node) = self.nodes.get(&code) else { continue };
            match node.node_type() {
                NodeType::Exit => {
                    errors.push(SpecError::RootCourseMustPause {
                        course: self.code.clone(),
                    });
                    return;
                }
                NodeType::Input | NodeType::Split => {
                    // Pauses here; do not follow further along this branch.
                }
                _ => {
                    for t in self.outbounds_from(&code) {
                        stack.push(t.destination.clone());
                    }
                }
            }
        }
    }
}
