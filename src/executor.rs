//! The executor: the four externally-initiated operations (Start,
//! Advance, Cancel, Join) and the internal primitives they share
//! (`move`, `runTransition`, parent-SPLIT notification, `cancelRecursive`,
//! `joinRecursive`) — spec.md §4.4.
//!
//! The instance tree is owned, not relational (no parent pointers), so
//! descending to a target course and bubbling a termination notification
//! back up to every ancestor SPLIT is one generalized recursive walk,
//! [`walk_and_notify`], parameterized by the externally-initiated
//! operation's own leaf behavior (advance/cancel/join). Permission
//! checks are async (the oracle is an external collaborator); the walk
//! itself is synchronous, matching "the engine itself is synchronous per
//! request" (spec.md §5). Each public entry point therefore does exactly
//! one async permission pre-check — on an immutable peek of the instance
//! tree — before running the synchronous mutation recursion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::callables::CallableRegistry;
use crate::document::Document;
use crate::error::{SpecError, StructuralError, WorkflowError, WorkflowResult};
use crate::ids::WorkflowInstanceId;
use crate::instance::{CourseInstance, NodeInstance, WorkflowInstance};
use crate::navigation;
use crate::permission::{PermissionGate, PermissionOracle};
use crate::repository::{WorkflowInstanceRepository, WorkflowSpecRepository};
use crate::spec::course_spec::CourseSpec;
use crate::spec::node_spec::{NodeKind, NodeType};
use crate::spec::transition_spec::TransitionSpec;
use crate::spec::WorkflowSpec;

enum TerminationOutcome {
    Paused,
    Terminated,
}

fn path_segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

/// Internal primitive `move` (spec.md §4.4.1): lands `course` on
/// `target_code`, invoking its landing handler and persisting a
/// `NodeInstance` only for the persistent node types.
fn move_course(
    course_spec: &CourseSpec,
    course: &mut CourseInstance,
    target_code: &str,
    document: &dyn Document,
    user: Uuid,
    callables: &CallableRegistry,
    now: DateTime<Utc>,
) -> WorkflowResult<()> {
    let target_node = course_spec.node(target_code).ok_or_else(|| StructuralError::CourseNodeDoesNotExist {
        course: course_spec.code.clone(),
        node: target_code.to_string(),
    })?;

    if let Some(handler_name) = &target_node.landing_handler {
        let handler = callables.handler(handler_name).ok_or_else(|| SpecError::UnknownCallable {
            kind: "landing_handler",
            name: handler_name.clone(),
            reference: target_node.code.clone(),
        })?;
        handler.call(document, user)?;
    }

    if target_node.node_type().is_persistent() {
        let mut node_instance = NodeInstance::new(target_node.code.clone(), target_node.node_type(), now);
        if let Some(exit_value) = target_node.exit_value() {
            node_instance = node_instance.with_exit_value(exit_value);
        }
        course.current = Some(node_instance);
        course.branches = match &target_node.kind {
            NodeKind::Split { branches, .. } => branches
                .iter()
                .map(|branch_code| CourseInstance::new_pending(branch_code.clone(), now))
                .collect(),
            _ => Vec::new(),
        };
    } else {
        course.current = None;
    }

    debug!(course = %course_spec.code, node = %target_node.code, node_type = %target_node.node_type(), "landed on node");
    Ok(())
}

/// Internal `runTransition` (spec.md §4.4.2): lands on the transition's
/// destination, then auto-chains through STEP/MULTIPLEXER until the
/// course pauses (INPUT/SPLIT) or terminates (EXIT).
fn run_transition_course(
    course_spec: &CourseSpec,
    course: &mut CourseInstance,
    transition: &TransitionSpec,
    document: &dyn Document,
    user: Uuid,
    callables: &CallableRegistry,
    now: DateTime<Utc>,
) -> WorkflowResult<TerminationOutcome> {
    move_course(course_spec, course, &transition.destination, document, user, callables, now)?;
    let target_node = course_spec
        .node(&transition.destination)
        .expect("move_course validated this node exists");

    match target_node.node_type() {
        NodeType::Input | NodeType::Split => Ok(TerminationOutcome::Paused),
        NodeType::Exit => Ok(TerminationOutcome::Terminated),
        NodeType::Step => {
            let next = course_spec
                .outbounds_from(&target_node.code)
                .next()
                .expect("spec validation: STEP has exactly one outbound");
            run_transition_course(course_spec, course, next, document, user, callables, now)
        }
        NodeType::Multiplexer => {
            let mut candidates: Vec<&TransitionSpec> = course_spec.outbounds_from(&target_node.code).collect();
            candidates.sort_by_key(|t| t.priority.unwrap_or(u32::MAX));
            for candidate in candidates {
                let condition_name = candidate
                    .condition
                    .as_ref()
                    .expect("spec validation: MULTIPLEXER outbound requires a condition");
                let condition = callables
                    .condition(condition_name)
                    .expect("spec validation: condition was resolved at install time");
                if condition.call(document, user)? {
                    return run_transition_course(course_spec, course, candidate, document, user, callables, now);
                }
            }
            Err(StructuralError::MultiplexerNoMatch {
                node: target_node.code.clone(),
            }
            .into())
        }
        NodeType::Enter | NodeType::Cancel | NodeType::Joined => {
            unreachable!("rejected as transition destinations by spec validation")
        }
    }
}

/// Resolves the outbound transition an externally-initiated `Advance`
/// (or an internal reuse of the same resolution, e.g. a no-joiner SPLIT
/// auto-advance) should take, given the course's current state.
fn resolve_transition<'s>(
    course_spec: &'s CourseSpec,
    course: &CourseInstance,
    action_name: Option<&str>,
) -> Result<&'s TransitionSpec, StructuralError> {
    if course.is_pending() {
        if action_name.is_some() {
            return Err(StructuralError::UnexpectedActionName);
        }
        let enter = course_spec
            .enter_node()
            .expect("spec validation: course has exactly one ENTER");
        return course_spec
            .outbounds_from(&enter.code)
            .next()
            .ok_or_else(|| StructuralError::NoMatchingAction {
                action_name: String::new(),
            });
    }

    let current_code = &course
        .current
        .as_ref()
        .expect("checked above: course is not pending")
        .node_code;
    let name = action_name.ok_or_else(|| StructuralError::NoMatchingAction {
        action_name: String::new(),
    })?;
    course_spec
        .outbounds_from(current_code)
        .find(|t| t.action_name.as_deref() == Some(name))
        .ok_or_else(|| StructuralError::NoMatchingAction {
            action_name: name.to_string(),
        })
}

/// Internal `cancelRecursive(course, level)` (spec.md §4.4.4). Returns
/// whether `course` was freshly terminated by this call (as opposed to
/// already terminated, a no-op).
fn cancel_recursive(
    spec: &WorkflowSpec,
    course: &mut CourseInstance,
    level: u32,
    document: &dyn Document,
    user: Uuid,
    callables: &CallableRegistry,
    now: DateTime<Utc>,
) -> WorkflowResult<bool> {
    if course.is_terminated() {
        return Ok(false);
    }

    let course_spec = spec
        .course(&course.course_code)
        .expect("instance course must match an installed spec course");

    if course.is_splitting() {
        for branch in &mut course.branches {
            if !branch.is_terminated() {
                cancel_recursive(spec, branch, level + 1, document, user, callables, now)?;
            }
        }
    }

    let cancel_node = course_spec
        .nodes()
        .find(|n| n.node_type() == NodeType::Cancel)
        .ok_or_else(|| StructuralError::NotCancellable {
            course: course.course_code.clone(),
        })?;
    let cancel_code = cancel_node.code.clone();
    move_course(course_spec, course, &cancel_code, document, user, callables, now)?;
    course.term_level = Some(level);
    Ok(true)
}

/// Internal `joinRecursive(course, level)` (spec.md §4.4.5), symmetric to
/// `cancelRecursive` but landing on the JOINED node; non-root courses only.
fn join_recursive(
    spec: &WorkflowSpec,
    course: &mut CourseInstance,
    level: u32,
    document: &dyn Document,
    user: Uuid,
    callables: &CallableRegistry,
    now: DateTime<Utc>,
) -> WorkflowResult<bool> {
    if course.is_terminated() {
        return Ok(false);
    }

    let course_spec = spec
        .course(&course.course_code)
        .expect("instance course must match an installed spec course");

    if course.is_splitting() {
        for branch in &mut course.branches {
            if !branch.is_terminated() {
                join_recursive(spec, branch, level + 1, document, user, callables, now)?;
            }
        }
    }

    if course_spec.is_root() {
        return Err(StructuralError::NotJoinable {
            course: course.course_code.clone(),
        }
        .into());
    }
    let joined_node = course_spec
        .nodes()
        .find(|n| n.node_type() == NodeType::Joined)
        .ok_or_else(|| StructuralError::NotJoinable {
            course: course.course_code.clone(),
        })?;
    let joined_code = joined_node.code.clone();
    move_course(course_spec, course, &joined_code, document, user, callables, now)?;
    course.term_level = Some(level);
    Ok(true)
}

/// Builds the branch status map for a SPLIT's joiner and the no-joiner
/// auto-advance rule (spec.md §4.4.3).
fn branch_statuses(course: &CourseInstance) -> HashMap<String, Option<i64>> {
    course
        .branches
        .iter()
        .map(|branch| {
            let status = if !branch.is_terminated() {
                None
            } else if branch.is_ended() {
                branch.exit_value()
            } else {
                Some(-1)
            };
            (branch.course_code.clone(), status)
        })
        .collect()
}

/// Internal parent-SPLIT notification (spec.md §4.4.3), run once a
/// branch of `course`'s current SPLIT node (`last_branch_code`) has
/// freshly terminated. Returns whether `course` itself became freshly
/// terminated as a result (so the caller can bubble the notification up
/// another level).
fn notify_split(
    spec: &WorkflowSpec,
    course: &mut CourseInstance,
    last_branch_code: &str,
    document: &dyn Document,
    user: Uuid,
    callables: &CallableRegistry,
    now: DateTime<Utc>,
) -> WorkflowResult<bool> {
    let course_spec = spec
        .course(&course.course_code)
        .expect("instance course must match an installed spec course");
    let split_code = course
        .current
        .as_ref()
        .expect("a course with a freshly-terminated branch must be at a SPLIT")
        .node_code
        .clone();
    let split_node = course_spec.node(&split_code).expect("spec validation: split node exists");

    let statuses = branch_statuses(course);
    let all_terminated = course.branches.iter().all(|b| b.is_terminated());

    if let Some(joiner_name) = split_node.joiner() {
        let joiner = callables
            .joiner(joiner_name)
            .expect("spec validation: joiner was resolved at install time");
        let chosen_action = joiner.call(document, &statuses, last_branch_code)?;

        match chosen_action {
            Some(action_name) => {
                for branch in &mut course.branches {
                    if !branch.is_terminated() {
                        join_recursive(spec, branch, 0, document, user, callables, now)?;
                    }
                }
                let transition = course_spec
                    .outbounds_from(&split_code)
                    .find(|t| t.action_name.as_deref() == Some(action_name.as_str()))
                    .ok_or_else(|| StructuralError::JoinerReturnedUnknownAction {
                        node: split_code.clone(),
                        action: action_name.clone(),
                    })?;
                let outcome = run_transition_course(course_spec, course, transition, document, user, callables, now)?;
                Ok(matches!(outcome, TerminationOutcome::Terminated))
            }
            None => {
                if all_terminated {
                    Err(StructuralError::SplitUnresolved { node: split_code }.into())
                } else {
                    Ok(false)
                }
            }
        }
    } else if all_terminated {
        let transition = course_spec
            .outbounds_from(&split_code)
            .next()
            .expect("spec validation: no-joiner SPLIT has exactly one outbound");
        let outcome = run_transition_course(course_spec, course, transition, document, user, callables, now)?;
        Ok(matches!(outcome, TerminationOutcome::Terminated))
    } else {
        Ok(false)
    }
}

/// Descends `course` along `remaining_path`'s branch codes to the target
/// course, runs `leaf` there, and — on unwind — calls [`notify_split`]
/// at every ancestor whose child just terminated. Shared by Advance,
/// Cancel, and Join; the only difference between the three is `leaf`.
#[allow(clippy::too_many_arguments)]
fn walk_and_notify<F>(
    spec: &WorkflowSpec,
    course: &mut CourseInstance,
    remaining_path: &[&str],
    leaf: &mut F,
    document: &dyn Document,
    user: Uuid,
    callables: &CallableRegistry,
    now: DateTime<Utc>,
) -> WorkflowResult<bool>
where
    F: FnMut(&WorkflowSpec, &mut CourseInstance, &dyn Document, Uuid, &CallableRegistry, DateTime<Utc>) -> WorkflowResult<bool>,
{
    let Some((segment, rest)) = remaining_path.split_first() else {
        return leaf(spec, course, document, user, callables, now);
    };

    let matches: Vec<usize> = course
        .branches
        .iter()
        .enumerate()
        .filter(|(_, b)| b.course_code == *segment)
        .map(|(i, _)| i)
        .collect();
    let idx = match matches.len() {
        0 => {
            return Err(StructuralError::NoSuchElement {
                path: segment.to_string(),
            }
            .into())
        }
        1 => matches[0],
        _ => {
            return Err(StructuralError::AmbiguousElement {
                path: segment.to_string(),
            }
            .into())
        }
    };

    let child_freshly_terminated =
        walk_and_notify(spec, &mut course.branches[idx], rest, leaf, document, user, callables, now)?;

    if child_freshly_terminated {
        notify_split(spec, course, segment, document, user, callables, now)
    } else {
        Ok(false)
    }
}

/// The engine's entry point: four externally-initiated operations over
/// workflow/course instances persisted behind [`WorkflowSpecRepository`]
/// and [`WorkflowInstanceRepository`], gated by a [`PermissionOracle`].
pub struct WorkflowExecutor<'a> {
    spec_repo: &'a dyn WorkflowSpecRepository,
    instance_repo: &'a dyn WorkflowInstanceRepository,
    oracle: &'a dyn PermissionOracle,
    callables: &'a CallableRegistry,
}

impl<'a> WorkflowExecutor<'a> {
    pub fn new(
        spec_repo: &'a dyn WorkflowSpecRepository,
        instance_repo: &'a dyn WorkflowInstanceRepository,
        oracle: &'a dyn PermissionOracle,
        callables: &'a CallableRegistry,
    ) -> Self {
        Self {
            spec_repo,
            instance_repo,
            oracle,
            callables,
        }
    }

    async fn load_spec(&self, code: &str) -> WorkflowResult<WorkflowSpec> {
        self.spec_repo
            .load(code)
            .await?
            .ok_or_else(|| WorkflowError::Persistence(format!("workflow spec '{code}' not found")))
    }

    async fn load_instance(&self, id: WorkflowInstanceId) -> WorkflowResult<WorkflowInstance> {
        self.instance_repo
            .load(id)
            .await?
            .ok_or_else(|| WorkflowError::Persistence(format!("workflow instance '{id}' not found")))
    }

    /// **Start** (spec.md §4.4): validates via `CanInstantiate`, then
    /// creates the workflow instance with a pending root course.
    #[instrument(skip(self, document))]
    pub async fn start(&self, workflow_code: &str, document: &dyn Document, user: Uuid) -> WorkflowResult<WorkflowInstance> {
        let spec = self.load_spec(workflow_code).await?;
        let gate = PermissionGate::new(self.oracle);
        gate.can_instantiate(&spec, user, document).await.map_err(|e| {
            warn!(workflow = %workflow_code, "workflow instantiation denied");
            e
        })?;

        let now = Utc::now();
        let instance = WorkflowInstance::new(spec.code.clone(), spec.document_type.clone(), document.object_id(), now);
        self.instance_repo.save(&instance).await?;
        info!(instance_id = %instance.id, workflow = %workflow_code, "workflow started");
        Ok(instance)
    }

    /// **Advance** (spec.md §4.4): resolves the outbound transition for
    /// the course at `path`, checks `CanAdvance`, then runs `runTransition`
    /// and bubbles any resulting termination up through ancestor SPLITs.
    #[instrument(skip(self, document))]
    pub async fn advance(
        &self,
        instance_id: WorkflowInstanceId,
        path: &str,
        action_name: Option<&str>,
        document: &dyn Document,
        user: Uuid,
    ) -> WorkflowResult<WorkflowInstance> {
        let mut instance = self.load_instance(instance_id).await?;
        let spec = self.load_spec(&instance.workflow_code).await?;

        let course = navigation::find_course(&instance.root, path)?;
        let course_spec = spec
            .course(&course.course_code)
            .expect("instance course must match an installed spec course");
        let transition = resolve_transition(course_spec, course, action_name)?.clone();
        let node_execute_permission = course
            .current
            .as_ref()
            .filter(|n| n.node_type == NodeType::Input)
            .and_then(|n| course_spec.node(&n.node_code))
            .and_then(|n| n.execute_permission())
            .map(|s| s.to_string());

        let gate = PermissionGate::new(self.oracle);
        gate.can_advance(course, node_execute_permission.as_ref(), &transition, user, document)
            .await
            .map_err(|e| {
                warn!(instance_id = %instance_id, path = %path, "advance denied");
                e
            })?;

        let now = Utc::now();
        let action_name_owned = action_name.map(|s| s.to_string());
        let mut leaf = move |spec: &WorkflowSpec,
                              course: &mut CourseInstance,
                              document: &dyn Document,
                              user: Uuid,
                              callables: &CallableRegistry,
                              now: DateTime<Utc>|
              -> WorkflowResult<bool> {
            let course_spec = spec
                .course(&course.course_code)
                .expect("instance course must match an installed spec course");
            let transition = resolve_transition(course_spec, course, action_name_owned.as_deref())?;
            let outcome = run_transition_course(course_spec, course, transition, document, user, callables, now)?;
            Ok(matches!(outcome, TerminationOutcome::Terminated))
        };

        let segments = path_segments(path);
        walk_and_notify(&spec, &mut instance.root, &segments, &mut leaf, document, user, self.callables, now)?;

        self.instance_repo.save(&instance).await?;
        info!(instance_id = %instance_id, path = %path, "advanced");
        Ok(instance)
    }

    /// **Cancel** (spec.md §4.4): checks `CanCancel`, then
    /// `cancelRecursive` on the course at `path`.
    #[instrument(skip(self, document))]
    pub async fn cancel(
        &self,
        instance_id: WorkflowInstanceId,
        path: &str,
        document: &dyn Document,
        user: Uuid,
    ) -> WorkflowResult<WorkflowInstance> {
        let mut instance = self.load_instance(instance_id).await?;
        let spec = self.load_spec(&instance.workflow_code).await?;

        let course = navigation::find_course(&instance.root, path)?;
        let course_spec = spec
            .course(&course.course_code)
            .expect("instance course must match an installed spec course");

        let gate = PermissionGate::new(self.oracle);
        gate.can_cancel(&spec, &course_spec.cancel_permission, user, document)
            .await
            .map_err(|e| {
                warn!(instance_id = %instance_id, path = %path, "cancel denied");
                e
            })?;

        let now = Utc::now();
        let mut leaf = |spec: &WorkflowSpec,
                        course: &mut CourseInstance,
                        document: &dyn Document,
                        user: Uuid,
                        callables: &CallableRegistry,
                        now: DateTime<Utc>|
         -> WorkflowResult<bool> { cancel_recursive(spec, course, 0, document, user, callables, now) };

        let segments = path_segments(path);
        walk_and_notify(&spec, &mut instance.root, &segments, &mut leaf, document, user, self.callables, now)?;

        self.instance_repo.save(&instance).await?;
        info!(instance_id = %instance_id, path = %path, "cancelled");
        Ok(instance)
    }

    /// **Join** (spec.md §4.4): no permission gate of its own — invoked
    /// by a SPLIT's joiner callable via [`notify_split`]'s internal call,
    /// but also exposed here for hosts that need to force-join a branch
    /// directly (e.g. an operator action outside the normal flow).
    #[instrument(skip(self, document))]
    pub async fn join(
        &self,
        instance_id: WorkflowInstanceId,
        path: &str,
        document: &dyn Document,
        user: Uuid,
    ) -> WorkflowResult<WorkflowInstance> {
        let mut instance = self.load_instance(instance_id).await?;
        let spec = self.load_spec(&instance.workflow_code).await?;

        let now = Utc::now();
        let mut leaf = |spec: &WorkflowSpec,
                        course: &mut CourseInstance,
                        document: &dyn Document,
                        user: Uuid,
                        callables: &CallableRegistry,
                        now: DateTime<Utc>|
         -> WorkflowResult<bool> { join_recursive(spec, course, 0, document, user, callables, now) };

        let segments = path_segments(path);
        walk_and_notify(&spec, &mut instance.root, &segments, &mut leaf, document, user, self.callables, now)?;

        self.instance_repo.save(&instance).await?;
        info!(instance_id = %instance_id, path = %path, "joined");
        Ok(instance)
    }
}
