//! Workflow specs: the top-level, author-installed graph of courses
//! (spec.md §3). Courses are addressed by author-chosen string codes, not
//! generated ids — only runtime instances get a [`uuid::Uuid`]
//! (Design Notes item 2).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{SpecError, ValidationErrors};
use crate::ids::PermissionId;

use super::course_spec::CourseSpec;
use super::node_spec::NodeType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub code: String,
    pub name: String,
    pub description: String,
    pub document_type: String,
    pub create_permission: Option<PermissionId>,
    pub cancel_permission: Option<PermissionId>,
    courses: HashMap<String, CourseSpec>,
}

impl WorkflowSpec {
    pub fn new(code: impl Into<String>, name: impl Into<String>, document_type: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: String::new(),
            document_type: document_type.into(),
            create_permission: None,
            cancel_permission: None,
            courses: HashMap::new(),
        }
    }

    pub fn add_course(&mut self, course: CourseSpec) -> Result<(), SpecError> {
        if self.courses.contains_key(&course.code) {
            return Err(SpecError::DuplicateCourseCode { code: course.code });
        }
        self.courses.insert(course.code.clone(), course);
        Ok(())
    }

    pub fn course(&self, code: &str) -> Option<&CourseSpec> {
        self.courses.get(code)
    }

    pub fn course_mut(&mut self, code: &str) -> Option<&mut CourseSpec> {
        self.courses.get_mut(code)
    }

    pub fn courses(&self) -> impl Iterator<Item = &CourseSpec> {
        self.courses.values()
    }

    pub fn root_course(&self) -> Option<&CourseSpec> {
        self.courses.get("")
    }

    /// Validates every course in isolation, then the cross-course rules
    /// that need sibling lookups: exactly one root course, branch depth
    /// and branch code resolution for every SPLIT node, and the
    /// no-joiner SPLIT rules (spec.md §4.1, §4.4).
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();

        let roots: Vec<_> = self.courses.values().filter(|c| c.is_root()).collect();
        match roots.len() {
            0 => errors.push(SpecError::MissingRootCourse),
            1 => {
                if roots[0].depth != 0 {
                    errors.push(SpecError::MissingRootCourse);
                }
            }
            _ => errors.push(SpecError::MultipleRootCourses),
        }

        for course in self.courses.values() {
            errors.extend(course.validate());
        }

        self.validate_splits(&mut errors);

        errors
    }

    fn validate_splits(&self, errors: &mut ValidationErrors) {
        for course in self.courses.values() {
            for node in course.nodes() {
                if node.node_type() != NodeType::Split {
                    continue;
                }

                if node.branches().is_empty() {
                    errors.push(SpecError::EmptySplitBranches { node: node.code.clone() });
                }

                for branch_code in node.branches() {
                    match self.courses.get(branch_code) {
                        None => errors.push(SpecError::UnknownBranchCode {
                            split_node: node.code.clone(),
                            code: branch_code.clone(),
                        }),
                        Some(branch) => {
                            if branch.depth != course.depth + 1 {
                                errors.push(SpecError::BranchDepthMismatch {
                                    split_node: node.code.clone(),
                                    branch_course: branch_code.clone(),
                                    expected: course.depth + 1,
                                    found: branch.depth,
                                });
                            }
                        }
                    }
                }

                if node.joiner().is_none() {
                    let outbound_count = course.outbounds_from(&node.code).count();
                    if outbound_count != 1 {
                        errors.push(SpecError::SplitWithoutJoinerMustHaveSingleOutbound {
                            node: node.code.clone(),
                        });
                    }
                    for branch_code in node.branches() {
                        if let Some(branch) = self.courses.get(branch_code) {
                            if branch.nodes().any(|n| n.node_type() == NodeType::Joined) {
                                errors.push(SpecError::SplitWithoutJoinerBranchHasJoined {
                                    node: node.code.clone(),
                                    branch: branch_code.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }
    }
}
