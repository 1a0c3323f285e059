//! Status predicates and dotted-path resolution of sub-courses
//! (spec.md §4.5). The predicates themselves live on `CourseInstance`;
//! this module holds `findCourse`, which needs no spec, only the
//! instance tree.
//!
//! The executor's own mutable descent (`walk_and_notify` in
//! `executor.rs`) interleaves a per-level notify callback on unwind, so
//! it indexes `branches` directly rather than going through a
//! `find_course`-shaped helper; this module only serves read-only
//! lookups (e.g. `WorkflowExecutor::advance`'s permission pre-check).

use crate::error::StructuralError;
use crate::instance::CourseInstance;

/// Descends from `root` via branch course codes joined by `.`; an empty
/// path returns `root` itself.
pub fn find_course<'a>(root: &'a CourseInstance, dotted_path: &str) -> Result<&'a CourseInstance, StructuralError> {
    let mut current = root;
    if dotted_path.is_empty() {
        return Ok(current);
    }
    for segment in dotted_path.split('.') {
        let mut matches = current.branches.iter().filter(|c| c.course_code == segment);
        let Some(found) = matches.next() else {
            return Err(StructuralError::NoSuchElement {
                path: dotted_path.to_string(),
            });
        };
        if matches.next().is_some() {
            return Err(StructuralError::AmbiguousElement {
                path: dotted_path.to_string(),
            });
        }
        current = found;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn empty_path_returns_root() {
        let root = CourseInstance::new_pending("", Utc::now());
        let found = find_course(&root, "").unwrap();
        assert_eq!(found.id, root.id);
    }

    #[test]
    fn descends_one_level() {
        let mut root = CourseInstance::new_pending("", Utc::now());
        let branch = CourseInstance::new_pending("branch-a", Utc::now());
        let branch_id = branch.id;
        root.branches.push(branch);
        let found = find_course(&root, "branch-a").unwrap();
        assert_eq!(found.id, branch_id);
    }

    #[test]
    fn missing_branch_is_no_such_element() {
        let root = CourseInstance::new_pending("", Utc::now());
        let err = find_course(&root, "missing").unwrap_err();
        assert!(matches!(err, StructuralError::NoSuchElement { .. }));
    }

    #[test]
    fn duplicate_branch_code_is_ambiguous() {
        let mut root = CourseInstance::new_pending("", Utc::now());
        root.branches.push(CourseInstance::new_pending("dup", Utc::now()));
        root.branches.push(CourseInstance::new_pending("dup", Utc::now()));
        let err = find_course(&root, "dup").unwrap_err();
        assert!(matches!(err, StructuralError::AmbiguousElement { .. }));
    }
}
