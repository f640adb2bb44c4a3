//! Nested-set consistency checks
//!
//! Compares the stored intervals against the parent links. An empty report
//! means the tree satisfies every nested-set invariant.

use crate::db::models::UserGroup;
use crate::tree::store::list_groups;
use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// There must be exactly one group with `parent_id = 0`
    RootCount(usize),
    SelfParent(i64),
    DanglingParent { id: i64, parent_id: i64 },
    /// `lft` is not below `rgt`
    EmptyInterval { id: i64, lft: i64, rgt: i64 },
    /// `rgt - lft` differs from `2 * descendants + 1`
    WidthMismatch { id: i64, expected: i64, actual: i64 },
    /// Two intervals cross without one containing the other
    Overlap { first: i64, second: i64 },
    /// A group's interval is not inside its parent's
    OutsideParent { id: i64, parent_id: i64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::RootCount(n) => write!(f, "expected one root usergroup, found {}", n),
            Violation::SelfParent(id) => write!(f, "usergroup {} is its own parent", id),
            Violation::DanglingParent { id, parent_id } => {
                write!(f, "usergroup {} references missing parent {}", id, parent_id)
            }
            Violation::EmptyInterval { id, lft, rgt } => {
                write!(f, "usergroup {} has lft {} >= rgt {}", id, lft, rgt)
            }
            Violation::WidthMismatch { id, expected, actual } => write!(
                f,
                "usergroup {} spans {} but its subtree needs {}",
                id, actual, expected
            ),
            Violation::Overlap { first, second } => {
                write!(f, "usergroups {} and {} have crossing intervals", first, second)
            }
            Violation::OutsideParent { id, parent_id } => {
                write!(f, "usergroup {} lies outside its parent {}", id, parent_id)
            }
        }
    }
}

/// Check the stored tree
pub async fn verify_tree(pool: &SqlitePool) -> Result<Vec<Violation>> {
    Ok(verify_nodes(&list_groups(pool).await?))
}

/// Check a set of groups
pub fn verify_nodes(groups: &[UserGroup]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let by_id: HashMap<i64, &UserGroup> = groups.iter().map(|g| (g.id, g)).collect();

    let roots = groups.iter().filter(|g| g.is_root()).count();
    if roots != 1 {
        violations.push(Violation::RootCount(roots));
    }

    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for group in groups {
        if group.parent_id == group.id {
            violations.push(Violation::SelfParent(group.id));
            continue;
        }
        if group.is_root() {
            continue;
        }
        match by_id.get(&group.parent_id) {
            None => violations.push(Violation::DanglingParent {
                id: group.id,
                parent_id: group.parent_id,
            }),
            Some(parent) => {
                children.entry(parent.id).or_default().push(group.id);
                if !parent.contains(group) {
                    violations.push(Violation::OutsideParent {
                        id: group.id,
                        parent_id: parent.id,
                    });
                }
            }
        }
    }

    for group in groups {
        if group.lft >= group.rgt {
            violations.push(Violation::EmptyInterval {
                id: group.id,
                lft: group.lft,
                rgt: group.rgt,
            });
            continue;
        }

        let expected = 2 * subtree_size(&children, group.id) + 1;
        let actual = group.rgt - group.lft;
        if expected != actual {
            violations.push(Violation::WidthMismatch {
                id: group.id,
                expected,
                actual,
            });
        }
    }

    let mut sorted: Vec<&UserGroup> = groups.iter().filter(|g| g.lft < g.rgt).collect();
    sorted.sort_by_key(|g| (g.lft, std::cmp::Reverse(g.rgt)));
    let mut open: Vec<&UserGroup> = Vec::new();
    for group in sorted {
        while open.last().is_some_and(|top| top.rgt < group.lft) {
            open.pop();
        }
        if let Some(top) = open.last() {
            if !top.contains(group) {
                violations.push(Violation::Overlap {
                    first: top.id,
                    second: group.id,
                });
            }
        }
        open.push(group);
    }

    violations
}

/// Descendant count following parent links; cycles are counted once
fn subtree_size(children: &HashMap<i64, Vec<i64>>, id: i64) -> i64 {
    let mut seen = HashSet::from([id]);
    let mut stack = vec![id];
    let mut count = 0;
    while let Some(current) = stack.pop() {
        for child in children.get(&current).into_iter().flatten() {
            if seen.insert(*child) {
                count += 1;
                stack.push(*child);
            }
        }
    }
    count
}
