//! Nested-set interval assignment
//!
//! Pure depth-first numbering over an ordered adjacency list. Storage code
//! loads the rows, calls [`assign_intervals`] and writes the result back.

use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Computed left/right boundary for one group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub id: i64,
    pub lft: i64,
    pub rgt: i64,
}

/// Children of every group, kept in the order the rows were supplied
#[derive(Debug, Default)]
pub struct ChildIndex {
    children: HashMap<i64, Vec<i64>>,
}

impl ChildIndex {
    /// Build from `(id, parent_id)` pairs already sorted by `(parent_id, title)`
    pub fn from_ordered(rows: impl IntoIterator<Item = (i64, i64)>) -> Self {
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for (id, parent_id) in rows {
            children.entry(parent_id).or_default().push(id);
        }
        Self { children }
    }

    pub fn children(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Groups with `parent_id = 0`
    pub fn roots(&self) -> &[i64] {
        self.children(0)
    }
}

/// Number the subtree rooted at `start`, beginning with `left`
///
/// Returns the intervals in pre-order and the next free left boundary
/// (`rgt + 1` of `start`). A leaf gets `rgt = lft + 1`; an inner node gets
/// `rgt = last child's rgt + 1`.
pub fn assign_intervals(index: &ChildIndex, start: i64, left: i64) -> Result<(Vec<Interval>, i64)> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    let next = visit(index, start, left, &mut out, &mut visited)?;
    Ok((out, next))
}

fn visit(
    index: &ChildIndex,
    id: i64,
    left: i64,
    out: &mut Vec<Interval>,
    visited: &mut HashSet<i64>,
) -> Result<i64> {
    if !visited.insert(id) {
        return Err(Error::Inconsistent(format!(
            "usergroup {} is its own ancestor",
            id
        )));
    }

    let slot = out.len();
    out.push(Interval { id, lft: left, rgt: 0 });

    let mut right = left + 1;
    for &child in index.children(id) {
        right = visit(index, child, right, out, visited)?;
    }

    out[slot].rgt = right;
    Ok(right + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(intervals: &[Interval], id: i64) -> (i64, i64) {
        let found = intervals.iter().find(|i| i.id == id).unwrap();
        (found.lft, found.rgt)
    }

    #[test]
    fn test_single_root() {
        let index = ChildIndex::from_ordered([(1, 0)]);
        let (intervals, next) = assign_intervals(&index, 1, 0).unwrap();

        assert_eq!(intervals, vec![Interval { id: 1, lft: 0, rgt: 1 }]);
        assert_eq!(next, 2);
    }

    #[test]
    fn test_children_follow_supplied_order() {
        // Rows as ORDER BY parent_id, title would return them:
        // 1 Public; under 1: 3 "Guest", 2 "Registered"; under 2: 4 "Author"
        let index = ChildIndex::from_ordered([(1, 0), (3, 1), (2, 1), (4, 2)]);
        let (intervals, next) = assign_intervals(&index, 1, 0).unwrap();

        assert_eq!(lookup(&intervals, 1), (0, 7));
        assert_eq!(lookup(&intervals, 3), (1, 2));
        assert_eq!(lookup(&intervals, 2), (3, 6));
        assert_eq!(lookup(&intervals, 4), (4, 5));
        assert_eq!(next, 8);

        let order: Vec<i64> = intervals.iter().map(|i| i.id).collect();
        assert_eq!(order, vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_width_matches_descendant_count() {
        let index = ChildIndex::from_ordered([(1, 0), (2, 1), (3, 1), (4, 2), (5, 4), (6, 3)]);
        let (intervals, _) = assign_intervals(&index, 1, 0).unwrap();

        let descendants = [(1, 5), (2, 2), (3, 1), (4, 1), (5, 0), (6, 0)];
        for (id, count) in descendants {
            let (lft, rgt) = lookup(&intervals, id);
            assert!(lft < rgt);
            assert_eq!(rgt - lft, 2 * count + 1, "group {}", id);
        }
    }

    #[test]
    fn test_subtree_with_offset() {
        let index = ChildIndex::from_ordered([(1, 0), (2, 1), (3, 2)]);
        let (intervals, next) = assign_intervals(&index, 2, 10).unwrap();

        assert_eq!(intervals.len(), 2);
        assert_eq!(lookup(&intervals, 2), (10, 13));
        assert_eq!(lookup(&intervals, 3), (11, 12));
        assert_eq!(next, 14);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let index = ChildIndex::from_ordered([(1, 0), (2, 3), (3, 2)]);
        let result = assign_intervals(&index, 2, 0);

        assert!(matches!(result, Err(Error::Inconsistent(_))));
    }

    #[test]
    fn test_unreachable_groups_are_skipped() {
        let index = ChildIndex::from_ordered([(1, 0), (2, 1), (9, 42)]);
        let (intervals, _) = assign_intervals(&index, 1, 0).unwrap();

        assert!(intervals.iter().all(|i| i.id != 9));
    }
}
