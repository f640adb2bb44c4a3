//! Database models

use serde::{Deserialize, Serialize};

/// Column tuple of `SELECT id, parent_id, lft, rgt, title`
pub(crate) type GroupRow = (i64, i64, i64, i64, String);

/// One row of the `usergroups` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: i64,
    pub parent_id: i64,
    pub lft: i64,
    pub rgt: i64,
    pub title: String,
}

impl UserGroup {
    /// The root is the only group without a parent
    pub fn is_root(&self) -> bool {
        self.parent_id == 0
    }

    /// Number of descendants implied by the interval width
    pub fn descendant_count(&self) -> i64 {
        (self.rgt - self.lft - 1) / 2
    }

    /// True when `other` lies strictly inside this group's interval
    pub fn contains(&self, other: &UserGroup) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }
}

impl From<GroupRow> for UserGroup {
    fn from((id, parent_id, lft, rgt, title): GroupRow) -> Self {
        Self {
            id,
            parent_id,
            lft,
            rgt,
            title,
        }
    }
}

/// A usergroup as submitted for check/store; `id` is `None` for new groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDraft {
    pub id: Option<i64>,
    pub parent_id: i64,
    pub title: String,
}

impl GroupDraft {
    /// Draft for a new group below `parent_id`
    pub fn new(parent_id: i64, title: impl Into<String>) -> Self {
        Self {
            id: None,
            parent_id,
            title: title.into(),
        }
    }

    /// Draft that updates an existing group
    pub fn existing(id: i64, parent_id: i64, title: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            parent_id,
            title: title.into(),
        }
    }
}

impl From<&UserGroup> for GroupDraft {
    fn from(group: &UserGroup) -> Self {
        Self::existing(group.id, group.parent_id, group.title.clone())
    }
}

/// One row of the `viewlevels` table; `rules` is the serialized id list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewLevel {
    pub id: i64,
    pub title: String,
    pub ordering: i64,
    pub rules: String,
}

/// One row of the `user_usergroup_map` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: i64,
    pub group_id: i64,
}
