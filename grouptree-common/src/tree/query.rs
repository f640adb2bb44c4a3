//! Hierarchy queries answered from interval containment

use crate::db::models::{GroupRow, UserGroup};
use crate::tree::store::{list_groups, load_group};
use crate::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;

/// A group together with its depth below the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub depth: usize,
    pub group: UserGroup,
}

/// Every group inside `id`'s interval, in tree order
pub async fn descendants(pool: &SqlitePool, id: i64, include_self: bool) -> Result<Vec<UserGroup>> {
    let group = load_group(pool, id).await?.ok_or(Error::GroupNotFound(id))?;

    let sql = if include_self {
        "SELECT id, parent_id, lft, rgt, title FROM usergroups WHERE lft >= ? AND rgt <= ? ORDER BY lft"
    } else {
        "SELECT id, parent_id, lft, rgt, title FROM usergroups WHERE lft > ? AND rgt < ? ORDER BY lft"
    };

    let rows = sqlx::query_as::<_, GroupRow>(sql)
        .bind(group.lft)
        .bind(group.rgt)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(UserGroup::from).collect())
}

/// Every group whose interval encloses `id`'s, root first
pub async fn ancestors(pool: &SqlitePool, id: i64, include_self: bool) -> Result<Vec<UserGroup>> {
    let group = load_group(pool, id).await?.ok_or(Error::GroupNotFound(id))?;

    let sql = if include_self {
        "SELECT id, parent_id, lft, rgt, title FROM usergroups WHERE lft <= ? AND rgt >= ? ORDER BY lft"
    } else {
        "SELECT id, parent_id, lft, rgt, title FROM usergroups WHERE lft < ? AND rgt > ? ORDER BY lft"
    };

    let rows = sqlx::query_as::<_, GroupRow>(sql)
        .bind(group.lft)
        .bind(group.rgt)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(UserGroup::from).collect())
}

/// Direct children ordered by title
pub async fn children(pool: &SqlitePool, id: i64) -> Result<Vec<UserGroup>> {
    let rows = sqlx::query_as::<_, GroupRow>(
        "SELECT id, parent_id, lft, rgt, title FROM usergroups WHERE parent_id = ? ORDER BY title",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(UserGroup::from).collect())
}

/// All groups in tree order with their depth
pub async fn outline(pool: &SqlitePool) -> Result<Vec<OutlineEntry>> {
    Ok(outline_of(list_groups(pool).await?))
}

/// Depths from `lft`-sorted groups: a group is nested in every open interval
/// whose `rgt` lies beyond its `lft`
pub fn outline_of(groups: Vec<UserGroup>) -> Vec<OutlineEntry> {
    let mut open: Vec<i64> = Vec::new();
    groups
        .into_iter()
        .map(|group| {
            while open.last().is_some_and(|rgt| *rgt < group.lft) {
                open.pop();
            }
            let depth = open.len();
            open.push(group.rgt);
            OutlineEntry { depth, group }
        })
        .collect()
}
