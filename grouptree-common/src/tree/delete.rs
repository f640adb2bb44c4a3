//! Cascading usergroup deletion
//!
//! Deleting a group removes its whole subtree, renumbers the tree, scrubs the
//! removed ids out of view level rules and drops their membership mappings.
//! The sequence runs in a single transaction.

use crate::access::scrub_view_levels_in;
use crate::membership::remove_group_mappings_in;
use crate::tree::rebuild::rebuild_in;
use crate::tree::store::load_group_in;
use crate::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

/// Delete a usergroup and all of its descendants
///
/// Returns the deleted ids in tree order. Fails without writing anything when
/// the group is missing, is the root, or has a zero interval boundary.
pub async fn delete_group(pool: &SqlitePool, id: i64) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await?;

    let group = load_group_in(&mut tx, id).await?.ok_or(Error::GroupNotFound(id))?;

    if group.is_root() {
        return Err(Error::RootGroup);
    }

    if group.lft == 0 || group.rgt == 0 {
        return Err(Error::Inconsistent(format!(
            "usergroup {} has interval ({}, {})",
            id, group.lft, group.rgt
        )));
    }

    let ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM usergroups WHERE lft >= ? AND rgt <= ? ORDER BY lft")
            .bind(group.lft)
            .bind(group.rgt)
            .fetch_all(&mut *tx)
            .await?;

    if ids.is_empty() {
        return Err(Error::Inconsistent(format!(
            "no usergroups inside interval of {}",
            id
        )));
    }

    let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM usergroups WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in &ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    query.build().execute(&mut *tx).await?;

    rebuild_in(&mut tx, None, 0).await?;

    let levels = scrub_view_levels_in(&mut tx, &ids).await?;
    let mappings = remove_group_mappings_in(&mut tx, &ids).await?;

    tx.commit().await?;

    info!(
        "Deleted usergroup {} '{}' with {} descendants ({} view levels updated, {} memberships removed)",
        group.id,
        group.title,
        ids.len() - 1,
        levels,
        mappings
    );
    Ok(ids)
}
