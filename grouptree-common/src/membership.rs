//! User to usergroup membership mappings

use crate::db::models::Membership;
use crate::tree::store::load_group;
use crate::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

/// Map a user into a group; mapping twice is a no-op
pub async fn add_member(pool: &SqlitePool, user_id: i64, group_id: i64) -> Result<Membership> {
    if load_group(pool, group_id).await?.is_none() {
        return Err(Error::GroupNotFound(group_id));
    }

    sqlx::query("INSERT OR IGNORE INTO user_usergroup_map (user_id, group_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(group_id)
        .execute(pool)
        .await?;

    Ok(Membership { user_id, group_id })
}

/// Returns false when the mapping did not exist
pub async fn remove_member(pool: &SqlitePool, user_id: i64, group_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM user_usergroup_map WHERE user_id = ? AND group_id = ?")
        .bind(user_id)
        .bind(group_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn groups_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT group_id FROM user_usergroup_map WHERE user_id = ? ORDER BY group_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

pub async fn members_of(pool: &SqlitePool, group_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT user_id FROM user_usergroup_map WHERE group_id = ? ORDER BY user_id",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Drop every mapping into any of `group_ids`
pub(crate) async fn remove_group_mappings_in(
    conn: &mut SqliteConnection,
    group_ids: &[i64],
) -> Result<u64> {
    if group_ids.is_empty() {
        return Ok(0);
    }

    let mut query =
        QueryBuilder::<Sqlite>::new("DELETE FROM user_usergroup_map WHERE group_id IN (");
    let mut separated = query.separated(", ");
    for id in group_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let removed = query.build().execute(&mut *conn).await?.rows_affected();
    debug!("Removed {} membership mappings", removed);
    Ok(removed)
}
