//! Loading and storing usergroup rows
//!
//! `store_group` writes a row and rebuilds the tree in one transaction.
//! `save_group` runs the validator first.

use crate::db::models::{GroupDraft, GroupRow, UserGroup};
use crate::tree::rebuild::rebuild_in;
use crate::tree::validate::check_in;
use crate::{Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

const SELECT_GROUP: &str = "SELECT id, parent_id, lft, rgt, title FROM usergroups";

/// Load one usergroup by id
pub async fn load_group(pool: &SqlitePool, id: i64) -> Result<Option<UserGroup>> {
    let mut conn = pool.acquire().await?;
    load_group_in(&mut conn, id).await
}

pub(crate) async fn load_group_in(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<UserGroup>> {
    let row = sqlx::query_as::<_, GroupRow>(&format!("{SELECT_GROUP} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(UserGroup::from))
}

/// All usergroups in tree order (ascending `lft`)
pub async fn list_groups(pool: &SqlitePool) -> Result<Vec<UserGroup>> {
    let rows = sqlx::query_as::<_, GroupRow>(&format!("{SELECT_GROUP} ORDER BY lft, id"))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(UserGroup::from).collect())
}

/// The group without a parent
pub async fn root_group(pool: &SqlitePool) -> Result<UserGroup> {
    let rows = sqlx::query_as::<_, GroupRow>(&format!("{SELECT_GROUP} WHERE parent_id = 0"))
        .fetch_all(pool)
        .await?;

    let mut roots: Vec<UserGroup> = rows.into_iter().map(UserGroup::from).collect();
    match roots.len() {
        1 => Ok(roots.remove(0)),
        0 => Err(Error::Inconsistent("no root usergroup".to_string())),
        n => Err(Error::Inconsistent(format!("{} root usergroups found", n))),
    }
}

/// Insert or update a usergroup, then rebuild the tree
///
/// Does not validate; use [`save_group`] for the checked path. The stored
/// title is trimmed.
pub async fn store_group(pool: &SqlitePool, draft: &GroupDraft) -> Result<UserGroup> {
    let mut tx = pool.begin().await?;
    let id = store_in(&mut tx, draft).await?;
    rebuild_in(&mut tx, None, 0).await?;
    let group = load_group_in(&mut tx, id).await?.ok_or(Error::GroupNotFound(id))?;
    tx.commit().await?;

    Ok(group)
}

/// Validate, then store
pub async fn save_group(pool: &SqlitePool, draft: &GroupDraft) -> Result<UserGroup> {
    let mut tx = pool.begin().await?;
    check_in(&mut tx, draft).await?;
    let id = store_in(&mut tx, draft).await?;
    rebuild_in(&mut tx, None, 0).await?;
    let group = load_group_in(&mut tx, id).await?.ok_or(Error::GroupNotFound(id))?;
    tx.commit().await?;

    info!("Saved usergroup {} '{}' under {}", group.id, group.title, group.parent_id);
    Ok(group)
}

async fn store_in(conn: &mut SqliteConnection, draft: &GroupDraft) -> Result<i64> {
    let title = draft.title.trim();

    match draft.id {
        Some(id) => {
            let result = sqlx::query("UPDATE usergroups SET parent_id = ?, title = ? WHERE id = ?")
                .bind(draft.parent_id)
                .bind(title)
                .bind(id)
                .execute(&mut *conn)
                .await?;

            if result.rows_affected() == 0 {
                return Err(Error::GroupNotFound(id));
            }
            Ok(id)
        }
        None => {
            let result = sqlx::query(
                "INSERT INTO usergroups (parent_id, lft, rgt, title) VALUES (?, 0, 0, ?)",
            )
            .bind(draft.parent_id)
            .bind(title)
            .execute(&mut *conn)
            .await?;

            Ok(result.last_insert_rowid())
        }
    }
}
