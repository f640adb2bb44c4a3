//! Full nested-set recompute
//!
//! Every structural change is followed by a rebuild of the whole tree rather
//! than incremental interval shifting. All interval writes of one rebuild run
//! on the caller's connection, normally inside a transaction, so a failed
//! write leaves no half-numbered tree behind once the transaction is dropped.

use crate::tree::intervals::{assign_intervals, ChildIndex};
use crate::{Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

/// Rebuild the whole tree starting at the root with left boundary 0
pub async fn rebuild(pool: &SqlitePool) -> Result<i64> {
    rebuild_from(pool, None, 0).await
}

/// Rebuild the subtree rooted at `start` (the root when `None`)
///
/// Returns the next free left boundary after the subtree.
pub async fn rebuild_from(pool: &SqlitePool, start: Option<i64>, left: i64) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let next = rebuild_in(&mut tx, start, left).await?;
    tx.commit().await?;

    info!("Rebuilt usergroup tree (next left boundary {})", next);
    Ok(next)
}

pub(crate) async fn rebuild_in(
    conn: &mut SqliteConnection,
    start: Option<i64>,
    left: i64,
) -> Result<i64> {
    let rows: Vec<(i64, i64)> =
        sqlx::query_as("SELECT id, parent_id FROM usergroups ORDER BY parent_id, title")
            .fetch_all(&mut *conn)
            .await?;

    let index = ChildIndex::from_ordered(rows.iter().copied());

    let start = match start {
        Some(id) => {
            if !rows.iter().any(|(row_id, _)| *row_id == id) {
                return Err(Error::GroupNotFound(id));
            }
            id
        }
        None => match index.roots() {
            [] => return Ok(left),
            [root] => *root,
            roots => {
                return Err(Error::Inconsistent(format!(
                    "{} root usergroups found: {:?}",
                    roots.len(),
                    roots
                )))
            }
        },
    };

    let (intervals, next) = assign_intervals(&index, start, left)?;

    for interval in &intervals {
        let result = sqlx::query("UPDATE usergroups SET lft = ?, rgt = ? WHERE id = ?")
            .bind(interval.lft)
            .bind(interval.rgt)
            .bind(interval.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| Error::Rebuild {
                id: interval.id,
                reason: e.to_string(),
            })?;

        if result.rows_affected() != 1 {
            return Err(Error::Rebuild {
                id: interval.id,
                reason: "row disappeared during rebuild".to_string(),
            });
        }
    }

    debug!(
        "Assigned intervals to {} usergroups from {}",
        intervals.len(),
        start
    );
    Ok(next)
}
