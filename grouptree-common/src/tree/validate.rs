//! Checks run before a usergroup is saved
//!
//! Failures come back as [`Error::Validation`] so the caller can decide
//! whether to abort; nothing is written here.

use crate::db::models::GroupDraft;
use crate::tree::store::load_group_in;
use crate::{Error, Result, ValidationError};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

/// Validate a draft against the stored tree
pub async fn check(pool: &SqlitePool, draft: &GroupDraft) -> Result<()> {
    let mut conn = pool.acquire().await?;
    check_in(&mut conn, draft).await
}

pub(crate) async fn check_in(conn: &mut SqliteConnection, draft: &GroupDraft) -> Result<()> {
    let result = validate(conn, draft).await?;
    if let Err(reason) = result {
        debug!("Rejected usergroup draft {:?}: {}", draft, reason);
        return Err(Error::Validation(reason));
    }
    Ok(())
}

async fn validate(
    conn: &mut SqliteConnection,
    draft: &GroupDraft,
) -> Result<std::result::Result<(), ValidationError>> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Ok(Err(ValidationError::EmptyTitle));
    }

    if draft.id == Some(draft.parent_id) {
        return Ok(Err(ValidationError::SelfParent(draft.parent_id)));
    }

    // Backed by the unique index on (parent_id, title)
    let duplicates: i64 = sqlx::query_scalar(
        "SELECT COUNT(title) FROM usergroups WHERE title = ? AND parent_id = ? AND id <> ?",
    )
    .bind(title)
    .bind(draft.parent_id)
    .bind(draft.id.unwrap_or(0))
    .fetch_one(&mut *conn)
    .await?;

    if duplicates > 0 {
        return Ok(Err(ValidationError::DuplicateTitle {
            parent_id: draft.parent_id,
            title: title.to_string(),
        }));
    }

    let stored = match draft.id {
        Some(id) => {
            let Some(stored) = load_group_in(conn, id).await? else {
                return Ok(Err(ValidationError::UnknownGroup(id)));
            };
            if stored.is_root() != (draft.parent_id == 0) {
                return Ok(Err(ValidationError::KindChange(id)));
            }
            Some(stored)
        }
        None if draft.parent_id == 0 => return Ok(Err(ValidationError::MissingParent)),
        None => None,
    };

    if draft.parent_id != 0 {
        let Some(parent) = load_group_in(conn, draft.parent_id).await? else {
            return Ok(Err(ValidationError::ParentNotFound(draft.parent_id)));
        };

        if let Some(stored) = stored {
            if stored.lft != stored.rgt && stored.contains(&parent) {
                return Ok(Err(ValidationError::ParentIsDescendant {
                    id: stored.id,
                    parent_id: parent.id,
                }));
            }
        }
    }

    Ok(Ok(()))
}
