//! Tests for nested-set rebuild and tree queries
//!
//! Tree used by most tests (children ordered by title):
//!
//! ```text
//! Public            0..7
//! ├── Guest         1..2
//! └── Registered    3..6
//!     └── Author    4..5
//! ```

use grouptree_common::db::init::init_database;
use grouptree_common::tree::{
    ancestors, children, descendants, list_groups, load_group, outline, rebuild, rebuild_from,
    save_group, store_group, verify_tree,
};
use grouptree_common::{Error, GroupDraft, UserGroup};
use sqlx::SqlitePool;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    pool: SqlitePool,
    registered: i64,
    guest: i64,
    author: i64,
}

async fn setup() -> Fixture {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("groups.db")).await.unwrap();

    let registered = save_group(&pool, &GroupDraft::new(1, "Registered")).await.unwrap().id;
    let guest = save_group(&pool, &GroupDraft::new(1, "Guest")).await.unwrap().id;
    let author = save_group(&pool, &GroupDraft::new(registered, "Author")).await.unwrap().id;

    Fixture {
        _dir: dir,
        pool,
        registered,
        guest,
        author,
    }
}

async fn interval(pool: &SqlitePool, id: i64) -> (i64, i64) {
    let group = load_group(pool, id).await.unwrap().unwrap();
    (group.lft, group.rgt)
}

fn assert_nested_set(groups: &[UserGroup]) {
    for group in groups {
        assert!(group.lft < group.rgt, "group {} has lft >= rgt", group.id);
        let descendants = groups.iter().filter(|other| group.contains(other)).count() as i64;
        assert_eq!(group.rgt - group.lft, 2 * descendants + 1, "group {}", group.id);
    }
}

#[tokio::test]
async fn test_intervals_after_inserts() {
    let f = setup().await;

    assert_eq!(interval(&f.pool, 1).await, (0, 7));
    assert_eq!(interval(&f.pool, f.guest).await, (1, 2));
    assert_eq!(interval(&f.pool, f.registered).await, (3, 6));
    assert_eq!(interval(&f.pool, f.author).await, (4, 5));

    assert_nested_set(&list_groups(&f.pool).await.unwrap());
    assert!(verify_tree(&f.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let f = setup().await;
    let before = list_groups(&f.pool).await.unwrap();

    let next = rebuild(&f.pool).await.unwrap();
    let first = list_groups(&f.pool).await.unwrap();
    rebuild(&f.pool).await.unwrap();
    let second = list_groups(&f.pool).await.unwrap();

    assert_eq!(next, 8);
    assert_eq!(before, first);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_rebuild_repairs_corrupted_intervals() {
    let f = setup().await;
    sqlx::query("UPDATE usergroups SET lft = 100, rgt = 3")
        .execute(&f.pool)
        .await
        .unwrap();
    assert!(!verify_tree(&f.pool).await.unwrap().is_empty());

    rebuild(&f.pool).await.unwrap();

    assert!(verify_tree(&f.pool).await.unwrap().is_empty());
    assert_eq!(interval(&f.pool, f.author).await, (4, 5));
}

#[tokio::test]
async fn test_rebuild_from_subtree_with_offset() {
    let f = setup().await;

    let next = rebuild_from(&f.pool, Some(f.registered), 20).await.unwrap();

    assert_eq!(next, 24);
    assert_eq!(interval(&f.pool, f.registered).await, (20, 23));
    assert_eq!(interval(&f.pool, f.author).await, (21, 22));
    // Outside the subtree nothing moves
    assert_eq!(interval(&f.pool, f.guest).await, (1, 2));
}

#[tokio::test]
async fn test_rebuild_from_unknown_group() {
    let f = setup().await;

    let result = rebuild_from(&f.pool, Some(999), 0).await;

    assert!(matches!(result, Err(Error::GroupNotFound(999))));
}

#[tokio::test]
async fn test_rebuild_rejects_second_root() {
    let f = setup().await;
    sqlx::query("INSERT INTO usergroups (parent_id, title) VALUES (0, 'Another root')")
        .execute(&f.pool)
        .await
        .unwrap();

    let result = rebuild(&f.pool).await;

    assert!(matches!(result, Err(Error::Inconsistent(_))));
}

#[tokio::test]
async fn test_rebuild_empty_table_is_noop() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("groups.db")).await.unwrap();
    sqlx::query("DELETE FROM usergroups").execute(&pool).await.unwrap();

    assert_eq!(rebuild_from(&pool, None, 5).await.unwrap(), 5);
}

#[tokio::test]
async fn test_move_renumbers_tree() {
    let f = setup().await;

    save_group(&f.pool, &GroupDraft::existing(f.author, f.guest, "Author"))
        .await
        .unwrap();

    assert_eq!(interval(&f.pool, f.guest).await, (1, 4));
    assert_eq!(interval(&f.pool, f.author).await, (2, 3));
    assert_eq!(interval(&f.pool, f.registered).await, (5, 6));
    assert_nested_set(&list_groups(&f.pool).await.unwrap());
}

#[tokio::test]
async fn test_store_trims_title_and_skips_checks() {
    let f = setup().await;

    let stored = store_group(&f.pool, &GroupDraft::new(f.registered, "  Editor  "))
        .await
        .unwrap();

    assert_eq!(stored.title, "Editor");
    assert_eq!(stored.parent_id, f.registered);
    // "Author" < "Editor"
    assert_eq!((stored.lft, stored.rgt), (6, 7));
}

#[tokio::test]
async fn test_store_unknown_id() {
    let f = setup().await;

    let result = store_group(&f.pool, &GroupDraft::existing(77, 1, "Ghost")).await;

    assert!(matches!(result, Err(Error::GroupNotFound(77))));
}

#[tokio::test]
async fn test_descendants_and_ancestors() {
    let f = setup().await;

    let below: Vec<i64> = descendants(&f.pool, 1, false)
        .await
        .unwrap()
        .iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(below, vec![f.guest, f.registered, f.author]);

    let with_self: Vec<i64> = descendants(&f.pool, f.registered, true)
        .await
        .unwrap()
        .iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(with_self, vec![f.registered, f.author]);

    let above: Vec<i64> = ancestors(&f.pool, f.author, false)
        .await
        .unwrap()
        .iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(above, vec![1, f.registered]);

    assert!(descendants(&f.pool, f.guest, false).await.unwrap().is_empty());
    assert!(matches!(
        ancestors(&f.pool, 404, true).await,
        Err(Error::GroupNotFound(404))
    ));
}

#[tokio::test]
async fn test_children_and_outline() {
    let f = setup().await;

    let titles: Vec<String> = children(&f.pool, 1)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.title)
        .collect();
    assert_eq!(titles, vec!["Guest", "Registered"]);

    let rows: Vec<(String, usize)> = outline(&f.pool)
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.group.title, e.depth))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Public".to_string(), 0),
            ("Guest".to_string(), 1),
            ("Registered".to_string(), 1),
            ("Author".to_string(), 2),
        ]
    );
}

/// Make every renumbering of the root fail inside SQLite
async fn lock_root_interval(pool: &SqlitePool) {
    sqlx::query(
        "CREATE TRIGGER lock_root_interval BEFORE UPDATE OF lft ON usergroups \
         WHEN NEW.id = 1 BEGIN SELECT RAISE(ABORT, 'root interval locked'); END",
    )
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_failed_rebuild_is_rolled_back() {
    let f = setup().await;
    let before = list_groups(&f.pool).await.unwrap();
    lock_root_interval(&f.pool).await;

    let result = rebuild(&f.pool).await;

    match result {
        Err(Error::Rebuild { id, reason }) => {
            assert_eq!(id, 1);
            assert!(reason.contains("root interval locked"), "unexpected reason: {}", reason);
        }
        other => panic!("expected Rebuild error, got {:?}", other),
    }
    assert_eq!(list_groups(&f.pool).await.unwrap(), before);
    assert!(verify_tree(&f.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_rolls_back_insert_when_rebuild_fails() {
    let f = setup().await;
    let before = list_groups(&f.pool).await.unwrap();
    lock_root_interval(&f.pool).await;

    let result = save_group(&f.pool, &GroupDraft::new(f.registered, "Editor")).await;

    assert!(matches!(result, Err(Error::Rebuild { id: 1, .. })), "got {:?}", result);
    assert_eq!(list_groups(&f.pool).await.unwrap(), before);

    let editors: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM usergroups WHERE title = 'Editor'")
            .fetch_one(&f.pool)
            .await
            .unwrap();
    assert_eq!(editors, 0);
}
