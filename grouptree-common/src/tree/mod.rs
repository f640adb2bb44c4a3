//! Nested-set usergroup tree
//!
//! Each group stores a `lft`/`rgt` interval from a depth-first walk, so
//! ancestor and descendant lookups are range comparisons. The intervals are
//! recomputed from the parent links after every structural change.

pub mod delete;
pub mod intervals;
pub mod query;
pub mod rebuild;
pub mod store;
pub mod validate;
pub mod verify;

pub use delete::delete_group;
pub use intervals::{assign_intervals, ChildIndex, Interval};
pub use query::{ancestors, children, descendants, outline, OutlineEntry};
pub use rebuild::{rebuild, rebuild_from};
pub use store::{list_groups, load_group, root_group, save_group, store_group};
pub use validate::check;
pub use verify::{verify_nodes, verify_tree, Violation};
