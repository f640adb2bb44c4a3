//! # grouptree common library
//!
//! Hierarchical usergroups kept as a nested set in SQLite:
//! - Database initialization and models
//! - Tree rebuild, validation, cascade delete and hierarchy queries
//! - View level access rules and membership mappings
//! - Configuration loading

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod membership;
pub mod tree;

pub use access::RuleSet;
pub use db::models::{GroupDraft, Membership, UserGroup, ViewLevel};
pub use error::{Error, Result, ValidationError};
