//! Common error types for grouptree

use thiserror::Error;

/// Common result type for grouptree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by storage, tree maintenance and configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record failed validation before save
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced usergroup does not exist
    #[error("Usergroup not found: {0}")]
    GroupNotFound(i64),

    /// The root usergroup cannot be removed
    #[error("Root usergroup cannot be deleted")]
    RootGroup,

    /// Stored left/right data contradicts the tree structure
    #[error("Left-Right data inconsistency: {0}")]
    Inconsistent(String),

    /// Writing a computed interval failed; the rebuild was aborted
    #[error("Nested set rebuild failed at group {id}: {reason}")]
    Rebuild { id: i64, reason: String },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Recoverable reasons a usergroup record is rejected by `check`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Usergroup title must not be empty")]
    EmptyTitle,

    #[error("Usergroup {0} cannot be its own parent")]
    SelfParent(i64),

    #[error("A usergroup titled '{title}' already exists under parent {parent_id}")]
    DuplicateTitle { parent_id: i64, title: String },

    /// Moving between root and non-root is not allowed
    #[error("Usergroup {0} cannot change between root and non-root")]
    KindChange(i64),

    #[error("New usergroups must have a parent")]
    MissingParent,

    #[error("Usergroup {0} does not exist")]
    UnknownGroup(i64),

    #[error("Parent usergroup {0} does not exist")]
    ParentNotFound(i64),

    #[error("Usergroup {id} cannot be moved below its own descendant {parent_id}")]
    ParentIsDescendant { id: i64, parent_id: i64 },
}
