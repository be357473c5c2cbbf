//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo)
//! trait methods. It uses rich enum variants so callers can match on specific
//! failure modes without parsing message strings.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("branch already exists: {name}")]
    BranchExists { name: String },

    #[error("branch not found: {name}")]
    BranchNotFound { name: String },

    #[error("working tree dirty at {path}: {message}")]
    DirtyWorktree { path: String, message: String },

    #[error("invalid object id {value}: {reason}")]
    InvalidOid { value: String, reason: String },

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("backend error: {message}")]
    BackendError { message: String },
}
