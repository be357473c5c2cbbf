//! The unified error type for the `beans` core facade.
//!
//! Every operation callers invoke through [`crate::core::Core`] returns this
//! enum. It wraps the domain layer's `beans_core` errors and the plumbing
//! layer's `beans_git::GitError` behind one boundary, per the error codes a
//! caller (CLI, API, TUI) needs to match on.

use std::fmt;

use beans_core::{CodecError, LinkError, StoreError};
use beans_git::GitError;

#[derive(Debug)]
pub enum Error {
    NotFound {
        id: String,
    },
    DuplicateId {
        id: String,
    },
    MalformedBean {
        reason: String,
    },
    MalformedFrontMatter {
        reason: String,
    },
    CycleDetected {
        path: Vec<String>,
    },
    InvalidParentType {
        message: String,
    },
    SelfLink {
        id: String,
    },
    BranchExists {
        name: String,
    },
    DirtyTree {
        detail: String,
    },
    BaseBranchMissing,
    NotMerged {
        branch: String,
    },
    NoDefaultBranch,
    IoError(std::io::Error),
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { id } => write!(f, "bean not found: {id}"),
            Error::DuplicateId { id } => write!(f, "duplicate bean id: {id}"),
            Error::MalformedBean { reason } => write!(f, "malformed bean: {reason}"),
            Error::MalformedFrontMatter { reason } => {
                write!(f, "malformed front matter: {reason}")
            }
            Error::CycleDetected { path } => write!(f, "cycle detected: {}", path.join(" -> ")),
            Error::InvalidParentType { message } => write!(f, "{message}"),
            Error::SelfLink { id } => write!(f, "bean {id} cannot link to itself"),
            Error::BranchExists { name } => write!(f, "branch already exists: {name}"),
            Error::DirtyTree { detail } => write!(f, "working tree is dirty: {detail}"),
            Error::BaseBranchMissing => write!(f, "base branch not found"),
            Error::NotMerged { branch } => write!(f, "branch {branch} is not merged"),
            Error::NoDefaultBranch => write!(f, "could not resolve a default branch"),
            Error::IoError(e) => write!(f, "io error: {e}"),
            Error::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::MalformedFrontMatter { reason } => Error::MalformedFrontMatter { reason },
            CodecError::MalformedBean { reason } => Error::MalformedBean { reason },
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id } => Error::NotFound { id },
            StoreError::DuplicateId { id } => Error::DuplicateId { id },
            StoreError::InvalidBean(codec_err) => codec_err.into(),
            StoreError::Io(io_err) => Error::IoError(io_err),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::CycleDetected { path } => Error::CycleDetected { path },
            LinkError::InvalidParentType { message } => Error::InvalidParentType { message },
            LinkError::SelfLink { id } => Error::SelfLink { id },
        }
    }
}

impl From<GitError> for Error {
    fn from(e: GitError) -> Self {
        match e {
            GitError::BranchExists { name } => Error::BranchExists { name },
            GitError::DirtyWorktree { path, message } => Error::DirtyTree {
                detail: format!("{path}: {message}"),
            },
            GitError::IoError(io_err) => Error::IoError(io_err),
            other => Error::IoError(std::io::Error::other(other.to_string())),
        }
    }
}
