//! Hand-rolled error enums for the domain layer. No `thiserror` here —
//! mirrors the split between the plumbing crate's rich `thiserror` enums and
//! the domain/application layers' own `Display`/`Error` impls.

use std::fmt;

#[derive(Debug)]
pub enum CodecError {
    MalformedFrontMatter { reason: String },
    MalformedBean { reason: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MalformedFrontMatter { reason } => {
                write!(f, "malformed front matter: {reason}")
            }
            CodecError::MalformedBean { reason } => write!(f, "malformed bean: {reason}"),
        }
    }
}

impl std::error::Error for CodecError {}

#[derive(Debug)]
pub enum StoreError {
    NotFound { id: String },
    DuplicateId { id: String },
    InvalidBean(CodecError),
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { id } => write!(f, "bean not found: {id}"),
            StoreError::DuplicateId { id } => write!(f, "duplicate bean id: {id}"),
            StoreError::InvalidBean(e) => write!(f, "invalid bean: {e}"),
            StoreError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::InvalidBean(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<CodecError> for StoreError {
    fn from(e: CodecError) -> Self {
        StoreError::InvalidBean(e)
    }
}

#[derive(Debug)]
pub enum LinkError {
    CycleDetected { path: Vec<String> },
    InvalidParentType { message: String },
    SelfLink { id: String },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::CycleDetected { path } => {
                write!(f, "cycle detected: {}", path.join(" -> "))
            }
            LinkError::InvalidParentType { message } => write!(f, "{message}"),
            LinkError::SelfLink { id } => write!(f, "bean {id} cannot link to itself"),
        }
    }
}

impl std::error::Error for LinkError {}
