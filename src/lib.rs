//! beans — a file-backed, git-coordinated issue tracker core engine.
//!
//! [`core::Core`] is the single entry point: it composes the domain layer
//! (`beans_core`: Bean Codec, Store, Link Graph) with the filesystem
//! watcher, pub/sub hub, and git coordinator defined in this crate.

pub mod cancellation;
pub mod core;
pub mod error;
pub mod git_coordinator;
pub mod pubsub;
pub mod watcher;

pub use beans_core::{
    Bean, BeanId, BeansConfig, BeanType, GitConfig, GitMetadata, GraphIssues, Link, LinkGraph,
    LinkKind, NewBean, Priority, Status, Store, Updated,
};
pub use beans_git::{GitOid, GitRepo, GixRepo};
pub use cancellation::CancellationToken;
pub use core::Core;
pub use error::Error;
pub use git_coordinator::{GitCoordinator, MergeState, SyncProposal, SyncReport};
pub use pubsub::{BeanEvent, EventBatch, Hub, Subscription};
pub use watcher::{TracingWarningSink, Watcher, WarningSink};
