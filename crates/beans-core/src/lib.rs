//! Domain layer for beans: the Bean Codec, the Store, the Link Graph, and
//! configuration loading. No git or filesystem-watching concerns live here —
//! those belong to the root `beans` crate, which composes this crate with
//! `beans-git`.

pub mod codec;
pub mod config;
pub mod error;
pub mod link_graph;
pub mod model;
pub mod store;

pub use config::{BeansConfig, ConfigError, GitConfig};
pub use error::{CodecError, LinkError, StoreError};
pub use link_graph::{GraphIssues, LinkGraph};
pub use model::{
    build_branch_name, build_filename, parse_filename_stem, sanitize_slug, Bean, BeanId,
    BeanType, GitMetadata, IdError, Link, LinkKind, Priority, Status,
};
pub use store::{NewBean, ReconcileOutcome, Store, Updated};
