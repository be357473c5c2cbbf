pub mod bean;
pub mod ids;

pub use bean::{Bean, BeanType, GitMetadata, Link, LinkKind, Priority, Status};
pub use ids::{build_branch_name, build_filename, parse_filename_stem, sanitize_slug, BeanId, IdError};
