//! gix-backed working-tree status, scoped to a path prefix.
//!
//! The Git Coordinator only ever needs to know whether the dirty tree is
//! confined to `.beans/` or spills outside it, so this module filters gix's
//! status iterator by a repo-relative prefix rather than exposing the full
//! status surface.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::{FileStatus, StatusEntry};

pub fn status_under(repo: &GixRepo, scope: &str) -> Result<Vec<StatusEntry>, GitError> {
    let status = repo
        .repo
        .status(gix::progress::Discard)
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let iter = status
        .into_iter(None)
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;

    let mut out = Vec::new();
    for item in iter {
        let item = item.map_err(|e| GitError::BackendError { message: e.to_string() })?;
        let (path, file_status) = match item {
            gix::status::Item::IndexWorktree(change) => {
                let path = change.rela_path().to_string();
                let status = match change.status() {
                    Some(gix::status::index_as_worktree::Status::Removed) => FileStatus::Deleted,
                    Some(_) | None => FileStatus::Modified,
                };
                (path, status)
            }
            gix::status::Item::TreeIndex(change) => {
                let path = change.location().to_string();
                let status = if change.entry_mode().is_no_tree() {
                    FileStatus::Added
                } else {
                    FileStatus::Modified
                };
                (path, status)
            }
        };

        if scope.is_empty() || path.starts_with(scope) {
            out.push(StatusEntry {
                path,
                status: file_status,
            });
        }
    }
    Ok(out)
}
