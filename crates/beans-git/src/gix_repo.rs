//! The gix-backed implementation of [`GitRepo`].

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{CommitInfo, GitOid, StatusEntry};

/// A [`GitRepo`] implementation backed by [gix](https://github.com/GitoxideLabs/gitoxide).
///
/// Construct via [`GixRepo::open`] or [`GixRepo::open_at`].
pub struct GixRepo {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: Option<PathBuf>,
}

impl GixRepo {
    /// Open the git repository at or above `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo =
            gix::open(path).map_err(|e| GitError::BackendError { message: e.to_string() })?;
        let workdir = repo.workdir().map(Path::to_path_buf);
        Ok(Self { repo, workdir })
    }

    /// Open a git repository at exactly `path` (no parent discovery).
    pub fn open_at(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open_opts(path, gix::open::Options::isolated())
            .map_err(|e| GitError::BackendError { message: e.to_string() })?;
        let workdir = repo.workdir().map(Path::to_path_buf);
        Ok(Self { repo, workdir })
    }

    pub(crate) fn workdir(&self) -> Result<&Path, GitError> {
        self.workdir.as_deref().ok_or_else(|| GitError::BackendError {
            message: "repository has no working tree".to_string(),
        })
    }
}

impl GitRepo for GixRepo {
    // === Branches ===
    fn branch_create(&self, name: &str, from: GitOid) -> Result<(), GitError> {
        crate::branch_impl::branch_create(self, name, from)
    }

    fn branch_checkout(&self, name: &str) -> Result<(), GitError> {
        crate::branch_impl::branch_checkout(self, name)
    }

    fn branch_delete(&self, name: &str) -> Result<(), GitError> {
        crate::branch_impl::branch_delete(self, name)
    }

    fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        crate::branch_impl::branch_exists(self, name)
    }

    fn list_branches(&self) -> Result<Vec<String>, GitError> {
        crate::branch_impl::list_branches(self)
    }

    // === Rev resolution ===
    fn rev_parse(&self, rev: &str) -> Result<GitOid, GitError> {
        crate::refs_impl::rev_parse(self, rev)
    }

    fn rev_parse_opt(&self, rev: &str) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::rev_parse_opt(self, rev)
    }

    fn default_branch(&self) -> Result<String, GitError> {
        crate::refs_impl::default_branch(self)
    }

    // === Ancestry ===
    fn is_ancestor(&self, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError> {
        crate::refs_impl::is_ancestor(self, ancestor, descendant)
    }

    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::merge_base(self, a, b)
    }

    fn commits_between(&self, base: GitOid, tip: GitOid) -> Result<Vec<CommitInfo>, GitError> {
        crate::refs_impl::commits_between(self, base, tip)
    }

    fn log(&self, rev: &str, limit: usize) -> Result<Vec<CommitInfo>, GitError> {
        crate::refs_impl::log(self, rev, limit)
    }

    // === Working tree ===
    fn status_under(&self, scope: &str) -> Result<Vec<StatusEntry>, GitError> {
        crate::status_impl::status_under(self, scope)
    }

    // === Commits ===
    fn commit_paths(
        &self,
        paths: &[&str],
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<GitOid, GitError> {
        crate::commit_impl::commit_paths(self, paths, message, author_name, author_email)
    }

    fn head(&self) -> Result<GitOid, GitError> {
        crate::refs_impl::head(self)
    }
}
