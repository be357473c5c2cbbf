//! The [`GitRepo`] trait — the single abstraction boundary between beans and git.
//!
//! The Git Coordinator interacts with git exclusively through this trait. It
//! is object-safe so callers can hold `Box<dyn GitRepo>` or `&dyn GitRepo`
//! without knowing the backend. The surface is deliberately narrow: only the
//! operations the coordinator's state machine needs (branch lifecycle, ref
//! resolution, ancestry queries, path-scoped status/commit) are exposed —
//! there is no tree/index/diff/worktree plumbing here.

use crate::error::GitError;
use crate::types::{CommitInfo, GitOid, StatusEntry};

pub trait GitRepo: Send + Sync {
    // --- Branches -------------------------------------------------------

    /// Create a branch named `name` pointing at `from`, without checking it out.
    fn branch_create(&self, name: &str, from: GitOid) -> Result<(), GitError>;

    /// Switch the working tree and HEAD to an existing branch.
    fn branch_checkout(&self, name: &str) -> Result<(), GitError>;

    /// Delete a local branch. A missing branch is not an error.
    fn branch_delete(&self, name: &str) -> Result<(), GitError>;

    /// True if a local branch with this name exists.
    fn branch_exists(&self, name: &str) -> Result<bool, GitError>;

    /// Names of every local branch.
    fn list_branches(&self) -> Result<Vec<String>, GitError>;

    // --- Rev resolution ---------------------------------------------------

    /// Resolve a branch/ref/rev-spec to its commit id. `NotFound` if absent.
    fn rev_parse(&self, rev: &str) -> Result<GitOid, GitError>;

    /// Like [`GitRepo::rev_parse`] but returns `Ok(None)` instead of `NotFound`.
    fn rev_parse_opt(&self, rev: &str) -> Result<Option<GitOid>, GitError>;

    /// Resolve the configured integration branch in priority order:
    /// `refs/remotes/origin/HEAD` (followed), then local `main`, then local
    /// `master`, then the first local branch found.
    fn default_branch(&self) -> Result<String, GitError>;

    // --- Ancestry -----------------------------------------------------

    /// True if `ancestor` is an ancestor of (or equal to) `descendant`.
    fn is_ancestor(&self, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError>;

    /// Merge base of two commits, if one exists.
    fn merge_base(&self, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError>;

    /// Every commit reachable from `tip` that is not reachable from `base`,
    /// newest first. Used for the squash-merge "all branch commits reachable
    /// from base" fallback and the deleted-branch message scan.
    fn commits_between(&self, base: GitOid, tip: GitOid) -> Result<Vec<CommitInfo>, GitError>;

    /// Commit log of `rev`, newest first, capped at `limit` entries. Used to
    /// scan for a merge commit referencing a deleted branch by name.
    fn log(&self, rev: &str, limit: usize) -> Result<Vec<CommitInfo>, GitError>;

    // --- Working tree ---------------------------------------------------

    /// Status entries limited to paths under `scope` (a repo-relative
    /// directory prefix, e.g. `.beans`). Empty scope means the whole tree.
    fn status_under(&self, scope: &str) -> Result<Vec<StatusEntry>, GitError>;

    /// True if `status_under(scope)` would report any entries.
    fn is_dirty_under(&self, scope: &str) -> Result<bool, GitError> {
        Ok(!self.status_under(scope)?.is_empty())
    }

    // --- Commits ---------------------------------------------------------

    /// Stage every change under `paths` and create a commit on the current
    /// branch with `message`, authored and committed as `author_name
    /// <author_email>`. Returns the new commit's id.
    fn commit_paths(
        &self,
        paths: &[&str],
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<GitOid, GitError>;

    /// Current HEAD commit.
    fn head(&self) -> Result<GitOid, GitError>;
}
