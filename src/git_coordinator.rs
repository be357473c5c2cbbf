//! State machine coordinating bean status transitions with git branch
//! lifecycle (§4.5). Operates purely on a [`beans_git::GitRepo`] and
//! in-memory [`Bean`] values — it never takes the Store's lock itself;
//! callers (the `Core` facade) sequence coordinator calls around their own
//! `Store::update` calls.

use std::sync::Arc;

use chrono::Utc;

use beans_core::{build_branch_name, Bean, BeanId, GitConfig, Status, Store};
use beans_git::{GitOid, GitRepo};

use crate::error::Error;

const MERGE_SCAN_LIMIT: usize = 200;

pub struct GitCoordinator {
    repo: Arc<dyn GitRepo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Active,
    Merged { commit: GitOid },
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncProposal {
    Active { id: BeanId },
    Merged { id: BeanId, commit: GitOid },
    Deleted { id: BeanId },
}

/// Outcome of [`GitCoordinator::sync`]. `applied` is empty for a dry run.
pub struct SyncReport {
    pub proposals: Vec<SyncProposal>,
    pub applied: Vec<Result<Bean, Error>>,
}

impl GitCoordinator {
    #[must_use]
    pub fn new(repo: Arc<dyn GitRepo>) -> Self {
        GitCoordinator { repo }
    }

    /// Run the §4.5 transition handling for a bean whose status just
    /// changed from `old_status`. `is_parent_bean` (has ≥1 child in the link
    /// graph) must be computed by the caller, since the coordinator never
    /// touches the Store. On success, `bean`'s git metadata is mutated
    /// in-memory; the caller is responsible for persisting it.
    pub fn on_transition(
        &self,
        config: &GitConfig,
        old_status: Status,
        bean: &mut Bean,
        is_parent_bean: bool,
    ) -> Result<(), Error> {
        if old_status == bean.status {
            return Ok(());
        }
        if !config.enabled || !config.auto_create_branch {
            return Ok(());
        }

        match bean.status {
            Status::InProgress => {
                if is_parent_bean {
                    self.create_branch_for(config, bean)?;
                }
            }
            Status::Completed if config.require_merge => {
                if let Some(branch) = bean.git.branch.clone() {
                    let base = self.resolve_base_branch(config)?;
                    if !matches!(self.is_merged(&branch, &base)?, MergeState::Merged { .. }) {
                        return Err(Error::NotMerged { branch });
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn create_branch_for(&self, config: &GitConfig, bean: &mut Bean) -> Result<(), Error> {
        let branch_name = build_branch_name(&bean.id, &bean.slug);
        if self.repo.branch_exists(&branch_name)? {
            return Err(Error::BranchExists { name: branch_name });
        }

        let status = self.repo.status_under("")?;
        let outside_beans = status.iter().filter(|e| !e.path.starts_with(".beans")).count();
        if outside_beans > 0 {
            return Err(Error::DirtyTree {
                detail: format!("{outside_beans} file(s) dirty outside .beans"),
            });
        }
        let beans_dirty = status.iter().any(|e| e.path.starts_with(".beans"));
        if beans_dirty {
            if config.auto_commit_beans {
                self.repo
                    .commit_paths(&[".beans"], "chore: update beans", "beans", "beans@localhost")?;
            } else {
                return Err(Error::DirtyTree {
                    detail: ".beans has uncommitted changes".to_string(),
                });
            }
        }

        let base_name = self.resolve_base_branch(config)?;
        let base_oid = self.repo.rev_parse(&base_name)?;
        self.repo.branch_create(&branch_name, base_oid)?;
        self.repo.branch_checkout(&branch_name)?;

        bean.git.branch = Some(branch_name);
        bean.git.created_at = Some(Utc::now());
        Ok(())
    }

    /// §4.5's default-branch resolution order, or the configured
    /// `base_branch` verified to exist.
    fn resolve_base_branch(&self, config: &GitConfig) -> Result<String, Error> {
        if !config.base_branch.is_empty() {
            if self.repo.branch_exists(&config.base_branch)? {
                return Ok(config.base_branch.clone());
            }
            return Err(Error::BaseBranchMissing);
        }
        self.repo.default_branch().map_err(|_| Error::NoDefaultBranch)
    }

    /// The three-strategy merge check (§4.5).
    pub fn is_merged(&self, branch: &str, base: &str) -> Result<MergeState, Error> {
        let base_oid = self.repo.rev_parse(base)?;

        if self.repo.branch_exists(branch)? {
            let branch_oid = self.repo.rev_parse(branch)?;
            if self.repo.is_ancestor(branch_oid, base_oid)? {
                return Ok(MergeState::Merged { commit: base_oid });
            }
            if let Some(merge_base) = self.repo.merge_base(branch_oid, base_oid)? {
                let branch_only = self.repo.commits_between(merge_base, branch_oid)?;
                let all_reachable = !branch_only.is_empty()
                    && branch_only
                        .iter()
                        .try_fold(true, |acc, c| Ok::<_, Error>(acc && self.repo.is_ancestor(c.oid, base_oid)?))?;
                if all_reachable {
                    return Ok(MergeState::Merged { commit: base_oid });
                }
            }
            return Ok(MergeState::Active);
        }

        match self.scan_for_merge_reference(base, branch)? {
            Some(commit) => Ok(MergeState::Merged { commit }),
            None => Ok(MergeState::Deleted),
        }
    }

    fn scan_for_merge_reference(&self, base: &str, branch: &str) -> Result<Option<GitOid>, Error> {
        let commits = self.repo.log(base, MERGE_SCAN_LIMIT)?;
        let needle = branch.to_lowercase();
        for commit in commits {
            if references_branch(&commit.message.to_lowercase(), &needle) {
                return Ok(Some(commit.oid));
            }
        }
        Ok(None)
    }

    /// Classify every tracked-but-unresolved bean's branch and propose a
    /// status/git-metadata change. Read-only: never writes through the
    /// Store.
    pub fn propose_sync(&self, store: &Store, config: &GitConfig) -> Result<Vec<SyncProposal>, Error> {
        let base = self.resolve_base_branch(config)?;
        let mut proposals = Vec::new();
        for bean in store.all() {
            let Some(branch) = bean.git.branch.clone() else {
                continue;
            };
            if bean.git.merged_at.is_some() {
                continue;
            }
            if matches!(bean.status, Status::Completed | Status::Scrapped) {
                continue;
            }
            let proposal = match self.is_merged(&branch, &base)? {
                MergeState::Active => SyncProposal::Active { id: bean.id },
                MergeState::Merged { commit } => SyncProposal::Merged { id: bean.id, commit },
                MergeState::Deleted => SyncProposal::Deleted { id: bean.id },
            };
            proposals.push(proposal);
        }
        Ok(proposals)
    }

    /// Propose, and if `apply` is true, write every non-`Active` proposal
    /// back through the Store. Per-bean failures are collected rather than
    /// aborting the run; the whole sync only errors if proposing itself
    /// fails (e.g. no git repository accessible).
    pub fn sync(&self, store: &Store, config: &GitConfig, apply: bool) -> Result<SyncReport, Error> {
        let proposals = self.propose_sync(store, config)?;
        if !apply {
            return Ok(SyncReport {
                proposals,
                applied: Vec::new(),
            });
        }
        let applied = proposals
            .iter()
            .filter(|p| !matches!(p, SyncProposal::Active { .. }))
            .map(|p| self.apply_one(store, p))
            .collect();
        Ok(SyncReport { proposals, applied })
    }

    fn apply_one(&self, store: &Store, proposal: &SyncProposal) -> Result<Bean, Error> {
        let (id, status, commit) = match proposal {
            SyncProposal::Merged { id, commit } => (id, Status::Completed, Some(*commit)),
            SyncProposal::Deleted { id } => (id, Status::Scrapped, None),
            SyncProposal::Active { .. } => unreachable!("Active proposals are never applied"),
        };
        let mut bean = store.get(id.as_str())?;
        bean.status = status;
        bean.git.merged_at = Some(Utc::now());
        if let Some(commit) = commit {
            bean.git.merge_commit = Some(commit.to_string());
        }
        let updated = store.update(bean)?;
        Ok(updated.new)
    }
}

/// Case-insensitive, word-boundary substring match: the caller already
/// lowercases both `message` and `needle`.
fn references_branch(message: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let bytes = message.as_bytes();
    let mut start = 0;
    while let Some(pos) = message[start..].find(needle) {
        let idx = start + pos;
        let before_ok = idx == 0 || !is_word_byte(bytes[idx - 1]);
        let end = idx + needle.len();
        let after_ok = end == bytes.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        start = idx + 1;
    }
    false
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
