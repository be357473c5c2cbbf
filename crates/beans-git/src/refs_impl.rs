//! Rev resolution, ancestry, and log-scanning helpers, backed by gix.

use std::collections::HashSet;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::{CommitInfo, GitOid};

fn oid_from_gix(id: gix::ObjectId) -> Result<GitOid, GitError> {
    let bytes: [u8; 20] = id
        .as_bytes()
        .try_into()
        .map_err(|_| GitError::InvalidOid {
            value: id.to_string(),
            reason: "non-sha1 object id".to_string(),
        })?;
    Ok(GitOid::from_bytes(bytes))
}

fn gix_from_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::Sha1(*oid.as_bytes())
}

pub fn rev_parse(repo: &GixRepo, rev: &str) -> Result<GitOid, GitError> {
    rev_parse_opt(repo, rev)?.ok_or_else(|| GitError::NotFound {
        message: format!("rev-spec {rev} does not resolve to an object"),
    })
}

pub fn rev_parse_opt(repo: &GixRepo, rev: &str) -> Result<Option<GitOid>, GitError> {
    match repo.repo.rev_parse_single(rev) {
        Ok(id) => Ok(Some(oid_from_gix(id.detach())?)),
        Err(_) => Ok(None),
    }
}

pub fn head(repo: &GixRepo) -> Result<GitOid, GitError> {
    let id = repo
        .repo
        .head_id()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    oid_from_gix(id.detach())
}

/// Full set of ancestor commit ids reachable from `start`, `start` itself included.
fn ancestor_set(repo: &GixRepo, start: GitOid) -> Result<HashSet<GitOid>, GitError> {
    let start_id = gix_from_oid(start);
    let mut seen = HashSet::new();
    seen.insert(start);
    let walk = repo
        .repo
        .rev_walk(std::iter::once(start_id))
        .all()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    for info in walk {
        let info = info.map_err(|e| GitError::BackendError { message: e.to_string() })?;
        seen.insert(oid_from_gix(info.id)?);
    }
    Ok(seen)
}

pub fn is_ancestor(repo: &GixRepo, ancestor: GitOid, descendant: GitOid) -> Result<bool, GitError> {
    if ancestor == descendant {
        return Ok(true);
    }
    Ok(ancestor_set(repo, descendant)?.contains(&ancestor))
}

pub fn merge_base(repo: &GixRepo, a: GitOid, b: GitOid) -> Result<Option<GitOid>, GitError> {
    let ancestors_a = ancestor_set(repo, a)?;
    if ancestors_a.contains(&b) {
        return Ok(Some(b));
    }
    let b_id = gix_from_oid(b);
    let walk_b = repo
        .repo
        .rev_walk(std::iter::once(b_id))
        .all()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    for info in walk_b {
        let info = info.map_err(|e| GitError::BackendError { message: e.to_string() })?;
        let candidate = oid_from_gix(info.id)?;
        if ancestors_a.contains(&candidate) {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn commit_info(repo: &GixRepo, oid: GitOid) -> Result<CommitInfo, GitError> {
    let commit = repo
        .repo
        .find_object(gix_from_oid(oid))
        .map_err(|e| GitError::BackendError { message: e.to_string() })?
        .try_into_commit()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let message = commit
        .message_raw()
        .map(|m| String::from_utf8_lossy(m).into_owned())
        .unwrap_or_default();
    let parents = commit
        .parent_ids()
        .map(|id| oid_from_gix(id.detach()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CommitInfo {
        oid,
        parents,
        message,
    })
}

pub fn commits_between(
    repo: &GixRepo,
    base: GitOid,
    tip: GitOid,
) -> Result<Vec<CommitInfo>, GitError> {
    let base_ancestors = ancestor_set(repo, base)?;
    let tip_id = gix_from_oid(tip);
    let walk = repo
        .repo
        .rev_walk(std::iter::once(tip_id))
        .all()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let mut out = Vec::new();
    for info in walk {
        let info = info.map_err(|e| GitError::BackendError { message: e.to_string() })?;
        let oid = oid_from_gix(info.id)?;
        if base_ancestors.contains(&oid) {
            continue;
        }
        out.push(commit_info(repo, oid)?);
    }
    Ok(out)
}

pub fn log(repo: &GixRepo, rev: &str, limit: usize) -> Result<Vec<CommitInfo>, GitError> {
    let start = rev_parse(repo, rev)?;
    let walk = repo
        .repo
        .rev_walk(std::iter::once(gix_from_oid(start)))
        .all()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let mut out = Vec::new();
    for info in walk.take(limit) {
        let info = info.map_err(|e| GitError::BackendError { message: e.to_string() })?;
        out.push(commit_info(repo, oid_from_gix(info.id)?)?);
    }
    Ok(out)
}

/// Resolve the integration branch in priority order: the symbolic
/// `refs/remotes/origin/HEAD`, then local `main`, then local `master`, then
/// the first local branch found.
pub fn default_branch(repo: &GixRepo) -> Result<String, GitError> {
    if let Ok(reference) = repo.repo.find_reference("refs/remotes/origin/HEAD") {
        if let gix::refs::TargetRef::Symbolic(name) = reference.target() {
            let full = name.as_bstr().to_string();
            if let Some(branch) = full.strip_prefix("refs/remotes/origin/") {
                return Ok(branch.to_string());
            }
        }
    }
    for candidate in ["main", "master"] {
        if repo
            .repo
            .find_reference(format!("refs/heads/{candidate}"))
            .is_ok()
        {
            return Ok(candidate.to_string());
        }
    }
    let platform = repo
        .repo
        .references()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let mut local = platform
        .local_branches()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    if let Some(Ok(first)) = local.next() {
        let name = first.name().shorten().to_string();
        return Ok(name);
    }
    Err(GitError::NotFound {
        message: "no default branch could be resolved".to_string(),
    })
}
