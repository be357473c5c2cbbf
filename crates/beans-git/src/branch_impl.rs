//! Branch lifecycle: create (without checkout), checkout, delete, list, exists.

use std::collections::HashSet;
use std::fs;

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::GitOid;

fn branch_ref(name: &str) -> String {
    format!("refs/heads/{name}")
}

fn gix_from_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::Sha1(*oid.as_bytes())
}

pub fn branch_create(repo: &GixRepo, name: &str, from: GitOid) -> Result<(), GitError> {
    if branch_exists(repo, name)? {
        return Err(GitError::BranchExists {
            name: name.to_string(),
        });
    }
    repo.repo
        .reference(
            branch_ref(name),
            gix_from_oid(from),
            gix::refs::transaction::PreviousValue::MustNotExist,
            format!("branch: created {name}"),
        )
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    Ok(())
}

pub fn branch_exists(repo: &GixRepo, name: &str) -> Result<bool, GitError> {
    Ok(repo.repo.find_reference(branch_ref(name)).is_ok())
}

pub fn branch_delete(repo: &GixRepo, name: &str) -> Result<(), GitError> {
    match repo.repo.find_reference(branch_ref(name)) {
        Ok(mut reference) => reference
            .delete()
            .map_err(|e| GitError::BackendError { message: e.to_string() }),
        Err(_) => Ok(()),
    }
}

pub fn list_branches(repo: &GixRepo) -> Result<Vec<String>, GitError> {
    let platform = repo
        .repo
        .references()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let local = platform
        .local_branches()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let mut names = Vec::new();
    for reference in local {
        let reference = reference.map_err(|e| GitError::BackendError { message: e.to_string() })?;
        names.push(reference.name().shorten().to_string());
    }
    Ok(names)
}

/// Switch HEAD to `name` and update the working tree to match its tip.
///
/// Mirrors the shape of a real `git switch`: resolve the branch tip's tree,
/// rebuild the index from it, check the files out, then remove any file that
/// is tracked in the old tree but absent from the new one.
pub fn branch_checkout(repo: &GixRepo, name: &str) -> Result<(), GitError> {
    let workdir = repo.workdir()?.to_path_buf();
    let tip = repo
        .repo
        .find_reference(branch_ref(name))
        .map_err(|_| GitError::BranchNotFound {
            name: name.to_string(),
        })?
        .into_fully_peeled_id()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?
        .detach();

    let commit = repo
        .repo
        .find_object(tip)
        .map_err(|e| GitError::BackendError { message: e.to_string() })?
        .try_into_commit()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let tree_id = commit
        .tree_id()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;

    let mut index = repo
        .repo
        .index_from_tree(&tree_id)
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;

    let tracked_paths: HashSet<String> = index
        .entries()
        .iter()
        .map(|entry| entry.path(&index).to_string())
        .collect();

    let opts = repo
        .repo
        .checkout_options(gix::worktree::stack::state::attributes::Source::IdMapping)
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let objects = repo.repo.objects.clone().into_arc().map_err(|e| GitError::BackendError {
        message: e.to_string(),
    })?;
    let outcome = gix::worktree::state::checkout(
        &mut index,
        &workdir,
        objects,
        &gix::progress::Discard,
        &gix::progress::Discard,
        &std::sync::atomic::AtomicBool::new(false),
        opts,
    )
    .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    if !outcome.errors.is_empty() {
        return Err(GitError::BackendError {
            message: format!("checkout of {name} reported {} errors", outcome.errors.len()),
        });
    }

    remove_stale_files(&workdir, &workdir, &tracked_paths)?;

    repo.repo
        .edit_reference(gix::refs::transaction::RefEdit {
            change: gix::refs::transaction::Change::Update {
                log: gix::refs::transaction::LogChange {
                    message: format!("checkout: moving to {name}").into(),
                    ..Default::default()
                },
                expected: gix::refs::transaction::PreviousValue::Any,
                new: gix::refs::Target::Symbolic(branch_ref(name).try_into().map_err(|_| {
                    GitError::BackendError {
                        message: "invalid branch ref name".to_string(),
                    }
                })?),
            },
            name: "HEAD".try_into().map_err(|_| GitError::BackendError {
                message: "invalid HEAD ref".to_string(),
            })?,
            deref: false,
        })
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;

    Ok(())
}

fn remove_stale_files(
    dir: &std::path::Path,
    workdir: &std::path::Path,
    tracked: &HashSet<String>,
) -> Result<(), GitError> {
    let entries = fs::read_dir(dir).map_err(GitError::IoError)?;
    for entry in entries {
        let entry = entry.map_err(GitError::IoError)?;
        let path = entry.path();
        if path.file_name().and_then(|n| n.to_str()) == Some(".git") {
            continue;
        }
        if path.is_dir() {
            remove_stale_files(&path, workdir, tracked)?;
            if fs::read_dir(&path).map_err(GitError::IoError)?.next().is_none() {
                let _ = fs::remove_dir(&path);
            }
        } else {
            let rel = path
                .strip_prefix(workdir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            if !tracked.contains(rel.as_str()) {
                let _ = fs::remove_file(&path);
            }
        }
    }
    Ok(())
}
