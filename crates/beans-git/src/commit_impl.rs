//! Scoped commit creation: stage only the given paths and commit them on the
//! current branch, leaving everything else in the working tree untouched.

use crate::error::GitError;
use crate::gix_repo::GixRepo;
use crate::types::GitOid;

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

pub fn commit_paths(
    repo: &GixRepo,
    paths: &[&str],
    message: &str,
    author_name: &str,
    author_email: &str,
) -> Result<GitOid, GitError> {
    let workdir = repo.workdir()?.to_path_buf();
    let head_id = repo
        .repo
        .head_id()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let head_commit = repo
        .repo
        .find_object(head_id)
        .map_err(|e| GitError::BackendError { message: e.to_string() })?
        .try_into_commit()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;
    let base_tree = head_commit
        .tree()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;

    let mut editor = base_tree
        .edit()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;

    for rel in paths {
        let abs = workdir.join(rel);
        let rel_bstr: gix::bstr::BString = rel.replace('\\', "/").into();
        if abs.exists() {
            let data = std::fs::read(&abs).map_err(GitError::IoError)?;
            let blob_id = repo
                .repo
                .write_blob(&data)
                .map_err(|e| GitError::BackendError { message: e.to_string() })?;
            editor
                .upsert(
                    rel_bstr,
                    gix::object::tree::EntryKind::Blob,
                    blob_id.detach(),
                )
                .map_err(|e| GitError::BackendError { message: e.to_string() })?;
        } else {
            editor
                .remove(rel_bstr)
                .map_err(|e| GitError::BackendError { message: e.to_string() })?;
        }
    }

    let new_tree_id = editor
        .write()
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;

    let signature = gix::actor::Signature {
        name: author_name.into(),
        email: author_email.into(),
        time: gix::date::Time::now_local_or_utc(),
    };

    let commit_id = repo
        .repo
        .commit_as(
            signature.clone(),
            signature,
            "HEAD",
            message,
            new_tree_id,
            [head_id.detach()],
        )
        .map_err(|e| GitError::BackendError { message: e.to_string() })?;

    oid_from_gix(commit_id.detach())
}
