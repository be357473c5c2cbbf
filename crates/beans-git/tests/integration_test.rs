use std::process::Command;

use tempfile::TempDir;

use beans_git::{GitRepo, GixRepo};

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git invocation failed");
    assert!(status.success(), "git {args:?} failed");
}

fn setup_repo() -> (TempDir, GixRepo) {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q", "-b", "main"]);
    git(dir.path(), &["config", "user.email", "test@test.com"]);
    git(dir.path(), &["config", "user.name", "Test User"]);
    let repo = GixRepo::open(dir.path()).unwrap();
    (dir, repo)
}

fn commit_file(dir: &std::path::Path, name: &str, contents: &str, message: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", message]);
}

// ---------------------------------------------------------------------------
// Branch lifecycle
// ---------------------------------------------------------------------------

#[test]
fn branch_create_and_exists() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "a", "initial");
    let head = repo.head().unwrap();

    assert!(!repo.branch_exists("feature").unwrap());
    repo.branch_create("feature", head).unwrap();
    assert!(repo.branch_exists("feature").unwrap());
}

#[test]
fn branch_create_rejects_duplicate() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "a", "initial");
    let head = repo.head().unwrap();

    repo.branch_create("feature", head).unwrap();
    let err = repo.branch_create("feature", head).unwrap_err();
    assert!(matches!(err, beans_git::GitError::BranchExists { .. }));
}

#[test]
fn branch_delete_is_idempotent() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "a", "initial");
    let head = repo.head().unwrap();

    repo.branch_create("feature", head).unwrap();
    repo.branch_delete("feature").unwrap();
    assert!(!repo.branch_exists("feature").unwrap());
    // Deleting again must not error.
    repo.branch_delete("feature").unwrap();
}

#[test]
fn branch_checkout_updates_head_and_worktree() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "base", "initial");
    let base = repo.head().unwrap();
    repo.branch_create("feature", base).unwrap();

    git(dir.path(), &["checkout", "-q", "feature"]);
    commit_file(dir.path(), "b.txt", "feature-only", "feature commit");
    let feature_tip = repo.head().unwrap();
    git(dir.path(), &["checkout", "-q", "main"]);

    repo.branch_checkout("feature").unwrap();
    assert_eq!(repo.head().unwrap(), feature_tip);
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn list_branches_includes_created_branch() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "a", "initial");
    let head = repo.head().unwrap();
    repo.branch_create("feature", head).unwrap();

    let branches = repo.list_branches().unwrap();
    assert!(branches.iter().any(|b| b == "feature"));
    assert!(branches.iter().any(|b| b == "main"));
}

// ---------------------------------------------------------------------------
// Rev resolution and ancestry
// ---------------------------------------------------------------------------

#[test]
fn rev_parse_resolves_branch_name() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "a", "initial");
    let head = repo.head().unwrap();
    assert_eq!(repo.rev_parse("main").unwrap(), head);
}

#[test]
fn rev_parse_opt_missing_returns_none() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "a", "initial");
    assert_eq!(repo.rev_parse_opt("does-not-exist").unwrap(), None);
}

#[test]
fn is_ancestor_true_for_direct_lineage() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "a", "first");
    let first = repo.head().unwrap();
    commit_file(dir.path(), "a.txt", "a2", "second");
    let second = repo.head().unwrap();

    assert!(repo.is_ancestor(first, second).unwrap());
    assert!(!repo.is_ancestor(second, first).unwrap());
}

#[test]
fn merge_base_finds_common_ancestor() {
    let (dir, repo) = setup_repo();
    commit_file(dir.path(), "a.txt", "a", "initial");
    let base = repo.head().unwrap();
    repo.branch_create("feature", base).unwrap();

    git(dir.path(), &["checkout", "-q", "feature"]);
    commit_file(dir.path(), "b.txt", "b", "feature commit");
    git(dir.path(), &["checkout", "-q", "main"]);
    commit_file(dir.path(), "c.txt", "c", "main commit");

    let merge_base = repo.merge_base(repo.head().unwrap(), repo.rev_parse("feature").unwrap());
    assert_eq!(merge_base.unwrap(), Some(base));
}

// ---------------------------------------------------------------------------
// Status scoping and commits
// ---------------------------------------------------------------------------

#[test]
fn status_under_filters_by_prefix() {
    let (dir, repo) = setup_repo();
    std::fs::create_dir_all(dir.path().join(".beans")).unwrap();
    commit_file(dir.path(), "README.md", "root", "initial");
    std::fs::write(dir.path().join(".beans/x.md"), "bean").unwrap();
    std::fs::write(dir.path().join("README.md"), "root changed").unwrap();

    let beans_only = repo.status_under(".beans").unwrap();
    assert!(beans_only.iter().all(|e| e.path.starts_with(".beans")));
    assert!(!beans_only.is_empty());

    let whole_tree = repo.status_under("").unwrap();
    assert!(whole_tree.len() >= beans_only.len());
}

#[test]
fn commit_paths_only_stages_requested_files() {
    let (dir, repo) = setup_repo();
    std::fs::create_dir_all(dir.path().join(".beans")).unwrap();
    commit_file(dir.path(), ".beans/x.md", "initial", "initial");

    std::fs::write(dir.path().join(".beans/x.md"), "changed").unwrap();
    std::fs::write(dir.path().join("scratch.txt"), "untracked, not committed").unwrap();

    let before = repo.head().unwrap();
    let after = repo
        .commit_paths(&[".beans/x.md"], "chore: update beans", "beans", "beans@localhost")
        .unwrap();
    assert_ne!(before, after);
    assert!(repo.is_ancestor(before, after).unwrap());

    // scratch.txt was never staged, so it is still dirty/untracked afterwards.
    let status = repo.status_under("").unwrap();
    assert!(status.iter().any(|e| e.path == "scratch.txt"));
}
