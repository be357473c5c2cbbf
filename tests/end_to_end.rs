//! End-to-end scenarios exercised through the public `Core` facade, one per
//! scenario described for the engine as a whole: create/update/read, cycle
//! rejection, the parent-type hierarchy, watcher incrementality, and the two
//! git-backed flows (auto-branch on transition, sync of a merged branch).

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use beans::{BeanType, BeansConfig, Core, Error, GitConfig, NewBean, Status};
use beans_git::GixRepo;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git invocation failed");
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q", "-b", "main"]);
    git(dir.path(), &["config", "user.email", "test@test.com"]);
    git(dir.path(), &["config", "user.name", "Test User"]);
    std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
    git(dir.path(), &["add", "README.md"]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);
    dir
}

fn open_core_no_git(dir: &TempDir) -> Core {
    let config = BeansConfig {
        git: GitConfig {
            enabled: false,
            ..GitConfig::default()
        },
        ..BeansConfig::default()
    };
    Core::open(dir.path().to_path_buf(), config, Arc::new(NoGitRepo)).unwrap()
}

struct NoGitRepo;

impl beans_git::GitRepo for NoGitRepo {
    fn branch_create(&self, _name: &str, _from: beans_git::GitOid) -> Result<(), beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn branch_checkout(&self, _name: &str) -> Result<(), beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn branch_delete(&self, _name: &str) -> Result<(), beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn branch_exists(&self, _name: &str) -> Result<bool, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn list_branches(&self) -> Result<Vec<String>, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn rev_parse(&self, _rev: &str) -> Result<beans_git::GitOid, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn rev_parse_opt(&self, _rev: &str) -> Result<Option<beans_git::GitOid>, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn default_branch(&self) -> Result<String, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn is_ancestor(
        &self,
        _ancestor: beans_git::GitOid,
        _descendant: beans_git::GitOid,
    ) -> Result<bool, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn merge_base(
        &self,
        _a: beans_git::GitOid,
        _b: beans_git::GitOid,
    ) -> Result<Option<beans_git::GitOid>, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn commits_between(
        &self,
        _base: beans_git::GitOid,
        _tip: beans_git::GitOid,
    ) -> Result<Vec<beans_git::CommitInfo>, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn log(&self, _rev: &str, _limit: usize) -> Result<Vec<beans_git::CommitInfo>, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn status_under(&self, _scope: &str) -> Result<Vec<beans_git::StatusEntry>, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn commit_paths(
        &self,
        _paths: &[&str],
        _message: &str,
        _author_name: &str,
        _author_email: &str,
    ) -> Result<beans_git::GitOid, beans_git::GitError> {
        unreachable!("git disabled")
    }
    fn head(&self) -> Result<beans_git::GitOid, beans_git::GitError> {
        unreachable!("git disabled")
    }
}

fn draft(title: &str) -> NewBean {
    NewBean {
        title: title.to_string(),
        ..NewBean::default()
    }
}

// ---------------------------------------------------------------------------
// 1. Create -> update -> read
// ---------------------------------------------------------------------------

#[test]
fn create_update_read_roundtrips_through_the_facade() {
    let dir = TempDir::new().unwrap();
    let core = open_core_no_git(&dir);

    let created = core.create(draft("X")).unwrap();
    assert!(created.id.as_str().starts_with("beans-"));
    assert_eq!(created.id.as_str().len(), "beans-".len() + 4);
    assert_eq!(created.created_at, created.updated_at);

    // No slug was given, so it's derived from the title: `{id}-x.md`.
    assert_eq!(created.path, std::path::PathBuf::from(format!("{}-x.md", created.id.as_str())));
    let path = dir.path().join(&created.path);
    assert!(path.exists());

    let mut updated = created.clone();
    updated.status = Status::Todo;
    updated.title = "X renamed".to_string();
    let saved = core.update(updated).unwrap();

    let fetched = core.get(created.id.as_str()).unwrap();
    assert_eq!(fetched.status, Status::Todo);
    assert_eq!(fetched.title, "X renamed");
    assert_eq!(fetched.id, saved.id);
}

// ---------------------------------------------------------------------------
// 2. Cycle rejection
// ---------------------------------------------------------------------------

#[test]
fn blocking_cycle_is_rejected() {
    let dir = TempDir::new().unwrap();
    let core = open_core_no_git(&dir);

    let a = core.create(draft("A")).unwrap();
    let mut b = core.create(draft("B")).unwrap();
    b.blocking = vec![a.id.clone()];
    let b = core.update(b).unwrap();

    let mut c = core.create(draft("C")).unwrap();
    c.blocking = vec![b.id.clone()];
    let c = core.update(c).unwrap();

    let mut a_blocks_c = a.clone();
    a_blocks_c.blocking = vec![c.id.clone()];
    let err = core.update(a_blocks_c).unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));

    // No new cycle should have been persisted.
    let a_after = core.get(a.id.as_str()).unwrap();
    assert!(a_after.blocking.is_empty());
}

// ---------------------------------------------------------------------------
// 3. Parent type rule
// ---------------------------------------------------------------------------

#[test]
fn parent_type_rule_rejects_milestone_parent_and_allows_task_under_milestone() {
    let dir = TempDir::new().unwrap();
    let core = open_core_no_git(&dir);

    let m = core
        .create(NewBean {
            title: "M".to_string(),
            bean_type: BeanType::Milestone,
            ..NewBean::default()
        })
        .unwrap();
    let t = core
        .create(NewBean {
            title: "T".to_string(),
            bean_type: BeanType::Task,
            ..NewBean::default()
        })
        .unwrap();

    let mut m_with_parent = m.clone();
    m_with_parent.parent = Some(t.id.clone());
    let err = core.update(m_with_parent).unwrap_err();
    assert!(matches!(err, Error::InvalidParentType { .. }));

    let mut t_with_parent = t.clone();
    t_with_parent.parent = Some(m.id.clone());
    let updated = core.update(t_with_parent).unwrap();
    assert_eq!(updated.parent, Some(m.id));
}

// ---------------------------------------------------------------------------
// 4. Watcher incremental create/delete
// ---------------------------------------------------------------------------

#[test]
fn watcher_reports_external_create_then_delete_within_debounce_window() {
    let dir = TempDir::new().unwrap();
    let core = open_core_no_git(&dir);
    let (rx, _sub) = core.subscribe();

    let path = dir.path().join("beans-zzzz-new.md");
    std::fs::write(&path, "---\ntitle: \"New\"\nstatus: todo\n---\n").unwrap();

    let batch = rx.recv_timeout(Duration::from_millis(500)).unwrap();
    assert_eq!(batch.len(), 1);
    assert!(matches!(batch[0], beans::BeanEvent::Created(_)));

    std::fs::remove_file(&path).unwrap();
    let batch = rx.recv_timeout(Duration::from_millis(500)).unwrap();
    assert_eq!(batch.len(), 1);
    assert!(matches!(batch[0], beans::BeanEvent::Deleted(_)));
}

// ---------------------------------------------------------------------------
// 5. Git auto-branch on transition
// ---------------------------------------------------------------------------

#[test]
fn parent_bean_entering_in_progress_creates_a_branch_from_base() {
    let repo_dir = init_repo();
    let beans_dir = repo_dir.path().join(".beans");
    std::fs::create_dir_all(&beans_dir).unwrap();

    let repo = Arc::new(GixRepo::open(repo_dir.path()).unwrap());
    let config = BeansConfig {
        git: GitConfig {
            base_branch: "main".to_string(),
            ..GitConfig::default()
        },
        ..BeansConfig::default()
    };
    let core = Core::open(beans_dir.clone(), config, repo.clone()).unwrap();

    let parent = core
        .create(NewBean {
            title: "Epic parent".to_string(),
            bean_type: BeanType::Epic,
            ..NewBean::default()
        })
        .unwrap();
    core.create(NewBean {
        title: "Child task".to_string(),
        bean_type: BeanType::Task,
        parent: Some(parent.id.clone()),
        ..NewBean::default()
    })
    .unwrap();

    let mut in_progress = core.get(parent.id.as_str()).unwrap();
    in_progress.status = Status::InProgress;
    let updated = core.update(in_progress).unwrap();

    let expected_branch = format!("{}/{}", parent.id.as_str(), parent.slug);
    assert_eq!(updated.git.branch.as_deref(), Some(expected_branch.as_str()));
    assert!(updated.git.created_at.is_some());

    use beans_git::GitRepo;
    assert!(repo.branch_exists(&expected_branch).unwrap());
}

// ---------------------------------------------------------------------------
// 6. Sync a merged branch
// ---------------------------------------------------------------------------

#[test]
fn sync_marks_a_merged_and_deleted_branch_as_completed() {
    let repo_dir = init_repo();
    let beans_dir = repo_dir.path().join(".beans");
    std::fs::create_dir_all(&beans_dir).unwrap();

    let repo = Arc::new(GixRepo::open(repo_dir.path()).unwrap());
    let config = BeansConfig {
        git: GitConfig {
            base_branch: "main".to_string(),
            ..GitConfig::default()
        },
        ..BeansConfig::default()
    };
    let core = Core::open(beans_dir.clone(), config, repo.clone()).unwrap();

    let parent = core
        .create(NewBean {
            title: "Epic parent".to_string(),
            bean_type: BeanType::Epic,
            ..NewBean::default()
        })
        .unwrap();
    core.create(NewBean {
        title: "Child task".to_string(),
        bean_type: BeanType::Task,
        parent: Some(parent.id.clone()),
        ..NewBean::default()
    })
    .unwrap();

    let mut in_progress = core.get(parent.id.as_str()).unwrap();
    in_progress.status = Status::InProgress;
    let with_branch = core.update(in_progress).unwrap();
    let branch_name = with_branch.git.branch.clone().unwrap();

    git(repo_dir.path(), &["checkout", "-q", "main"]);
    git(
        repo_dir.path(),
        &["merge", "--no-ff", "-q", "-m", &format!("Merge branch '{branch_name}'"), &branch_name],
    );
    git(repo_dir.path(), &["branch", "-D", &branch_name]);

    let report = core.sync(true).unwrap();
    assert_eq!(report.applied.len(), 1);

    let synced = core.get(parent.id.as_str()).unwrap();
    assert_eq!(synced.status, Status::Completed);
    assert!(synced.git.merged_at.is_some());

    use beans_git::GitRepo;
    let main_tip = repo.rev_parse("main").unwrap();
    assert_eq!(synced.git.merge_commit.as_deref(), Some(main_tip.to_string().as_str()));
}
