//! The `Core` facade: composes the Store, Link Graph, Watcher, Pub/Sub Hub,
//! and Git Coordinator into the single entry point external callers (CLI,
//! API, TUI) use.
//!
//! `Core::update` is the realization of §4.5's "triggered inside
//! Store.update when old.status != new.status": `beans_core::Store` cannot
//! depend on the Git Coordinator (the plumbing/domain/application layering
//! runs the other way), so this facade runs the coordinator *before*
//! persisting rather than rolling back after a partial write. A coordinator
//! failure here means `Store::update` is never called at all, so there is
//! nothing to roll back — no partially-applied transition is ever visible,
//! the same guarantee §4.5 asks for, reached by front-loading the risky step
//! instead of unwinding it. See `workspace/advance.rs` for the same
//! low-level-op-wrapped-by-orchestration shape.

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use beans_core::{Bean, BeansConfig, GraphIssues, LinkKind, NewBean, Store};
use beans_git::GitRepo;

use crate::cancellation::CancellationToken;
use crate::error::Error;
use crate::git_coordinator::{GitCoordinator, SyncReport};
use crate::pubsub::{EventBatch, Hub, Subscription};
use crate::watcher::{TracingWarningSink, Watcher};

pub struct Core {
    store: Arc<Store>,
    coordinator: GitCoordinator,
    hub: Hub,
    watcher: Option<Watcher>,
    cancellation: CancellationToken,
}

impl Core {
    /// Load `.beans/` under `root`, start the watcher, and return the
    /// facade. `repo` is the git backend the coordinator issues commands
    /// against; pass a no-op/disabled backend in tests where
    /// `config.git.enabled` is false.
    pub fn open(root: PathBuf, config: BeansConfig, repo: Arc<dyn GitRepo>) -> Result<Self, Error> {
        let store = Arc::new(Store::new(root, config));
        store.load()?;

        let hub = Hub::new();
        let watcher = Watcher::start(Arc::clone(&store), hub.clone(), Arc::new(TracingWarningSink))
            .map_err(|e| Error::IoError(std::io::Error::other(e.to_string())))?;

        Ok(Core {
            store,
            coordinator: GitCoordinator::new(repo),
            hub,
            watcher: Some(watcher),
            cancellation: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn subscribe(&self) -> (Receiver<EventBatch>, Subscription) {
        self.hub.subscribe()
    }

    /// A clone of this Core's cancellation token. Callers use it to cancel
    /// an in-flight [`Self::sync`] or [`Self::reload`] from another thread;
    /// [`Self::close`] cancels it automatically.
    #[must_use]
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Re-scan `.beans/` from disk, replacing the in-memory map wholesale.
    /// Checked against the cancellation token since a large tree walk can
    /// take a while (§5/§7.4).
    pub fn reload(&self) -> Result<(), Error> {
        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.store.load()?;
        Ok(())
    }

    #[must_use]
    pub fn all(&self) -> Vec<Bean> {
        self.store.all()
    }

    pub fn get(&self, key: &str) -> Result<Bean, Error> {
        Ok(self.store.get(key)?)
    }

    /// Create a new bean. Only parent existence and allowed-type are
    /// checked here — a brand-new id can never be part of an existing
    /// cycle or self-link.
    pub fn create(&self, draft: NewBean) -> Result<Bean, Error> {
        if let Some(parent_id) = &draft.parent {
            let parent = self.store.get(parent_id.as_str())?;
            if !draft.bean_type.allowed_parent_types().contains(&parent.bean_type) {
                return Err(Error::InvalidParentType {
                    message: format!(
                        "a {} cannot have a {} parent",
                        draft.bean_type, parent.bean_type
                    ),
                });
            }
        }
        Ok(self.store.create(draft)?)
    }

    /// Replace a bean. Runs the Git Coordinator's §4.5 transition handling
    /// before persisting, so a coordinator failure leaves the Store
    /// untouched.
    pub fn update(&self, mut new: Bean) -> Result<Bean, Error> {
        let old = self.store.get(new.id.as_str())?;

        if let Some(parent_id) = new.parent.clone() {
            if old.parent.as_ref() != Some(&parent_id) {
                beans_core::LinkGraph::new(&self.store).validate_parent(&new, &parent_id)?;
            }
        }

        let graph = beans_core::LinkGraph::new(&self.store);
        for target in &new.blocking {
            if old.blocking.contains(target) {
                continue;
            }
            if let Some(cycle) = graph.would_cycle(&new.id, LinkKind::Blocks, target) {
                return Err(Error::CycleDetected {
                    path: cycle.iter().map(ToString::to_string).collect(),
                });
            }
        }

        if old.status != new.status {
            let is_parent_bean = beans_core::LinkGraph::new(&self.store)
                .incoming(&new.id)
                .into_iter()
                .any(|(_, kind)| kind == LinkKind::Parent);
            self.coordinator.on_transition(
                &self.store.config().git,
                old.status,
                &mut new,
                is_parent_bean,
            )?;
        }

        let updated = self.store.update(new)?;
        Ok(updated.new)
    }

    pub fn delete(&self, id: &str) -> Result<(), Error> {
        Ok(self.store.delete(id)?)
    }

    pub fn archive(&self, id: &str) -> Result<Bean, Error> {
        Ok(self.store.archive(id)?)
    }

    pub fn unarchive(&self, id: &str) -> Result<Bean, Error> {
        Ok(self.store.unarchive(id)?)
    }

    #[must_use]
    pub fn check_links(&self) -> GraphIssues {
        beans_core::LinkGraph::new(&self.store).check_all()
    }

    pub fn fix_broken_links(&self) -> Result<usize, Error> {
        Ok(beans_core::LinkGraph::new(&self.store).fix_broken()?)
    }

    pub fn sync(&self, apply: bool) -> Result<SyncReport, Error> {
        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.coordinator.sync(&self.store, &self.store.config().git, apply)
    }

    /// Cancel all in-flight debounce timers, stop the watcher, and close
    /// every subscriber channel. Idempotent.
    pub fn close(&mut self) {
        self.cancellation.cancel();
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        self.hub.close();
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        self.close();
    }
}
