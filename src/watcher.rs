//! Filesystem watcher for `.beans/` (§4.4). Debounces bursts of events into
//! a single quiet-window flush, then reconciles the Store incrementally —
//! never a full reload — and publishes the resulting diff.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use beans_core::{ReconcileOutcome, Store};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};

use crate::pubsub::{BeanEvent, Hub};

/// Quiet window from the last observed event before a debounce batch is
/// flushed (§4.4).
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);
/// How often the debounce loop wakes to re-check the stop flag even with
/// no pending events.
const POLL_TICK: Duration = Duration::from_millis(50);

/// Receives warnings for externally-edited files that fail to parse. The
/// watcher never crashes on a bad file — it skips it and reports here.
pub trait WarningSink: Send + Sync {
    fn warn(&self, path: &Path, message: &str);
}

/// Default sink: logs via `tracing`.
pub struct TracingWarningSink;

impl WarningSink for TracingWarningSink {
    fn warn(&self, path: &Path, message: &str) {
        tracing::warn!(path = %path.display(), %message, "watcher: skipping unparseable bean file");
    }
}

#[derive(Default, Clone, Copy)]
struct OpMask {
    saw_remove_or_rename: bool,
    saw_create_or_write: bool,
}

/// Owns the background thread and the underlying `notify` watcher. Dropping
/// it stops the thread.
pub struct Watcher {
    // Held only to keep the OS-level watch alive; dropping it stops watching.
    _fs_watcher: RecommendedWatcher,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Start watching `store.root()` recursively for `*.md` changes.
    pub fn start(
        store: Arc<Store>,
        hub: Hub,
        warnings: Arc<dyn WarningSink>,
    ) -> notify::Result<Self> {
        let (raw_tx, raw_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();
        let mut fs_watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })?;
        fs_watcher.watch(store.root(), RecursiveMode::Recursive)?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            run_debounce_loop(&raw_rx, &stop_for_thread, &store, &hub, warnings.as_ref());
        });

        Ok(Watcher {
            _fs_watcher: fs_watcher,
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the background thread. Safe to call more than once.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_debounce_loop(
    raw_rx: &Receiver<notify::Result<Event>>,
    stop: &AtomicBool,
    store: &Store,
    hub: &Hub,
    warnings: &dyn WarningSink,
) {
    let mut pending: HashMap<PathBuf, OpMask> = HashMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }

        let wait = deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(POLL_TICK)
            .min(POLL_TICK);

        match raw_rx.recv_timeout(wait) {
            Ok(Ok(event)) => {
                for path in relevant_paths(&event) {
                    apply_kind(pending.entry(path).or_default(), &event.kind);
                }
                if !pending.is_empty() {
                    deadline = Some(Instant::now() + DEBOUNCE_WINDOW);
                }
            }
            Ok(Err(e)) => {
                warnings.warn(store.root(), &e.to_string());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            flush(&mut pending, store, hub, warnings);
            deadline = None;
        }
    }
}

fn relevant_paths(event: &Event) -> impl Iterator<Item = PathBuf> + '_ {
    event
        .paths
        .iter()
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
        .cloned()
}

fn apply_kind(mask: &mut OpMask, kind: &EventKind) {
    match kind {
        EventKind::Remove(_) => mask.saw_remove_or_rename = true,
        EventKind::Modify(ModifyKind::Name(_)) => mask.saw_remove_or_rename = true,
        EventKind::Create(_) | EventKind::Modify(_) => mask.saw_create_or_write = true,
        EventKind::Access(_) | EventKind::Other | EventKind::Any => {}
    }
}

/// Apply the aggregated diff in one pass and publish the resulting events.
fn flush(pending: &mut HashMap<PathBuf, OpMask>, store: &Store, hub: &Hub, warnings: &dyn WarningSink) {
    if pending.is_empty() {
        return;
    }
    let mut events = Vec::new();
    for (path, mask) in pending.drain() {
        let exists = path.is_file();
        if mask.saw_remove_or_rename && !exists {
            if let Some(id) = store.reconcile_remove(&path) {
                events.push(BeanEvent::Deleted(id));
            }
            continue;
        }
        if !exists {
            continue;
        }
        if !mask.saw_create_or_write && !mask.saw_remove_or_rename {
            continue;
        }
        match store.reconcile_upsert(&path) {
            Ok(ReconcileOutcome::Created(bean)) => events.push(BeanEvent::Created(bean.id)),
            Ok(ReconcileOutcome::Updated(bean)) => events.push(BeanEvent::Updated(bean.id)),
            Err(e) => warnings.warn(&path, &e.to_string()),
        }
    }
    hub.publish(events);
}
