//! The Store: the authoritative `id -> Bean` map, guarded by a single RW
//! lock, persisted synchronously under the same lock that guards the map
//! (§4.2).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::codec;
use crate::config::BeansConfig;
use crate::error::{CodecError, StoreError};
use crate::model::bean::GitMetadata;
use crate::model::{
    build_filename, parse_filename_stem, sanitize_slug, Bean, BeanId, BeanType, Priority, Status,
};

const ARCHIVE_DIR: &str = "archive";

pub struct Store {
    /// The `.beans/` directory.
    root: PathBuf,
    config: BeansConfig,
    beans: RwLock<HashMap<BeanId, Bean>>,
}

/// Everything a caller supplies to create a bean. `slug` drives the
/// filename and branch name, falling back to a sanitized form of `title`
/// when left empty. `id` is normally generated inside [`Store::create`];
/// set it to import a bean under a caller-chosen id, which fails with
/// [`StoreError::DuplicateId`] if already taken.
#[derive(Debug, Clone)]
pub struct NewBean {
    pub id: Option<BeanId>,
    pub slug: String,
    pub title: String,
    pub status: Status,
    pub bean_type: BeanType,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub parent: Option<BeanId>,
    pub blocking: Vec<BeanId>,
    pub duplicates: Vec<BeanId>,
    pub related: Vec<BeanId>,
    pub body: String,
    pub extra: BTreeMap<String, String>,
}

impl Default for NewBean {
    fn default() -> Self {
        NewBean {
            id: None,
            slug: String::new(),
            title: String::new(),
            status: Status::Todo,
            bean_type: BeanType::Task,
            priority: Priority::Normal,
            tags: BTreeSet::new(),
            parent: None,
            blocking: Vec::new(),
            duplicates: Vec::new(),
            related: Vec::new(),
            body: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// The result of a successful [`Store::update`]: both the pre-update
/// snapshot and the newly-persisted bean, so callers never need to keep
/// their own "before" copy around — the single most common correctness
/// pitfall in this kind of API (§9).
pub struct Updated {
    pub old: Bean,
    pub new: Bean,
}

/// What [`Store::reconcile_upsert`] did with the file it just read, so a
/// watcher can decide which event to emit.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    Created(Bean),
    Updated(Bean),
}

impl Store {
    #[must_use]
    pub fn new(root: PathBuf, config: BeansConfig) -> Self {
        Store {
            root,
            config,
            beans: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BeansConfig {
        &self.config
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discover every `*.md` under `.beans/` and `.beans/archive/`, parse
    /// each, and replace the in-memory map with the result. Aborts on the
    /// first parse failure with a file-scoped error.
    pub fn load(&self) -> Result<(), StoreError> {
        let mut discovered = HashMap::new();
        self.scan_dir(&self.root, false, &mut discovered)?;
        let archive_dir = self.root.join(ARCHIVE_DIR);
        if archive_dir.is_dir() {
            self.scan_dir(&archive_dir, true, &mut discovered)?;
        }
        let mut guard = self.beans.write().expect("store lock poisoned");
        *guard = discovered;
        Ok(())
    }

    fn scan_dir(
        &self,
        dir: &Path,
        archived: bool,
        out: &mut HashMap<BeanId, Bean>,
    ) -> Result<(), StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let bean = self.read_bean_file(&path, archived)?;
            out.insert(bean.id.clone(), bean);
        }
        Ok(())
    }

    fn read_bean_file(&self, path: &Path, archived: bool) -> Result<Bean, StoreError> {
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("non-utf8 filename: {}", path.display()),
            ))
        })?;
        let (id_raw, slug) = parse_filename_stem(stem, self.config.id_total_len())
            .unwrap_or_else(|| (stem.to_string(), String::new()));
        let id = BeanId::parse(id_raw)?;

        let contents = fs::read_to_string(path)?;
        let mtime: DateTime<Utc> = fs::metadata(path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let parsed = codec::parse(&contents, mtime)?;

        let rel_path = if archived {
            PathBuf::from(ARCHIVE_DIR).join(format!("{stem}.md"))
        } else {
            PathBuf::from(format!("{stem}.md"))
        };

        Ok(Bean {
            id,
            slug,
            path: rel_path,
            title: parsed.title,
            status: parsed.status,
            bean_type: parsed.bean_type,
            priority: parsed.priority,
            tags: parsed.tags,
            created_at: parsed.created_at,
            updated_at: parsed.updated_at,
            parent: parsed.parent,
            blocking: parsed.blocking,
            duplicates: parsed.duplicates,
            related: parsed.related,
            git: parsed.git,
            body: parsed.body,
            extra: parsed.extra,
        })
    }

    #[must_use]
    pub fn all(&self) -> Vec<Bean> {
        let guard = self.beans.read().expect("store lock poisoned");
        guard.values().cloned().collect()
    }

    /// Look up by exact id; if missing and a prefix is configured, retry
    /// with `prefix + key` (§4.2's short-id lookup).
    pub fn get(&self, key: &str) -> Result<Bean, StoreError> {
        if key.is_empty() {
            return Err(StoreError::NotFound {
                id: key.to_string(),
            });
        }
        let guard = self.beans.read().expect("store lock poisoned");
        if let Ok(id) = BeanId::parse(key) {
            if let Some(bean) = guard.get(&id) {
                return Ok(bean.clone());
            }
        }
        if !self.config.prefix.is_empty() && !key.starts_with(&self.config.prefix) {
            let prefixed = format!("{}{key}", self.config.prefix);
            if let Ok(id) = BeanId::parse(prefixed) {
                if let Some(bean) = guard.get(&id) {
                    return Ok(bean.clone());
                }
            }
        }
        Err(StoreError::NotFound {
            id: key.to_string(),
        })
    }

    /// Create a new bean: generates a fresh id (or adopts the caller-supplied
    /// one, failing with `DuplicateId` if it's already taken), derives a
    /// slug from `title` when none was given, stamps both timestamps to
    /// now, writes the file, and inserts it into the map.
    pub fn create(&self, draft: NewBean) -> Result<Bean, StoreError> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::InvalidBean(CodecError::MalformedBean {
                reason: "title must not be empty".to_string(),
            }));
        }

        let mut guard = self.beans.write().expect("store lock poisoned");

        let id = match draft.id {
            Some(id) => {
                if guard.contains_key(&id) {
                    return Err(StoreError::DuplicateId { id: id.to_string() });
                }
                id
            }
            None => loop {
                let candidate = BeanId::generate(&self.config.prefix, self.config.id_length);
                if !guard.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        let slug = if draft.slug.is_empty() {
            sanitize_slug(&draft.title)
        } else {
            draft.slug
        };

        let now = Utc::now();
        let bean = Bean {
            path: PathBuf::from(build_filename(&id, &slug)),
            id,
            slug,
            title: draft.title,
            status: draft.status,
            bean_type: draft.bean_type,
            priority: draft.priority,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
            parent: draft.parent,
            blocking: draft.blocking,
            duplicates: draft.duplicates,
            related: draft.related,
            git: GitMetadata::default(),
            body: draft.body,
            extra: draft.extra,
        };

        self.write_bean_file(&bean)?;
        guard.insert(bean.id.clone(), bean.clone());
        Ok(bean)
    }

    /// Replace the bean with `new.id`. Captures the Store's own current
    /// snapshot as `old` — never the caller's possibly-mutated copy — before
    /// applying the update, persists, then swaps the in-memory entry.
    pub fn update(&self, mut new: Bean) -> Result<Updated, StoreError> {
        let mut guard = self.beans.write().expect("store lock poisoned");
        let old = guard
            .get(&new.id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                id: new.id.to_string(),
            })?;

        new.created_at = old.created_at;
        new.updated_at = Utc::now();
        // Archiving is a soft-delete independent of status (§3): a bean's
        // location stays wherever `archive()`/`unarchive()` last put it,
        // regardless of what its status is updated to here.
        new.path = if old.path.starts_with(ARCHIVE_DIR) {
            PathBuf::from(ARCHIVE_DIR).join(build_filename(&new.id, &new.slug))
        } else {
            PathBuf::from(build_filename(&new.id, &new.slug))
        };

        self.remove_stale_file_if_renamed(&old, &new)?;
        self.write_bean_file(&new)?;
        guard.insert(new.id.clone(), new.clone());
        Ok(Updated { old, new })
    }

    /// Unlink the bean's file and erase its entry. Does not purge inbound
    /// links — callers (the Link Graph) coordinate that separately.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut guard = self.beans.write().expect("store lock poisoned");
        let bean_id = BeanId::parse(id)?;
        let bean = guard
            .remove(&bean_id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        let full_path = self.root.join(&bean.path);
        match fs::remove_file(&full_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Move a bean's file into `archive/`, preserving id and identity.
    pub fn archive(&self, id: &str) -> Result<Bean, StoreError> {
        self.move_between_states(id, true)
    }

    /// Move a bean's file back out of `archive/`.
    pub fn unarchive(&self, id: &str) -> Result<Bean, StoreError> {
        self.move_between_states(id, false)
    }

    fn move_between_states(&self, id: &str, to_archive: bool) -> Result<Bean, StoreError> {
        let mut guard = self.beans.write().expect("store lock poisoned");
        let bean_id = BeanId::parse(id)?;
        let mut bean = guard
            .get(&bean_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let old_path = self.root.join(&bean.path);
        let new_rel = if to_archive {
            PathBuf::from(ARCHIVE_DIR).join(build_filename(&bean.id, &bean.slug))
        } else {
            PathBuf::from(build_filename(&bean.id, &bean.slug))
        };
        let new_path = self.root.join(&new_rel);

        if let Some(parent) = new_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if old_path != new_path && old_path.exists() {
            fs::rename(&old_path, &new_path)?;
        }

        bean.path = new_rel;
        guard.insert(bean.id.clone(), bean.clone());
        Ok(bean)
    }

    fn remove_stale_file_if_renamed(&self, old: &Bean, new: &Bean) -> Result<(), StoreError> {
        if old.path == new.path {
            return Ok(());
        }
        let old_path = self.root.join(&old.path);
        match fs::remove_file(&old_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Re-read a single file and upsert it into the map. The watcher uses
    /// this for incremental reconciliation instead of a full [`Self::load`].
    pub fn reconcile_upsert(&self, full_path: &Path) -> Result<ReconcileOutcome, StoreError> {
        let rel = full_path.strip_prefix(&self.root).unwrap_or(full_path);
        let archived = rel.starts_with(ARCHIVE_DIR);
        let bean = self.read_bean_file(full_path, archived)?;
        let mut guard = self.beans.write().expect("store lock poisoned");
        let outcome = if guard.contains_key(&bean.id) {
            ReconcileOutcome::Updated(bean.clone())
        } else {
            ReconcileOutcome::Created(bean.clone())
        };
        guard.insert(bean.id.clone(), bean);
        Ok(outcome)
    }

    /// Remove whichever bean's file matches `full_path`, for a
    /// watcher-observed deletion. Returns the removed id, if any.
    pub fn reconcile_remove(&self, full_path: &Path) -> Option<BeanId> {
        let rel = full_path
            .strip_prefix(&self.root)
            .unwrap_or(full_path)
            .to_path_buf();
        let mut guard = self.beans.write().expect("store lock poisoned");
        let id = guard
            .iter()
            .find(|(_, b)| b.path == rel)
            .map(|(id, _)| id.clone())?;
        guard.remove(&id);
        Some(id)
    }

    /// Write to a scratch location, then atomically rename into place.
    fn write_bean_file(&self, bean: &Bean) -> Result<(), StoreError> {
        let full_path = self.root.join(&bean.path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = codec::render(bean);
        let scratch = full_path.with_extension("md.tmp");
        fs::write(&scratch, rendered)?;
        fs::rename(&scratch, &full_path)?;
        Ok(())
    }
}
