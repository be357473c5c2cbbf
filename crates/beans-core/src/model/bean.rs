//! The `Bean` entity and its fixed enumerations.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use super::ids::BeanId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Backlog,
    Todo,
    InProgress,
    Completed,
    Scrapped,
    Draft,
}

impl Status {
    /// Archive statuses are terminal; the Store files them under `archive/`.
    #[must_use]
    pub fn is_archive(self) -> bool {
        matches!(self, Status::Completed | Status::Scrapped)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Backlog => "backlog",
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
            Status::Scrapped => "scrapped",
            Status::Draft => "draft",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "backlog" => Some(Status::Backlog),
            "todo" => Some(Status::Todo),
            "in-progress" => Some(Status::InProgress),
            "completed" => Some(Status::Completed),
            "scrapped" => Some(Status::Scrapped),
            "draft" => Some(Status::Draft),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeanType {
    Milestone,
    Epic,
    Feature,
    Task,
    Bug,
}

impl BeanType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BeanType::Milestone => "milestone",
            BeanType::Epic => "epic",
            BeanType::Feature => "feature",
            BeanType::Task => "task",
            BeanType::Bug => "bug",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "milestone" => Some(BeanType::Milestone),
            "epic" => Some(BeanType::Epic),
            "feature" => Some(BeanType::Feature),
            "task" => Some(BeanType::Task),
            "bug" => Some(BeanType::Bug),
            _ => None,
        }
    }

    /// Enforce §3 invariant 4: which types a bean of this type may take as a parent.
    #[must_use]
    pub fn allowed_parent_types(self) -> &'static [BeanType] {
        match self {
            BeanType::Milestone => &[],
            BeanType::Epic => &[BeanType::Milestone],
            BeanType::Feature => &[BeanType::Milestone, BeanType::Epic],
            BeanType::Task | BeanType::Bug => {
                &[BeanType::Milestone, BeanType::Epic, BeanType::Feature]
            }
        }
    }
}

impl fmt::Display for BeanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
    Deferred,
}

impl Priority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Deferred => "deferred",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Priority::Critical),
            "high" => Some(Priority::High),
            "normal" => Some(Priority::Normal),
            "low" => Some(Priority::Low),
            "deferred" => Some(Priority::Deferred),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkKind {
    Parent,
    Blocks,
    Duplicates,
    Related,
}

impl LinkKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Parent => "parent",
            LinkKind::Blocks => "blocks",
            LinkKind::Duplicates => "duplicates",
            LinkKind::Related => "related",
        }
    }

    /// Hierarchical kinds participate in cycle detection (§4.3).
    #[must_use]
    pub fn is_hierarchical(self) -> bool {
        matches!(self, LinkKind::Parent | LinkKind::Blocks)
    }
}

/// An outgoing link, unifying the scalar `parent` field and the list-valued
/// relation fields behind one abstraction for the Link Graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub kind: LinkKind,
    pub target: BeanId,
}

#[derive(Debug, Clone, Default)]
pub struct GitMetadata {
    pub branch: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Hex-encoded commit id. Kept as a string at this layer so front-matter
    /// round-trips without a YAML-specific `GitOid` codec; the Git
    /// Coordinator converts to/from `beans_git::GitOid` at its boundary.
    pub merge_commit: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Bean {
    pub id: BeanId,
    pub slug: String,
    /// Path relative to `.beans/`, e.g. `beans-a1b2-fix-bug.md` or
    /// `archive/beans-a1b2-fix-bug.md`.
    pub path: PathBuf,
    pub title: String,
    pub status: Status,
    pub bean_type: BeanType,
    pub priority: Priority,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub parent: Option<BeanId>,
    pub blocking: Vec<BeanId>,
    pub duplicates: Vec<BeanId>,
    pub related: Vec<BeanId>,
    pub git: GitMetadata,
    pub body: String,
    /// Unknown scalar front-matter keys, preserved round-trip (§4.1).
    pub extra: std::collections::BTreeMap<String, String>,
}

impl Bean {
    /// Every outgoing link, `parent` first, in the unified representation
    /// the Link Graph operates over.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        let mut links = Vec::new();
        if let Some(parent) = &self.parent {
            links.push(Link {
                kind: LinkKind::Parent,
                target: parent.clone(),
            });
        }
        for target in &self.blocking {
            links.push(Link {
                kind: LinkKind::Blocks,
                target: target.clone(),
            });
        }
        for target in &self.duplicates {
            links.push(Link {
                kind: LinkKind::Duplicates,
                target: target.clone(),
            });
        }
        for target in &self.related {
            links.push(Link {
                kind: LinkKind::Related,
                target: target.clone(),
            });
        }
        links
    }
}
