//! Bean Codec: parse and render the YAML-front-matter + markdown body file
//! format (§4.1). `id`/`slug`/`path` are not encoded in the front matter —
//! they're derived from the filename — so this module works with a
//! front-matter-shaped subset of `Bean` and the Store fills in the rest.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde_yaml::Value;

use crate::error::CodecError;
use crate::model::bean::GitMetadata;
use crate::model::{BeanId, BeanType, Priority, Status};

/// Everything the Codec can recover from a bean file, minus the
/// filename-derived identity fields.
#[derive(Debug, Clone)]
pub struct ParsedBean {
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
    pub extra: BTreeMap<String, String>,
}

/// Split `---\n<yaml>\n---\n<body>` into its YAML and body halves.
fn split_front_matter(contents: &str) -> Result<(&str, &str), CodecError> {
    let rest = contents.strip_prefix("---").ok_or_else(|| CodecError::MalformedFrontMatter {
        reason: "file does not start with a `---` front-matter delimiter".to_string(),
    })?;
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let end = rest.find("\n---").ok_or_else(|| CodecError::MalformedFrontMatter {
        reason: "no closing `---` delimiter found".to_string(),
    })?;
    let yaml = &rest[..end];
    let after = &rest[end + 4..];
    let body = after.strip_prefix('\n').unwrap_or(after);
    Ok((yaml, body))
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_id_list(value: &Value, field: &str) -> Result<Vec<BeanId>, CodecError> {
    let Value::Sequence(items) = value else {
        return Err(CodecError::MalformedBean {
            reason: format!("{field} must be a list of ids"),
        });
    };
    items
        .iter()
        .map(|item| {
            let s = as_string(item).ok_or_else(|| CodecError::MalformedBean {
                reason: format!("{field} entry is not a scalar id"),
            })?;
            BeanId::parse(s).map_err(|e| CodecError::MalformedBean {
                reason: format!("{field}: {e}"),
            })
        })
        .collect()
}

fn parse_datetime(value: &Value, field: &str) -> Result<DateTime<Utc>, CodecError> {
    let s = as_string(value).ok_or_else(|| CodecError::MalformedBean {
        reason: format!("{field} must be a timestamp string"),
    })?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CodecError::MalformedBean {
            reason: format!("{field}: {e}"),
        })
}

/// Parse a bean file. `fallback_mtime` is used for `created_at`/`updated_at`
/// when the front matter omits them (§4.1).
pub fn parse(contents: &str, fallback_mtime: DateTime<Utc>) -> Result<ParsedBean, CodecError> {
    let (yaml, body) = split_front_matter(contents)?;

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| CodecError::MalformedFrontMatter {
        reason: e.to_string(),
    })?;
    let Value::Mapping(mut map) = value else {
        return Err(CodecError::MalformedFrontMatter {
            reason: "front matter is not a YAML mapping".to_string(),
        });
    };

    let mut take = |key: &str| map.remove(Value::String(key.to_string()));

    let title = take("title")
        .as_ref()
        .and_then(as_string)
        .unwrap_or_default();
    if title.is_empty() {
        return Err(CodecError::MalformedBean {
            reason: "title must be non-empty".to_string(),
        });
    }

    let status_raw = take("status")
        .as_ref()
        .and_then(as_string)
        .ok_or_else(|| CodecError::MalformedBean {
            reason: "status is required".to_string(),
        })?;
    let status = Status::parse(&status_raw).ok_or_else(|| CodecError::MalformedBean {
        reason: format!("unknown status: {status_raw}"),
    })?;

    let bean_type = match take("type").as_ref().and_then(as_string) {
        Some(raw) => BeanType::parse(&raw).ok_or_else(|| CodecError::MalformedBean {
            reason: format!("unknown type: {raw}"),
        })?,
        None => BeanType::Task,
    };

    let priority = match take("priority").as_ref().and_then(as_string) {
        Some(raw) => Priority::parse(&raw).ok_or_else(|| CodecError::MalformedBean {
            reason: format!("unknown priority: {raw}"),
        })?,
        None => Priority::Normal,
    };

    let tags = match take("tags") {
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                as_string(item).ok_or_else(|| CodecError::MalformedBean {
                    reason: "tags entry is not a scalar".to_string(),
                })
            })
            .collect::<Result<BTreeSet<_>, _>>()?,
        Some(_) => {
            return Err(CodecError::MalformedBean {
                reason: "tags must be a list".to_string(),
            })
        }
        None => BTreeSet::new(),
    };

    let created_at = match take("created_at") {
        Some(v) => parse_datetime(&v, "created_at")?,
        None => fallback_mtime,
    };
    let updated_at = match take("updated_at") {
        Some(v) => parse_datetime(&v, "updated_at")?,
        None => fallback_mtime,
    };

    let parent = match take("parent").as_ref().and_then(as_string) {
        Some(raw) => Some(BeanId::parse(raw).map_err(|e| CodecError::MalformedBean {
            reason: format!("parent: {e}"),
        })?),
        None => None,
    };

    let blocking = match take("blocking") {
        Some(v) => parse_id_list(&v, "blocking")?,
        None => Vec::new(),
    };
    let duplicates = match take("duplicates") {
        Some(v) => parse_id_list(&v, "duplicates")?,
        None => Vec::new(),
    };
    let related = match take("related") {
        Some(v) => parse_id_list(&v, "related")?,
        None => Vec::new(),
    };

    let git_branch = take("git_branch").as_ref().and_then(as_string);
    let git_created_at = match take("git_created_at") {
        Some(v) => Some(parse_datetime(&v, "git_created_at")?),
        None => None,
    };
    let git_merged_at = match take("git_merged_at") {
        Some(v) => Some(parse_datetime(&v, "git_merged_at")?),
        None => None,
    };
    let git_merge_commit = take("git_merge_commit").as_ref().and_then(as_string);

    // Whatever is left is unknown. Preserve scalar values round-trip; drop
    // nested structures with a warning (§4.1).
    let mut extra = BTreeMap::new();
    for (key, value) in map {
        let Some(key) = as_string(&key) else { continue };
        match as_string(&value) {
            Some(s) => {
                extra.insert(key, s);
            }
            None => {
                tracing::warn!(key = %key, "dropping unknown non-scalar front-matter key");
            }
        }
    }

    Ok(ParsedBean {
        title,
        status,
        bean_type,
        priority,
        tags,
        created_at,
        updated_at,
        parent,
        blocking,
        duplicates,
        related,
        git: GitMetadata {
            branch: git_branch,
            created_at: git_created_at,
            merged_at: git_merged_at,
            merge_commit: git_merge_commit,
        },
        body: body.to_string(),
        extra,
    })
}

/// Render a bean back to its on-disk representation. `id`/`slug` are not
/// written — the filename alone carries identity.
#[must_use]
pub fn render(bean: &crate::model::Bean) -> String {
    let mut map = serde_yaml::Mapping::new();
    let mut insert = |key: &str, value: Value| {
        map.insert(Value::String(key.to_string()), value);
    };

    insert("title", Value::String(bean.title.clone()));
    insert("status", Value::String(bean.status.as_str().to_string()));
    insert("type", Value::String(bean.bean_type.as_str().to_string()));
    insert("priority", Value::String(bean.priority.as_str().to_string()));
    insert(
        "tags",
        Value::Sequence(bean.tags.iter().map(|t| Value::String(t.clone())).collect()),
    );
    insert("created_at", Value::String(bean.created_at.to_rfc3339()));
    insert("updated_at", Value::String(bean.updated_at.to_rfc3339()));

    if let Some(parent) = &bean.parent {
        insert("parent", Value::String(parent.to_string()));
    }
    if !bean.blocking.is_empty() {
        insert(
            "blocking",
            Value::Sequence(bean.blocking.iter().map(|id| Value::String(id.to_string())).collect()),
        );
    }
    if !bean.duplicates.is_empty() {
        insert(
            "duplicates",
            Value::Sequence(
                bean.duplicates
                    .iter()
                    .map(|id| Value::String(id.to_string()))
                    .collect(),
            ),
        );
    }
    if !bean.related.is_empty() {
        insert(
            "related",
            Value::Sequence(bean.related.iter().map(|id| Value::String(id.to_string())).collect()),
        );
    }

    if let Some(branch) = &bean.git.branch {
        insert("git_branch", Value::String(branch.clone()));
    }
    if let Some(created) = bean.git.created_at {
        insert("git_created_at", Value::String(created.to_rfc3339()));
    }
    if let Some(merged) = bean.git.merged_at {
        insert("git_merged_at", Value::String(merged.to_rfc3339()));
    }
    if let Some(commit) = &bean.git.merge_commit {
        insert("git_merge_commit", Value::String(commit.clone()));
    }

    for (key, value) in &bean.extra {
        if !map.contains_key(Value::String(key.clone())) {
            insert(key, Value::String(value.clone()));
        }
    }

    let yaml = serde_yaml::to_string(&Value::Mapping(map)).unwrap_or_default();
    format!("---\n{yaml}---\n{}", bean.body)
}
