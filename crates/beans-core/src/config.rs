//! `.beans/config.yaml` loading.
//!
//! Every field defaults via `#[serde(default)]` so a missing file or a file
//! missing individual keys falls back to the documented defaults (§3, §6).
//! Unknown top-level keys are rejected to catch typos early.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    pub enabled: bool,
    pub auto_create_branch: bool,
    /// Empty means auto-detect (`origin/HEAD` → `main` → `master` → first local branch).
    pub base_branch: String,
    pub auto_commit_beans: bool,
    pub require_merge: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            enabled: true,
            auto_create_branch: true,
            base_branch: String::new(),
            auto_commit_beans: true,
            require_merge: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BeansConfig {
    pub prefix: String,
    pub id_length: usize,
    pub default_status: String,
    pub default_type: String,
    pub git: GitConfig,
}

impl Default for BeansConfig {
    fn default() -> Self {
        BeansConfig {
            prefix: "beans-".to_string(),
            id_length: 4,
            default_status: "todo".to_string(),
            default_type: "task".to_string(),
            git: GitConfig::default(),
        }
    }
}

impl BeansConfig {
    /// Total length of a generated id: `prefix.len() + id_length`. Used to
    /// split `{id}[-{slug}]` filenames back into their parts.
    #[must_use]
    pub fn id_total_len(&self) -> usize {
        self.prefix.len() + self.id_length
    }

    /// Load `.beans/config.yaml`. A missing file is not an error — it
    /// produces `Self::default()`, matching the spec's "configuration file
    /// (optional)" wording.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_path_buf()),
                    message: e.to_string(),
                })
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_path_buf());
            e
        })
    }

    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ConfigFile {
            #[serde(default)]
            beans: BeansConfig,
        }

        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let file: ConfigFile = serde_yaml::from_str(yaml).map_err(|e| {
            let location = e
                .location()
                .map(|l| format!("line {}: ", l.line()))
                .unwrap_or_default();
            ConfigError {
                path: None,
                message: format!("{location}{e}"),
            }
        })?;
        Ok(file.beans)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}
