//! Section/key-value configuration store backed by a TOML document.
//!
//! The store keeps the parsed [`DocumentMut`] so that writing a single key back
//! (the installed version after an update) preserves the comments and layout
//! of the rest of the file.

use crate::core::{RelaunchError, Result};
use crate::utils::fs::atomic_write;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, Table, value};
use tracing::debug;

/// A configuration file loaded into memory.
///
/// `load` is asynchronous; `save` is synchronous and rewrites the whole file.
///
/// # Examples
///
/// ```rust
/// use relaunch::config::ConfigStore;
///
/// let mut store = ConfigStore::parse(
///     "launcher.toml",
///     "[launcher]\ncurrent_version = \"1.0.0\" # installed\n",
/// )
/// .unwrap();
/// store.set("launcher", "current_version", "1.0.1");
/// assert_eq!(store.get("launcher", "current_version").as_deref(), Some("1.0.1"));
/// assert!(store.to_string().contains("# installed"));
/// ```
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    doc: DocumentMut,
}

impl ConfigStore {
    /// Reads and parses the file at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            RelaunchError::ConfigError {
                message: format!("cannot read {}: {e}", path.display()),
            }
        })?;
        debug!(target: "config", "Loaded {}", path.display());
        Self::parse(path, &content)
    }

    /// Parses `content` as if it had been read from `path`.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let doc = content.parse::<DocumentMut>().map_err(|e| RelaunchError::ConfigError {
            message: format!("cannot parse {}: {e}", path.display()),
        })?;
        Ok(Self {
            path,
            doc,
        })
    }

    /// An empty store that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: DocumentMut::new(),
        }
    }

    /// Location the store was loaded from and saves to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a value as text. Strings come back unquoted, other scalars in
    /// their TOML form.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        let item = self.doc.get(section)?.get(key)?;
        let value = item.as_value()?;
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => Some(value.to_string().trim().to_string()),
        }
    }

    /// Sets a string value, creating the section when needed.
    ///
    /// An existing value keeps its surrounding whitespace and trailing comment.
    pub fn set(&mut self, section: &str, key: &str, new_value: &str) {
        if !self.doc.contains_table(section) {
            self.doc.insert(section, Item::Table(Table::new()));
        }
        let table = &mut self.doc[section];
        match table.get_mut(key).and_then(Item::as_value_mut) {
            Some(existing) => {
                let decor = existing.decor().clone();
                *existing = new_value.into();
                *existing.decor_mut() = decor;
            }
            None => table[key] = value(new_value),
        }
    }

    /// Names of all top-level tables, in document order.
    pub fn section_names(&self) -> Vec<String> {
        self.doc
            .iter()
            .filter(|(_, item)| item.is_table_like())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Whether a section exists.
    pub fn has_section(&self, section: &str) -> bool {
        self.doc.get(section).is_some_and(Item::is_table_like)
    }

    /// Decodes a section into a typed value.
    pub fn section<T: DeserializeOwned>(&self, section: &str) -> Result<T> {
        if !self.has_section(section) {
            return Err(RelaunchError::ConfigError {
                message: format!("section [{section}] missing from {}", self.path.display()),
            });
        }
        let root: toml::Table =
            toml::from_str(&self.doc.to_string()).map_err(|e| RelaunchError::ConfigError {
                message: format!("cannot parse {}: {e}", self.path.display()),
            })?;
        let raw = root.get(section).cloned().unwrap_or(toml::Value::Table(toml::Table::new()));
        raw.try_into().map_err(|e: toml::de::Error| RelaunchError::ConfigError {
            message: format!("invalid section [{section}] in {}: {}", self.path.display(), e.message()),
        })
    }

    /// Overwrites the file with the current document.
    pub fn save(&self) -> Result<()> {
        atomic_write(&self.path, self.doc.to_string().as_bytes()).map_err(|e| {
            RelaunchError::ConfigPersistFailed {
                reason: format!("{e:#}"),
            }
        })?;
        debug!(target: "config", "Saved {}", self.path.display());
        Ok(())
    }
}

impl std::fmt::Display for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.doc)
    }
}
