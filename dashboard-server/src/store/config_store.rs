//! JSON configuration document shared with the rest of the dashboard.
//!
//! Only the `md_backup` section and the agent roster are interpreted here;
//! everything else in the document is passed through untouched.

use crate::models::backup_config::BackupConfig;
use anyhow::Context;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const BACKUP_SECTION: &str = "md_backup";

/// An agent whose profile files take part in backups.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSource {
    pub id: String,
    pub source_dir: PathBuf,
}

pub struct ConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document. A missing or unreadable file is an empty object.
    pub fn read(&self) -> Value {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to read config document");
                }
                return Value::Object(Map::new());
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(v @ Value::Object(_)) => v,
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "Config document is not a JSON object");
                Value::Object(Map::new())
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to parse config document");
                Value::Object(Map::new())
            }
        }
    }

    /// Replace the whole document. Written to a sibling temp file and renamed
    /// so concurrent readers never see a torn document.
    pub fn write(&self, doc: &Value) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, serde_json::to_string_pretty(doc)?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    /// Read-modify-write, serialized against other in-process writers. If `f`
    /// fails the document on disk is left as it was.
    pub fn update<F>(&self, f: F) -> anyhow::Result<Value>
    where
        F: FnOnce(&mut Map<String, Value>) -> anyhow::Result<()>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut doc = self.read();
        if let Value::Object(map) = &mut doc {
            f(map)?;
        }
        self.write(&doc)?;
        Ok(doc)
    }

    #[cfg(test)]
    pub(crate) fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn backup_config(&self) -> BackupConfig {
        backup_config_of(&self.read())
    }

    /// Modify the `md_backup` section. A section that is present but does not
    /// match [`BackupConfig`] is an error, so a hand-edited value is never
    /// overwritten with defaults.
    pub fn update_backup_config<F>(&self, f: F) -> anyhow::Result<BackupConfig>
    where
        F: FnOnce(&mut BackupConfig),
    {
        let mut updated = None;
        self.update(|doc| {
            let mut cfg = match doc.get(BACKUP_SECTION) {
                None | Some(Value::Null) => BackupConfig::default(),
                Some(section) => serde_json::from_value::<BackupConfig>(section.clone())
                    .with_context(|| format!("{BACKUP_SECTION} section is malformed"))?,
            };
            f(&mut cfg);
            doc.insert(BACKUP_SECTION.to_string(), serde_json::to_value(&cfg)?);
            updated = Some(cfg);
            Ok(())
        })?;
        Ok(updated.unwrap_or_default())
    }

    /// Agents listed under `agents.list`, in document order.
    pub fn agent_roster(&self, agents_dir: &Path) -> Vec<AgentSource> {
        roster_of(&self.read(), agents_dir)
    }
}

fn backup_config_of(doc: &Value) -> BackupConfig {
    match doc.get(BACKUP_SECTION) {
        Some(section) => serde_json::from_value(section.clone()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Malformed md_backup section, using defaults");
            BackupConfig::default()
        }),
        None => BackupConfig::default(),
    }
}

fn roster_of(doc: &Value, agents_dir: &Path) -> Vec<AgentSource> {
    doc.pointer("/agents/list")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| a.get("id").and_then(Value::as_str))
                .map(|id| AgentSource {
                    id: id.to_string(),
                    source_dir: agents_dir.join(id).join("agent"),
                })
                .collect()
        })
        .unwrap_or_default()
}
