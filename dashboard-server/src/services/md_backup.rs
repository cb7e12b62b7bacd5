use crate::config::BACKUP_EXTENSION;
use crate::fs::{metadata, walker};
use crate::models::backup_config::BackupResult;
use crate::store::ConfigStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const WRITE_PROBE_NAME: &str = ".dashboard_write_test";

#[derive(thiserror::Error, Debug)]
pub enum BackupError {
    #[error("Target path does not exist")]
    TargetMissing,

    #[error("Target path is not writable")]
    TargetNotWritable,

    #[error("No backup path configured")]
    NoPathConfigured,

    #[error("{0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Check that `dir` accepts new files by creating and removing a probe.
pub fn probe_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(WRITE_PROBE_NAME);
    std::fs::write(&probe, b"test")?;
    std::fs::remove_file(&probe)
}

/// Copies every agent's profile files into `<target>/agents/<id>/...`.
#[derive(Clone)]
pub struct MdBackup {
    store: Arc<ConfigStore>,
    agents_dir: PathBuf,
}

impl MdBackup {
    pub fn new(store: Arc<ConfigStore>, agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            agents_dir: agents_dir.into(),
        }
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Run one backup into `target`. Blocking.
    ///
    /// Precondition failures return an error and leave the config document
    /// alone. Otherwise per-file failures are collected into the result and
    /// `last_backup`/`last_result` are always written back.
    pub fn run(&self, target: &Path) -> Result<BackupResult, BackupError> {
        if !target.exists() {
            return Err(BackupError::TargetMissing);
        }
        if probe_writable(target).is_err() {
            return Err(BackupError::TargetNotWritable);
        }

        let mut files_copied = 0;
        let mut agents = Vec::new();
        let mut errors = Vec::new();

        for agent in self.store.agent_roster(&self.agents_dir) {
            if !agent.source_dir.is_dir() {
                continue;
            }

            let dest_root = target.join("agents").join(&agent.id);
            let (files, failures) = walker::walk_by_extension(&agent.source_dir, BACKUP_EXTENSION);

            for failure in failures {
                errors.push(format!(
                    "{}/{}: {}",
                    agent.id,
                    failure.relative_path.display(),
                    failure.error
                ));
            }

            let mut agent_copied = 0;
            for file in files {
                let dest = dest_root.join(&file.relative_path);
                match metadata::copy_preserving_times(&file.path, &dest) {
                    Ok(_) => agent_copied += 1,
                    Err(e) => errors.push(format!("{}/{}: {}", agent.id, file.relative_path.display(), e)),
                }
            }

            if agent_copied > 0 {
                files_copied += agent_copied;
                agents.push(agent.id);
            }
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        let result = BackupResult::new(files_copied, agents, errors, timestamp);

        let summary = result.summary();
        let stamp = result.timestamp.clone();
        self.store.update_backup_config(move |cfg| {
            cfg.last_backup = Some(stamp);
            cfg.last_result = Some(summary);
        })?;

        tracing::info!(
            path = %target.display(),
            files_copied = result.files_copied,
            agents = result.agents.len(),
            errors = result.errors.len(),
            "Profile backup finished"
        );
        Ok(result)
    }
}
