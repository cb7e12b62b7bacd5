use crate::models::backup_config::{BackupConfig, BackupResult, BackupStatus, UpdateBackupSettings};
use crate::services::md_backup::{probe_writable, BackupError, MdBackup};
use crate::store::ConfigStore;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

struct ArmedTimer {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct TimerSlot {
    next_generation: u64,
    applied_ticket: u64,
    armed: Option<ArmedTimer>,
}

impl TimerSlot {
    /// Settings are read before the slot is locked, so two reschedules can
    /// reach it out of order. Only the newest read may rearm.
    fn claim(&mut self, ticket: u64) -> bool {
        if ticket < self.applied_ticket {
            return false;
        }
        self.applied_ticket = ticket;
        true
    }
}

/// Owns the single auto-backup timer and the run-lock shared by scheduled
/// and manual runs.
pub struct BackupScheduler {
    backup: MdBackup,
    run_lock: Arc<tokio::sync::Mutex<()>>,
    timer: Mutex<TimerSlot>,
    reschedule_tickets: AtomicU64,
    shutdown: CancellationToken,
    completed_runs: Arc<AtomicU64>,
}

impl BackupScheduler {
    pub fn new(backup: MdBackup) -> Arc<Self> {
        Arc::new(Self {
            backup,
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
            timer: Mutex::new(TimerSlot::default()),
            reschedule_tickets: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
            completed_runs: Arc::new(AtomicU64::new(0)),
        })
    }

    fn store(&self) -> &ConfigStore {
        self.backup.store()
    }

    fn slot(&self) -> MutexGuard<'_, TimerSlot> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Arm the timer from the stored settings. Called once at startup.
    pub fn init_schedule(self: &Arc<Self>) {
        self.reschedule();
    }

    pub fn is_armed(&self) -> bool {
        self.slot().armed.is_some()
    }

    /// Number of runs (scheduled or manual) that got past their preconditions.
    pub fn completed_runs(&self) -> u64 {
        self.completed_runs.load(Ordering::Relaxed)
    }

    /// Cancel any outstanding timer, then arm a new one if the stored
    /// settings ask for it. At most one timer exists after this returns.
    pub fn reschedule(self: &Arc<Self>) {
        let ticket = self.reschedule_tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let cfg = self.store().backup_config();

        let mut slot = self.slot();
        if !slot.claim(ticket) {
            return;
        }
        if let Some(old) = slot.armed.take() {
            old.cancel.cancel();
        }
        if self.shutdown.is_cancelled() {
            return;
        }
        if !cfg.is_schedulable() {
            tracing::info!("Auto-backup disabled, no timer armed");
            return;
        }

        slot.next_generation += 1;
        let generation = slot.next_generation;
        let cancel = self.shutdown.child_token();
        slot.armed = Some(ArmedTimer {
            generation,
            cancel: cancel.clone(),
        });
        drop(slot);

        let delay = cfg.interval();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_timer(generation, cancel, delay).await;
        });
        tracing::info!(path = %cfg.path, interval_minutes = cfg.interval_minutes, "Auto-backup armed");
    }

    async fn run_timer(self: Arc<Self>, generation: u64, cancel: CancellationToken, delay: Duration) {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        {
            let mut slot = self.slot();
            if slot.armed.as_ref().map(|t| t.generation) != Some(generation) {
                return;
            }
            slot.armed = None;
        }

        match self.tick().await {
            Ok(Some(result)) => {
                tracing::debug!(ok = result.ok, files_copied = result.files_copied, "Scheduled backup done")
            }
            Ok(None) => tracing::debug!("Scheduled backup skipped, settings changed"),
            Err(e) => tracing::error!(error = %e, "Scheduled backup failed"),
        }

        self.reschedule();
    }

    /// One timer-triggered run. Settings are re-read under the run-lock so a
    /// run that was disabled while waiting for the lock does not happen.
    pub async fn tick(&self) -> Result<Option<BackupResult>, BackupError> {
        let guard = self.lock_runs().await;
        let cfg = self.store().backup_config();
        if !cfg.is_schedulable() {
            return Ok(None);
        }
        tracing::info!(path = %cfg.path, "Scheduled backup started");
        self.execute(guard, PathBuf::from(cfg.path)).await.map(Some)
    }

    /// Manual backup into the configured path, serialized with scheduled runs.
    pub async fn run_now(&self) -> Result<BackupResult, BackupError> {
        let path = self.store().backup_config().path;
        if path.is_empty() {
            return Err(BackupError::NoPathConfigured);
        }

        let guard = self.lock_runs().await;
        tracing::info!(path = %path, "Manual backup started");
        self.execute(guard, PathBuf::from(path)).await
    }

    async fn lock_runs(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.run_lock).lock_owned().await
    }

    /// The guard moves into the blocking task, so the run-lock stays held
    /// until the copy finishes even if the caller stops waiting.
    async fn execute(&self, guard: OwnedMutexGuard<()>, target: PathBuf) -> Result<BackupResult, BackupError> {
        let backup = self.backup.clone();
        let completed_runs = Arc::clone(&self.completed_runs);
        tokio::task::spawn_blocking(move || -> Result<BackupResult, BackupError> {
            let _guard = guard;
            let result = backup.run(&target)?;
            completed_runs.fetch_add(1, Ordering::Relaxed);
            Ok(result)
        })
        .await
        .map_err(|e| BackupError::Internal(anyhow::anyhow!(e)))?
    }

    pub fn status(&self) -> BackupStatus {
        self.store().backup_config().into()
    }

    /// Validate and persist a partial settings update, then re-evaluate the
    /// timer before returning.
    pub async fn set_settings(self: &Arc<Self>, update: UpdateBackupSettings) -> Result<BackupConfig, BackupError> {
        let backup = self.backup.clone();
        let cfg = tokio::task::spawn_blocking(move || apply_settings(backup.store(), update))
            .await
            .map_err(|e| BackupError::Internal(anyhow::anyhow!(e)))??;
        self.reschedule();
        Ok(cfg)
    }

    /// Disarm for good; later `reschedule` calls are no-ops.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(old) = self.slot().armed.take() {
            old.cancel.cancel();
        }
        tracing::info!("Backup scheduler stopped");
    }
}

fn validate_target(path: &str) -> Result<(), BackupError> {
    let target = Path::new(path);
    if !target.exists() {
        return Err(BackupError::InvalidSettings(format!("Path does not exist: {path}")));
    }
    if probe_writable(target).is_err() {
        return Err(BackupError::InvalidSettings(format!("Path is not writable: {path}")));
    }
    Ok(())
}

fn apply_settings(store: &ConfigStore, update: UpdateBackupSettings) -> Result<BackupConfig, BackupError> {
    let path = match update.path {
        Some(p) => {
            let p = p.trim().to_string();
            if !p.is_empty() {
                validate_target(&p)?;
            }
            Some(p)
        }
        None => None,
    };

    let interval = match update.interval_minutes {
        Some(m) => Some(u32::try_from(m).ok().filter(|m| *m > 0).ok_or_else(|| {
            BackupError::InvalidSettings("interval_minutes must be a positive integer".into())
        })?),
        None => None,
    };

    let current = store.backup_config();
    let enabled = update.enabled.unwrap_or(current.enabled);
    let resulting_path = path.as_deref().unwrap_or(&current.path);
    if enabled && resulting_path.is_empty() {
        return Err(BackupError::InvalidSettings(
            "A backup path is required to enable auto-backup".into(),
        ));
    }

    let cfg = store.update_backup_config(|cfg| {
        if let Some(p) = path {
            cfg.path = p;
        }
        if let Some(enabled) = update.enabled {
            cfg.enabled = enabled;
        }
        if let Some(m) = interval {
            cfg.interval_minutes = m;
        }
    })?;
    Ok(cfg)
}
