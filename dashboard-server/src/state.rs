use crate::config::AppConfig;
use crate::services::backup_scheduler::BackupScheduler;
use crate::services::log_tail::LogFiles;
use crate::services::md_backup::MdBackup;
use crate::store::ConfigStore;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<ConfigStore>,
    pub scheduler: Arc<BackupScheduler>,
    pub logs: LogFiles,
    pub started_at: Instant,
    /// Cancelled on process shutdown; ends open log streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = Arc::new(ConfigStore::new(&config.config_path));
        let backup = MdBackup::new(store.clone(), &config.agents_dir);
        Self {
            scheduler: BackupScheduler::new(backup),
            logs: LogFiles::new(&config.log_dir, &config.log_prefix),
            store,
            config,
            started_at: Instant::now(),
            shutdown: CancellationToken::new(),
        }
    }
}
