use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;

/// The `md_backup` section of the configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupConfig {
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<LastResult>,

    /// Keys written by other tools; carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_interval_minutes() -> u32 {
    DEFAULT_INTERVAL_MINUTES
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            enabled: false,
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
            last_backup: None,
            last_result: None,
            extra: Map::new(),
        }
    }
}

impl BackupConfig {
    /// Whether the scheduler should keep a timer armed for this config.
    pub fn is_schedulable(&self) -> bool {
        self.enabled && !self.path.is_empty() && self.interval_minutes > 0
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }
}

/// Reduced outcome persisted after every run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastResult {
    pub files_copied: usize,
    pub agents: Vec<String>,
    pub ok: bool,
}

/// Outcome of one backup run that got past its preconditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupResult {
    pub ok: bool,
    pub files_copied: usize,
    /// Agents with at least one file copied, in roster order.
    pub agents: Vec<String>,
    /// `"<agent-id>/<relative-path>: <cause>"` per failed file.
    pub errors: Vec<String>,
    pub timestamp: String,
}

impl BackupResult {
    pub fn new(files_copied: usize, agents: Vec<String>, errors: Vec<String>, timestamp: String) -> Self {
        Self {
            ok: errors.is_empty(),
            files_copied,
            agents,
            errors,
            timestamp,
        }
    }

    pub fn summary(&self) -> LastResult {
        LastResult {
            files_copied: self.files_copied,
            agents: self.agents.clone(),
            ok: self.ok,
        }
    }
}

/// Read-only view returned by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BackupStatus {
    pub path: String,
    pub enabled: bool,
    pub interval_minutes: u32,
    pub last_backup: Option<String>,
    pub last_result: Option<LastResult>,
}

impl From<BackupConfig> for BackupStatus {
    fn from(c: BackupConfig) -> Self {
        Self {
            path: c.path,
            enabled: c.enabled,
            interval_minutes: c.interval_minutes,
            last_backup: c.last_backup,
            last_result: c.last_result,
        }
    }
}

/// Partial settings update; absent fields are left as stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBackupSettings {
    pub path: Option<String>,
    pub enabled: Option<bool>,
    pub interval_minutes: Option<i64>,
}
