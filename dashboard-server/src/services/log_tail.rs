//! Live tail of the gateway's daily log file.
//!
//! Each connected client gets its own [`TailCursor`] and polling task. The
//! cursor starts at the end of today's file, so only lines appended after
//! the client connected are delivered. On day rollover the cursor jumps to
//! the start of the new file; bytes that land in the old file during that
//! same tick are not delivered.

use crate::models::log_entry::{parse_line, LogEntry};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const RECENT_LIMIT: usize = 100;
const CHANNEL_CAPACITY: usize = 256;

/// Resolves the per-day log file names.
#[derive(Debug, Clone)]
pub struct LogFiles {
    dir: PathBuf,
    prefix: String,
}

impl LogFiles {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn for_date(&self, date: chrono::NaiveDate) -> PathBuf {
        self.dir.join(format!("{}-{}.log", self.prefix, date.format("%Y-%m-%d")))
    }

    pub fn today(&self) -> PathBuf {
        self.for_date(chrono::Local::now().date_naive())
    }
}

/// How much of the active log file has already been delivered.
#[derive(Debug)]
pub struct TailCursor {
    active_log_path: PathBuf,
    byte_offset: u64,
}

impl TailCursor {
    /// Start at the current end of `path` (or 0 if it does not exist yet).
    pub fn open(path: PathBuf) -> Self {
        let byte_offset = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            active_log_path: path,
            byte_offset,
        }
    }

    pub fn active_log_path(&self) -> &Path {
        &self.active_log_path
    }

    pub fn byte_offset(&self) -> u64 {
        self.byte_offset
    }

    /// One poll: follow a rollover to `today`, read whatever was appended
    /// since the last call and parse it. Malformed lines are dropped.
    pub fn advance(&mut self, today: PathBuf) -> std::io::Result<Vec<LogEntry>> {
        if today != self.active_log_path {
            tracing::debug!(from = %self.active_log_path.display(), to = %today.display(), "Log rollover");
            self.active_log_path = today;
            self.byte_offset = 0;
        }

        let len = std::fs::metadata(&self.active_log_path)?.len();
        if len < self.byte_offset {
            // Truncated or replaced in place; start over.
            self.byte_offset = 0;
        }
        if len == self.byte_offset {
            return Ok(Vec::new());
        }

        let mut file = std::fs::File::open(&self.active_log_path)?;
        file.seek(SeekFrom::Start(self.byte_offset))?;
        let mut buf = Vec::with_capacity((len - self.byte_offset) as usize);
        file.take(len - self.byte_offset).read_to_end(&mut buf)?;
        self.byte_offset += buf.len() as u64;

        Ok(String::from_utf8_lossy(&buf).lines().filter_map(parse_line).collect())
    }
}

/// Start a polling task for one client and return the receiving end.
/// The task stops as soon as the receiver is dropped or `shutdown` fires.
pub fn spawn_tail(files: LogFiles, shutdown: CancellationToken) -> mpsc::Receiver<LogEntry> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let cursor = TailCursor::open(files.today());
    tokio::spawn(run_tail(files, cursor, tx, POLL_INTERVAL, shutdown));
    rx
}

async fn run_tail(
    files: LogFiles,
    mut cursor: TailCursor,
    tx: mpsc::Sender<LogEntry>,
    every: Duration,
    shutdown: CancellationToken,
) {
    tracing::debug!(path = %cursor.active_log_path().display(), offset = cursor.byte_offset(), "Log tail started");
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let today = files.today();
        let polled = tokio::task::spawn_blocking(move || {
            let entries = cursor.advance(today);
            (cursor, entries)
        })
        .await;

        let entries = match polled {
            Ok((c, Ok(entries))) => {
                cursor = c;
                entries
            }
            Ok((c, Err(e))) => {
                cursor = c;
                tracing::debug!(error = %e, "Log tail tick failed");
                continue;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Log tail worker panicked");
                break;
            }
        };

        for entry in entries {
            if tx.send(entry).await.is_err() {
                tracing::debug!("Log tail client gone");
                return;
            }
        }
    }
    tracing::debug!("Log tail stopped");
}

/// The last parseable entries among the final `RECENT_LIMIT` lines of `path`.
pub fn recent_entries(path: &Path) -> Vec<LogEntry> {
    let content = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => return Vec::new(),
    };
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(RECENT_LIMIT);
    lines[start..].iter().copied().filter_map(parse_line).collect()
}
