use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_MESSAGE_CHARS: usize = 600;
const DEFAULT_LEVEL: &str = "INFO";

/// One structured gateway log line as shown on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub subsystem: String,
    pub message: String,
}

/// Parse one raw log line. Returns `None` for blank lines and anything
/// that is not a JSON object.
pub fn parse_line(line: &str) -> Option<LogEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: Value = serde_json::from_str(line).ok()?;
    let entry = value.as_object()?;
    let meta = entry.get("_meta").and_then(Value::as_object);
    let meta_str = |key: &str| meta.and_then(|m| m.get(key)).and_then(Value::as_str);

    let message = match entry.get("0") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    let time = entry
        .get("time")
        .and_then(Value::as_str)
        .or_else(|| meta_str("date"))
        .unwrap_or_default();

    Some(LogEntry {
        time: time.to_string(),
        level: meta_str("logLevelName").unwrap_or(DEFAULT_LEVEL).to_string(),
        subsystem: meta_str("name").unwrap_or_default().to_string(),
        message: message.chars().take(MAX_MESSAGE_CHARS).collect(),
    })
}
