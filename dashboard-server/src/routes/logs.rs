use crate::error::AppError;
use crate::models::log_entry::LogEntry;
use crate::services::log_tail::{self, LogFiles};
use crate::state::AppState;
use axum::extract::State;
use axum::http::header::{HeaderName, HeaderValue, CACHE_CONTROL};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/recent", get(recent))
}

async fn recent(State(state): State<Arc<AppState>>) -> Result<Json<Vec<LogEntry>>, AppError> {
    let path = state.logs.today();
    let entries = tokio::task::spawn_blocking(move || log_tail::recent_entries(&path))
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(Json(entries))
}

/// GET /events - live log entries as server-sent events
pub async fn events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse_for(state.logs.clone(), state.shutdown.clone())
}

fn sse_for(files: LogFiles, shutdown: CancellationToken) -> impl IntoResponse {
    let rx = log_tail::spawn_tail(files, shutdown);
    // Dropping this stream (client gone) drops `rx`, which ends the tail task.
    let events = stream::unfold(rx, |mut rx| async move {
        let entry = rx.recv().await?;
        Some((Event::default().json_data(&entry), rx))
    });

    (
        [
            (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no")),
        ],
        Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures_util::StreamExt;
    use std::io::Write;
    use tempfile::TempDir;

    fn line(msg: &str) -> String {
        serde_json::json!({ "0": msg, "_meta": { "logLevelName": "INFO", "name": "core" } }).to_string() + "\n"
    }

    #[tokio::test]
    async fn test_recent_reads_today() {
        let dir = TempDir::new().unwrap();
        let files = LogFiles::new(dir.path(), "gw");
        std::fs::write(files.today(), format!("{}junk\n{}", line("one"), line("two"))).unwrap();

        let path = files.today();
        let entries = tokio::task::spawn_blocking(move || log_tail::recent_entries(&path))
            .await
            .unwrap();
        let messages: Vec<_> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_event_stream_framing() {
        let dir = TempDir::new().unwrap();
        let files = LogFiles::new(dir.path(), "gw");
        let today = files.today();
        std::fs::write(&today, line("history")).unwrap();

        let res = sse_for(files, CancellationToken::new()).into_response();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "text/event-stream");
        assert_eq!(res.headers()["cache-control"], "no-cache");
        assert_eq!(res.headers()["x-accel-buffering"], "no");

        std::fs::OpenOptions::new()
            .append(true)
            .open(&today)
            .unwrap()
            .write_all(line("boot complete").as_bytes())
            .unwrap();

        let mut body = res.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.starts_with("data: {"), "unexpected frame: {text}");
        assert!(text.ends_with("\n\n"));
        assert!(text.contains("\"message\":\"boot complete\""));
        assert!(!text.contains("history"));
    }

    #[tokio::test]
    async fn test_events_route_is_mounted() {
        let dir = TempDir::new().unwrap();
        let config = crate::config::AppConfig {
            port: 0,
            config_path: dir.path().join("config.json"),
            agents_dir: dir.path().join("agents"),
            log_dir: dir.path().to_path_buf(),
            log_prefix: "gw".into(),
            static_dir: dir.path().join("static"),
            log_level: "info".into(),
        };
        let app = crate::routes::create_router(Arc::new(AppState::new(config)));
        let res = tower::ServiceExt::oneshot(app, Request::get("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["content-type"], "text/event-stream");
    }
}
