use crate::error::AppError;
use crate::models::backup_config::{BackupResult, BackupStatus, UpdateBackupSettings};
use crate::services::md_backup::BackupError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/settings", post(save_settings))
        .route("/export", post(export))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<BackupStatus>, AppError> {
    let scheduler = state.scheduler.clone();
    let status = tokio::task::spawn_blocking(move || scheduler.status())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(Json(status))
}

async fn save_settings(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UpdateBackupSettings>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(body) = body?;
    state.scheduler.set_settings(body).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Manual backup. Precondition failures come back as `{ok:false, error}`.
async fn export(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    match state.scheduler.run_now().await {
        Ok(result) => Ok(Json::<BackupResult>(result).into_response()),
        Err(e @ (BackupError::TargetMissing | BackupError::TargetNotWritable)) => {
            tracing::warn!(error = %e, "Manual backup rejected");
            Ok((
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "ok": false, "error": e.to_string() })),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::routes::create_router;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(root: &TempDir) -> (axum::Router, Arc<AppState>) {
        let config = AppConfig {
            port: 0,
            config_path: root.path().join("config.json"),
            agents_dir: root.path().join("agents"),
            log_dir: root.path().join("logs"),
            log_prefix: "gw".into(),
            static_dir: root.path().join("static"),
            log_level: "info".into(),
        };
        let state = Arc::new(AppState::new(config));
        (create_router(state.clone()), state)
    }

    async fn call(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_status_defaults() {
        let root = TempDir::new().unwrap();
        let (app, _) = app(&root);
        let (status, body) = call(app, "GET", "/api/md-backup/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "path": "", "enabled": false, "interval_minutes": 60, "last_backup": null, "last_result": null })
        );
    }

    #[tokio::test]
    async fn test_settings_reject_missing_path() {
        let root = TempDir::new().unwrap();
        let (app, _) = app(&root);
        let missing = root.path().join("nope").to_string_lossy().into_owned();
        let (status, body) = call(app, "POST", "/api/md-backup/settings", Some(json!({ "path": missing }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], format!("Path does not exist: {missing}"));
    }

    #[tokio::test]
    async fn test_settings_reject_mistyped_body_as_json() {
        let root = TempDir::new().unwrap();
        let (app, state) = app(&root);
        let (status, body) = call(
            app,
            "POST",
            "/api/md-backup/settings",
            Some(json!({ "interval_minutes": "30" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("interval_minutes"));
        assert_eq!(state.store.read(), json!({}));
    }

    #[tokio::test]
    async fn test_export_without_path() {
        let root = TempDir::new().unwrap();
        let (app, _) = app(&root);
        let (status, body) = call(app, "POST", "/api/md-backup/export", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No backup path configured");
    }

    #[tokio::test]
    async fn test_export_missing_target_reports_ok_false() {
        let root = TempDir::new().unwrap();
        let (app, state) = app(&root);
        state
            .store
            .write(&json!({ "md_backup": { "path": "/nonexistent/backups", "enabled": true } }))
            .unwrap();

        let (status, body) = call(app, "POST", "/api/md-backup/export", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "ok": false, "error": "Target path does not exist" }));
        assert!(state.store.backup_config().last_backup.is_none());
    }

    #[tokio::test]
    async fn test_settings_then_export() {
        let root = TempDir::new().unwrap();
        let (app, state) = app(&root);
        fs::create_dir_all(root.path().join("out")).unwrap();
        fs::create_dir_all(root.path().join("agents/main/agent")).unwrap();
        fs::write(root.path().join("agents/main/agent/SOUL.md"), "soul").unwrap();
        state.store.write(&json!({ "agents": { "list": [{ "id": "main" }] } })).unwrap();

        let out = root.path().join("out").to_string_lossy().into_owned();
        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/md-backup/settings",
            Some(json!({ "path": out, "enabled": true, "interval_minutes": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        assert!(state.scheduler.is_armed());

        let (status, body) = call(app.clone(), "POST", "/api/md-backup/export", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["files_copied"], 1);
        assert_eq!(body["agents"], json!(["main"]));

        let (_, status_body) = call(app, "GET", "/api/md-backup/status", None).await;
        assert_eq!(status_body["last_result"], json!({ "files_copied": 1, "agents": ["main"], "ok": true }));
        assert_eq!(status_body["interval_minutes"], 5);

        state.scheduler.shutdown();
    }
}
