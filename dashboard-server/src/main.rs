use clap::Parser;
use dashboard_server::config::{AppConfig, Args};
use dashboard_server::routes;
use dashboard_server::state::AppState;
use dashboard_server::utils;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().with_args(Args::parse());
    utils::logger::init(&config.log_level)?;

    tracing::info!(
        "Starting dashboard-server v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        config.port
    );
    tracing::info!(
        config = %config.config_path.display(),
        agents = %config.agents_dir.display(),
        logs = %config.log_dir.display(),
        "Using paths"
    );

    let state = Arc::new(AppState::new(config.clone()));
    state.scheduler.init_schedule();

    let app = routes::create_router(state.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await?;

    tracing::info!("Shutting down...");
    state.scheduler.shutdown();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    cancel.cancel();
}
