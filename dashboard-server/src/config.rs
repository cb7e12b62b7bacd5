use clap::Parser;
use std::path::PathBuf;

/// File extension of the agent profile files picked up by the backup.
pub const BACKUP_EXTENSION: &str = "md";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Port to listen on (overrides DASHBOARD_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to the JSON configuration document
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub config_path: PathBuf,
    pub agents_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_prefix: String,
    pub static_dir: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let state_root = home.join(".openclaw");

        Self {
            port: std::env::var("DASHBOARD_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7842),
            config_path: std::env::var("DASHBOARD_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| state_root.join("openclaw.json")),
            agents_dir: std::env::var("DASHBOARD_AGENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| state_root.join("agents")),
            log_dir: PathBuf::from(
                std::env::var("DASHBOARD_LOG_DIR").unwrap_or_else(|_| "/tmp/openclaw".into()),
            ),
            log_prefix: std::env::var("DASHBOARD_LOG_PREFIX").unwrap_or_else(|_| "openclaw".into()),
            static_dir: PathBuf::from(
                std::env::var("DASHBOARD_STATIC_DIR").unwrap_or_else(|_| "static".into()),
            ),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_args(mut self, args: Args) -> Self {
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(config) = args.config {
            self.config_path = config;
        }
        if let Some(level) = args.log_level {
            self.log_level = level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            port: 7842,
            config_path: PathBuf::from("/etc/dash.json"),
            agents_dir: PathBuf::from("/agents"),
            log_dir: PathBuf::from("/logs"),
            log_prefix: "gw".into(),
            static_dir: PathBuf::from("static"),
            log_level: "info".into(),
        }
    }

    #[test]
    fn test_args_override_selected_fields() {
        let args = Args::parse_from(["dashboard-server", "--port", "9000", "-l", "debug"]);
        let cfg = base().with_args(args);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.config_path, PathBuf::from("/etc/dash.json"));
    }

    #[test]
    fn test_no_args_keeps_env_values() {
        let args = Args::parse_from(["dashboard-server"]);
        let cfg = base().with_args(args);
        assert_eq!(cfg.port, 7842);
        assert_eq!(cfg.log_prefix, "gw");
    }
}
