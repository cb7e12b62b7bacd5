pub mod backup_config;
pub mod log_entry;
