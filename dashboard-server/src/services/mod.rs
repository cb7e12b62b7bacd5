pub mod backup_scheduler;
pub mod log_tail;
pub mod md_backup;
