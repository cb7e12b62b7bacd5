//! Operator dashboard backend.
//!
//! Serves the backup controls for agent profile files (scheduled and manual
//! copies into a mirror directory) and a live tail of the gateway's daily
//! log over server-sent events.

pub mod config;
pub mod error;
pub mod fs;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
