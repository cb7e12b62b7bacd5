//! File-system helpers for the profile backup.

pub mod metadata;
pub mod walker;
