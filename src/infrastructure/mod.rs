//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Database: SQLite persistence
//! - Directory: Platform directory adapters

pub mod config;
pub mod database;
pub mod directory;
