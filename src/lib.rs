//! stevedore-bot - a bot core with hot-swappable feature modules
//!
//! Layered as domain (entities, seam traits, pure parsing), application
//! (errors, state machine, schedulers), infrastructure (config, database,
//! directory adapters) and modules (the feature packages and their manager).

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod modules;
