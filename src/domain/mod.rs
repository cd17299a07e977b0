//! Domain layer - Core business logic with no external dependencies
//!
//! This layer contains:
//! - Entities: Core business objects (commands, modules, deferred actions)
//! - Traits: Abstractions for infrastructure (PlatformDirectory, ActionStore)
//! - Duration: Compact duration notation parsing

pub mod duration;
pub mod entities;
pub mod traits;
