//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: Command state machine and the deferred-action schedulers
//! - Errors: Domain-specific errors
//! - Mentions: Mention markup scrubbing for outgoing text

pub mod errors;
pub mod mentions;
pub mod services;
