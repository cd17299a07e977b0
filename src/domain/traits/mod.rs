//! Domain traits - Abstractions for infrastructure implementations

pub mod directory;
pub mod store;

pub use directory::{ChannelRef, GuildRef, MemberRef, PlatformDirectory, RoleRef, UserRef};
pub use store::ActionStore;
