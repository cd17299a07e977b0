//! Domain entities - Core business objects with no external dependencies

pub mod action;
pub mod command;
pub mod ids;
pub mod module;

pub use action::{DeferredAction, Mute, Reminder};
pub use command::{CommandIndex, CommandSpec, CommandState};
pub use ids::{ChannelId, GuildId, ReminderId, RoleId, UserId};
pub use module::{HelpEntry, LoadState, ModuleInfo, ModuleRecord, UsageProvider};
