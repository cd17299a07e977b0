//! Application services - state machine and scheduler building blocks

pub mod action_queue;
pub mod command_states;
pub mod mute_service;
pub mod reminder_service;
pub mod sweeper;

pub use action_queue::ActionQueue;
pub use command_states::CommandStateService;
pub use mute_service::MuteService;
pub use reminder_service::ReminderService;
pub use sweeper::{spawn_sweeper, Sweeper};
