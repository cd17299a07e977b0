//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Duration error: {0}")]
    Duration(#[from] DurationError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Module lifecycle errors
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("No module named `{0}` exists")]
    NotFound(String),

    #[error("Module `{0}` is already loaded")]
    AlreadyLoaded(String),

    #[error("Module `{0}` is not loaded")]
    NotLoaded(String),

    #[error("Module `{0}` is no longer available; reload canceled, the loaded version is unchanged")]
    Vanished(String),

    #[error("Something went wrong while setting up `{0}` - contact the module maintainer")]
    SetupFailed(String),

    #[error("Reloading `{0}` failed; the previously loaded version is still active")]
    ReloadFailed(String),

    #[error("Reloading `{0}` failed and the previous version could not be restored; the module is no longer loaded")]
    Removed(String),
}

/// Command registration and state errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("No command named `{0}` is registered")]
    Unknown(String),

    #[error("A command or alias named `{0}` is already registered")]
    Duplicate(String),

    #[error("Core commands cannot be disabled")]
    Protected,
}

/// Duration parsing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DurationError {
    #[error("Invalid duration: {0}")]
    InvalidFormat(String),

    #[error("Duration must be at least {min} seconds")]
    TooShort { min: i64 },

    #[error("Duration must be at most {max} seconds")]
    TooLong { max: i64 },
}

/// Deferred action scheduling errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Nothing is scheduled under that key")]
    NotScheduled,
}

/// Platform entity resolution errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Platform connection is down")]
    Offline,
}

impl DirectoryError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Delivery primitive errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Missing permission to perform the action")]
    Forbidden,

    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
