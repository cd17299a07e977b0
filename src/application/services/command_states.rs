//! Command state service - persisted visibility/enablement per command

use std::sync::Arc;

use tracing::debug;

use crate::application::errors::StorageError;
use crate::domain::entities::CommandState;
use crate::infrastructure::database::Database;

/// Persists the 4-valued visibility/enablement state per command key.
///
/// The persisted row is the source of truth; the live command flags are a
/// cached projection that the module manager re-applies on every rebuild.
pub struct CommandStateService {
    db: Arc<Database>,
}

impl CommandStateService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Returns the persisted state for a command key, writing the default
    /// row on first inspection so every inspected command has one.
    pub fn state_of(&self, key: &str) -> Result<CommandState, StorageError> {
        match self.db.command_state(key)? {
            Some(code) => match CommandState::from_code(code) {
                Some(state) => Ok(state),
                None => {
                    // Out-of-range row, rewrite as default.
                    let state = CommandState::default();
                    self.db.set_command_state(key, state.code())?;
                    Ok(state)
                }
            },
            None => {
                let state = CommandState::default();
                self.db.set_command_state(key, state.code())?;
                Ok(state)
            }
        }
    }

    /// Recomputes the hidden bit, persists, and returns the new state.
    pub fn set_hidden(&self, key: &str, hidden: bool) -> Result<CommandState, StorageError> {
        let state = self.state_of(key)?.with_hidden(hidden);
        self.db.set_command_state(key, state.code())?;
        debug!("Command `{}` is now {}", key, state);
        Ok(state)
    }

    /// Recomputes the disabled bit, persists, and returns the new state.
    pub fn set_disabled(&self, key: &str, disabled: bool) -> Result<CommandState, StorageError> {
        let state = self.state_of(key)?.with_disabled(disabled);
        self.db.set_command_state(key, state.code())?;
        debug!("Command `{}` is now {}", key, state);
        Ok(state)
    }

    /// Fetch-or-default every key, for projection onto the live command set.
    pub fn apply_all(&self, keys: &[String]) -> Result<Vec<(String, CommandState)>, StorageError> {
        let mut states = Vec::with_capacity(keys.len());
        for key in keys {
            states.push((key.clone(), self.state_of(key)?));
        }
        Ok(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CommandStateService {
        CommandStateService::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn first_inspection_writes_the_default_row() {
        let svc = service();
        assert_eq!(svc.state_of("core.shutdown").unwrap().code(), 0);
        assert_eq!(svc.db.command_state("core.shutdown").unwrap(), Some(0));
    }

    #[test]
    fn disable_round_trip_keeps_the_hidden_bit() {
        let svc = service();
        svc.set_hidden("utils.remindme", true).unwrap();
        svc.set_disabled("utils.remindme", true).unwrap();
        let state = svc.set_disabled("utils.remindme", false).unwrap();
        assert!(state.hidden());
        assert!(!state.disabled());
    }

    #[test]
    fn states_survive_a_new_service_over_the_same_store() {
        let db = Arc::new(Database::in_memory().unwrap());
        let first = CommandStateService::new(db.clone());
        first.set_hidden("moderation.mute", true).unwrap();

        let second = CommandStateService::new(db);
        assert!(second.state_of("moderation.mute").unwrap().hidden());
    }

    #[test]
    fn out_of_range_rows_fall_back_to_default() {
        let svc = service();
        svc.db.set_command_state("core.about", 9).unwrap();
        assert_eq!(svc.state_of("core.about").unwrap().code(), 0);
        assert_eq!(svc.db.command_state("core.about").unwrap(), Some(0));
    }
}
