use std::collections::HashMap;
use std::fmt;

use crate::application::errors::CommandError;

/// Visibility/enablement state of a command.
///
/// Encoded for storage as two bits: bit 0 = hidden, bit 1 = disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandState {
    #[default]
    VisibleEnabled,
    HiddenEnabled,
    VisibleDisabled,
    HiddenDisabled,
}

impl CommandState {
    pub fn from_bits(hidden: bool, disabled: bool) -> Self {
        match (hidden, disabled) {
            (false, false) => Self::VisibleEnabled,
            (true, false) => Self::HiddenEnabled,
            (false, true) => Self::VisibleDisabled,
            (true, true) => Self::HiddenDisabled,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::VisibleEnabled),
            1 => Some(Self::HiddenEnabled),
            2 => Some(Self::VisibleDisabled),
            3 => Some(Self::HiddenDisabled),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::VisibleEnabled => 0,
            Self::HiddenEnabled => 1,
            Self::VisibleDisabled => 2,
            Self::HiddenDisabled => 3,
        }
    }

    pub fn hidden(self) -> bool {
        matches!(self, Self::HiddenEnabled | Self::HiddenDisabled)
    }

    pub fn disabled(self) -> bool {
        matches!(self, Self::VisibleDisabled | Self::HiddenDisabled)
    }

    pub fn with_hidden(self, hidden: bool) -> Self {
        Self::from_bits(hidden, self.disabled())
    }

    pub fn with_disabled(self, disabled: bool) -> Self {
        Self::from_bits(self.hidden(), disabled)
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (vis, en) = match self {
            Self::VisibleEnabled => ("visible", "enabled"),
            Self::HiddenEnabled => ("hidden", "enabled"),
            Self::VisibleDisabled => ("visible", "disabled"),
            Self::HiddenDisabled => ("hidden", "disabled"),
        };
        write!(f, "{} and {}", vis, en)
    }
}

/// Represents a registered bot command
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    pub module: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub usage: Option<String>,
    pub hidden: bool,
    pub enabled: bool,
}

impl CommandSpec {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            description: None,
            aliases: Vec::new(),
            usage: None,
            hidden: false,
            enabled: true,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Stable identity of this command across restarts and reloads.
    pub fn key(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn state(&self) -> CommandState {
        CommandState::from_bits(self.hidden, !self.enabled)
    }

    /// Overwrite the live flags from a persisted state.
    pub fn apply_state(&mut self, state: CommandState) {
        self.hidden = state.hidden();
        self.enabled = !state.disabled();
    }

    pub fn matches(&self, input: &str) -> bool {
        let input_lower = input.to_lowercase();
        self.name.to_lowercase() == input_lower
            || self.aliases.iter().any(|a| a.to_lowercase() == input_lower)
    }
}

/// Index of every currently registered command
#[derive(Default)]
pub struct CommandIndex {
    commands: HashMap<String, CommandSpec>,
}

impl CommandIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command. Names and aliases must not collide with any
    /// command already present.
    pub fn register(&mut self, spec: CommandSpec) -> Result<(), CommandError> {
        if self.commands.values().any(|c| c.matches(&spec.name)) {
            return Err(CommandError::Duplicate(spec.name));
        }
        if let Some(alias) = spec
            .aliases
            .iter()
            .find(|a| self.commands.values().any(|c| c.matches(a)))
        {
            return Err(CommandError::Duplicate(alias.clone()));
        }
        self.commands.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<CommandSpec> {
        self.commands.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CommandSpec> {
        self.commands.get_mut(name)
    }

    /// Looks a command up by primary name or alias.
    pub fn find(&self, input: &str) -> Option<&CommandSpec> {
        self.commands.values().find(|c| c.matches(input))
    }

    pub fn all(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_round_trip() {
        for code in 0..4 {
            let state = CommandState::from_code(code).unwrap();
            assert_eq!(state.code(), code);
        }
        assert_eq!(CommandState::from_code(4), None);
        assert_eq!(CommandState::from_code(-1), None);
    }

    #[test]
    fn disable_round_trip_preserves_hidden_bit() {
        for code in 0..4 {
            let start = CommandState::from_code(code).unwrap();
            let toggled = start.with_disabled(true).with_disabled(false);
            assert_eq!(toggled.hidden(), start.hidden());
            assert!(!toggled.disabled());
        }
    }

    #[test]
    fn hide_round_trip_preserves_disabled_bit() {
        for code in 0..4 {
            let start = CommandState::from_code(code).unwrap();
            let toggled = start.with_hidden(true).with_hidden(false);
            assert_eq!(toggled.disabled(), start.disabled());
            assert!(!toggled.hidden());
        }
    }

    #[test]
    fn transitions_match_expected_codes() {
        // enable: 2 -> 0, 3 -> 1; disable: 0 -> 2, 1 -> 3
        assert_eq!(CommandState::VisibleDisabled.with_disabled(false).code(), 0);
        assert_eq!(CommandState::HiddenDisabled.with_disabled(false).code(), 1);
        assert_eq!(CommandState::VisibleEnabled.with_disabled(true).code(), 2);
        assert_eq!(CommandState::HiddenEnabled.with_disabled(true).code(), 3);
        // show: 1 -> 0, 3 -> 2; hide: 0 -> 1, 2 -> 3
        assert_eq!(CommandState::HiddenEnabled.with_hidden(false).code(), 0);
        assert_eq!(CommandState::HiddenDisabled.with_hidden(false).code(), 2);
        assert_eq!(CommandState::VisibleEnabled.with_hidden(true).code(), 1);
        assert_eq!(CommandState::VisibleDisabled.with_hidden(true).code(), 3);
    }

    #[test]
    fn index_rejects_duplicate_names_and_aliases() {
        let mut index = CommandIndex::new();
        index
            .register(CommandSpec::new("utils", "remindme").with_aliases(vec!["remind".into()]))
            .unwrap();

        let dup = CommandSpec::new("other", "remindme");
        assert!(matches!(
            index.register(dup),
            Err(CommandError::Duplicate(_))
        ));

        let alias_clash = CommandSpec::new("other", "fresh").with_aliases(vec!["Remind".into()]);
        assert!(matches!(
            index.register(alias_clash),
            Err(CommandError::Duplicate(_))
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn find_matches_aliases_case_insensitively() {
        let mut index = CommandIndex::new();
        index
            .register(CommandSpec::new("moderation", "mute").with_aliases(vec!["silence".into()]))
            .unwrap();
        assert!(index.find("MUTE").is_some());
        assert!(index.find("Silence").is_some());
        assert!(index.find("ban").is_none());
    }
}
