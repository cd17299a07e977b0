//! Configuration management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::application::errors::ConfigError;
use crate::domain::entities::{ChannelId, RoleId};

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub platform: PlatformConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatabaseConfig {
    /// SQLite file path; `:memory:` is accepted.
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PlatformConfig {
    /// Optional JSON directory snapshot to serve entity lookups from.
    pub snapshot: Option<PathBuf>,
    /// Role removed when a mute expires.
    pub mute_role: Option<u64>,
    /// Channel for best-effort sweep notifications.
    pub alert_channel: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SchedulerConfig {
    pub mute_sweep_secs: u64,
    pub reminder_sweep_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "stevedore-bot".to_string(),
            prefix: "!".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "stevedore-bot.db".to_string(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mute_sweep_secs: 15,
            reminder_sweep_secs: 60,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn load_env() -> Self {
        let mut config = Config::default();
        if let Ok(path) = std::env::var("STEVEDORE_DB") {
            config.database.path = path;
        }
        config
    }

    /// Writes the default configuration to `path`.
    pub fn write_default(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(&Config::default())?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn mute_role(&self) -> Option<RoleId> {
        self.platform.mute_role.map(RoleId)
    }

    pub fn alert_channel(&self) -> Option<ChannelId> {
        self.platform.alert_channel.map(ChannelId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_cadence() {
        let config = Config::default();
        assert_eq!(config.scheduler.mute_sweep_secs, 15);
        assert_eq!(config.scheduler.reminder_sweep_secs, 60);
        assert_eq!(config.bot.prefix, "!");
        assert!(config.platform.mute_role.is_none());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: Config = serde_yaml::from_str(
            "bot:\n  prefix: \"?\"\nplatform:\n  mute-role: 42\n  alert-channel: 7\n",
        )
        .unwrap();
        assert_eq!(config.bot.prefix, "?");
        assert_eq!(config.bot.name, "stevedore-bot");
        assert_eq!(config.mute_role(), Some(RoleId(42)));
        assert_eq!(config.alert_channel(), Some(ChannelId(7)));
        assert_eq!(config.scheduler.mute_sweep_secs, 15);
    }

    #[test]
    fn default_config_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.database.path, Config::default().database.path);
    }
}
