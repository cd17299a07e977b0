//! SQLite persistence for command states, pending actions, and settings

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};

use crate::application::errors::StorageError;
use crate::domain::entities::{ChannelId, GuildId, Mute, Reminder, ReminderId, UserId};
use crate::domain::traits::ActionStore;

/// Owns the SQLite connection behind a mutex. Ids are stored as TEXT and
/// timestamps as RFC 3339 text; a NULL mute expiry means indefinite.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(StorageError::Database)?;
        Self::init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(StorageError::Database)?;
        Self::init_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_tables(conn: &Connection) -> SqliteResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS extension_command_states (
                command_key TEXT UNIQUE NOT NULL,
                state INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pending_mutes (
                guild_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                expires_at TEXT,
                PRIMARY KEY (guild_id, user_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pending_reminders (
                id TEXT PRIMARY KEY,
                guild_id TEXT,
                channel_id TEXT,
                author_id TEXT NOT NULL,
                due_at TEXT NOT NULL,
                message TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS default_modules (
                module TEXT UNIQUE NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT UNIQUE NOT NULL,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    // Command states

    pub fn command_state(&self, key: &str) -> Result<Option<i64>, StorageError> {
        let conn = self.conn();
        let state = conn
            .query_row(
                "SELECT state FROM extension_command_states WHERE command_key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::Database)?;
        Ok(state)
    }

    pub fn set_command_state(&self, key: &str, state: i64) -> Result<(), StorageError> {
        self.conn()
            .execute(
                "INSERT INTO extension_command_states (command_key, state) VALUES (?1, ?2)
                 ON CONFLICT (command_key) DO UPDATE SET state = excluded.state",
                params![key, state],
            )
            .map_err(StorageError::Database)?;
        Ok(())
    }

    // Settings

    pub fn setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn();
        let value = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(StorageError::Database)?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn()
            .execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(StorageError::Database)?;
        Ok(())
    }

    // Default modules

    pub fn default_modules(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT module FROM default_modules ORDER BY module")
            .map_err(StorageError::Database)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(StorageError::Database)?;

        let mut modules = Vec::new();
        for module in rows {
            modules.push(module.map_err(StorageError::Database)?);
        }
        Ok(modules)
    }

    pub fn add_default_module(&self, name: &str) -> Result<bool, StorageError> {
        let rows = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO default_modules (module) VALUES (?1)",
                [name],
            )
            .map_err(StorageError::Database)?;
        Ok(rows > 0)
    }

    pub fn remove_default_module(&self, name: &str) -> Result<bool, StorageError> {
        let rows = self
            .conn()
            .execute("DELETE FROM default_modules WHERE module = ?1", [name])
            .map_err(StorageError::Database)?;
        Ok(rows > 0)
    }
}

fn parse_id(value: String, column: usize) -> SqliteResult<u64> {
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn parse_timestamp(value: String, column: usize) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

impl ActionStore<Mute> for Database {
    fn upsert(&self, action: &Mute) -> Result<(), StorageError> {
        self.conn()
            .execute(
                "INSERT INTO pending_mutes (guild_id, user_id, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (guild_id, user_id) DO UPDATE SET expires_at = excluded.expires_at",
                params![
                    action.guild.to_string(),
                    action.user.to_string(),
                    action.expires_at.map(|at| at.to_rfc3339()),
                ],
            )
            .map_err(StorageError::Database)?;
        Ok(())
    }

    fn remove(&self, key: &(GuildId, UserId)) -> Result<(), StorageError> {
        self.conn()
            .execute(
                "DELETE FROM pending_mutes WHERE guild_id = ?1 AND user_id = ?2",
                params![key.0.to_string(), key.1.to_string()],
            )
            .map_err(StorageError::Database)?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Mute>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT guild_id, user_id, expires_at FROM pending_mutes")
            .map_err(StorageError::Database)?;
        let rows = stmt
            .query_map([], |row| {
                let guild = GuildId(parse_id(row.get(0)?, 0)?);
                let user = UserId(parse_id(row.get(1)?, 1)?);
                let expires_at = match row.get::<_, Option<String>>(2)? {
                    Some(text) => Some(parse_timestamp(text, 2)?),
                    None => None,
                };
                Ok(Mute::new(guild, user, expires_at))
            })
            .map_err(StorageError::Database)?;

        let mut mutes = Vec::new();
        for mute in rows {
            mutes.push(mute.map_err(StorageError::Database)?);
        }
        Ok(mutes)
    }
}

impl ActionStore<Reminder> for Database {
    fn upsert(&self, action: &Reminder) -> Result<(), StorageError> {
        self.conn()
            .execute(
                "INSERT INTO pending_reminders (id, guild_id, channel_id, author_id, due_at, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (id) DO UPDATE SET due_at = excluded.due_at, message = excluded.message",
                params![
                    action.id.to_string(),
                    action.guild.map(|g| g.to_string()),
                    action.channel.map(|c| c.to_string()),
                    action.author.to_string(),
                    action.due_at.to_rfc3339(),
                    action.message,
                ],
            )
            .map_err(StorageError::Database)?;
        Ok(())
    }

    fn remove(&self, key: &ReminderId) -> Result<(), StorageError> {
        self.conn()
            .execute(
                "DELETE FROM pending_reminders WHERE id = ?1",
                [key.to_string()],
            )
            .map_err(StorageError::Database)?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Reminder>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, guild_id, channel_id, author_id, due_at, message
                 FROM pending_reminders",
            )
            .map_err(StorageError::Database)?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let id = id.parse::<ReminderId>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
                })?;
                let guild = match row.get::<_, Option<String>>(1)? {
                    Some(text) => Some(GuildId(parse_id(text, 1)?)),
                    None => None,
                };
                let channel = match row.get::<_, Option<String>>(2)? {
                    Some(text) => Some(ChannelId(parse_id(text, 2)?)),
                    None => None,
                };
                let author = UserId(parse_id(row.get(3)?, 3)?);
                let due_at = parse_timestamp(row.get(4)?, 4)?;
                Ok(Reminder {
                    id,
                    guild,
                    channel,
                    author,
                    due_at,
                    message: row.get(5)?,
                })
            })
            .map_err(StorageError::Database)?;

        let mut reminders = Vec::new();
        for reminder in rows {
            reminders.push(reminder.map_err(StorageError::Database)?);
        }
        Ok(reminders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn command_state_upserts() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.command_state("core.about").unwrap(), None);
        db.set_command_state("core.about", 1).unwrap();
        db.set_command_state("core.about", 3).unwrap();
        assert_eq!(db.command_state("core.about").unwrap(), Some(3));
    }

    #[test]
    fn mute_rows_round_trip_including_indefinite() {
        let db = Database::in_memory().unwrap();
        let expiry = Utc::now() + Duration::minutes(5);
        let timed = Mute::new(GuildId(1), UserId(2), Some(expiry));
        let forever = Mute::indefinite(GuildId(1), UserId(3));
        ActionStore::<Mute>::upsert(&db, &timed).unwrap();
        ActionStore::<Mute>::upsert(&db, &forever).unwrap();

        let mut loaded = ActionStore::<Mute>::load_all(&db).unwrap();
        loaded.sort_by_key(|m| m.user);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].expires_at.map(|at| at.timestamp()), Some(expiry.timestamp()));
        assert_eq!(loaded[1].expires_at, None);

        ActionStore::<Mute>::remove(&db, &(GuildId(1), UserId(2))).unwrap();
        assert_eq!(ActionStore::<Mute>::load_all(&db).unwrap().len(), 1);
    }

    #[test]
    fn mute_upsert_replaces_the_same_scope() {
        let db = Database::in_memory().unwrap();
        let first = Mute::new(GuildId(1), UserId(2), Some(Utc::now()));
        let second = Mute::indefinite(GuildId(1), UserId(2));
        ActionStore::<Mute>::upsert(&db, &first).unwrap();
        ActionStore::<Mute>::upsert(&db, &second).unwrap();

        let loaded = ActionStore::<Mute>::load_all(&db).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].expires_at, None);
    }

    #[test]
    fn reminder_rows_round_trip() {
        let db = Database::in_memory().unwrap();
        let due = Utc::now() + Duration::hours(1);
        let reminder =
            Reminder::new(UserId(9), due, "check the oven").in_channel(GuildId(4), ChannelId(5));
        ActionStore::<Reminder>::upsert(&db, &reminder).unwrap();

        let loaded = ActionStore::<Reminder>::load_all(&db).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, reminder.id);
        assert_eq!(loaded[0].guild, Some(GuildId(4)));
        assert_eq!(loaded[0].message, "check the oven");

        ActionStore::<Reminder>::remove(&db, &reminder.id).unwrap();
        assert!(ActionStore::<Reminder>::load_all(&db).unwrap().is_empty());
    }

    #[test]
    fn default_modules_are_a_set() {
        let db = Database::in_memory().unwrap();
        assert!(db.add_default_module("moderation").unwrap());
        assert!(!db.add_default_module("moderation").unwrap());
        assert_eq!(db.default_modules().unwrap(), vec!["moderation"]);
        assert!(db.remove_default_module("moderation").unwrap());
        assert!(!db.remove_default_module("moderation").unwrap());
    }

    #[test]
    fn settings_upsert() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.setting("prefix").unwrap(), None);
        db.set_setting("prefix", "!").unwrap();
        db.set_setting("prefix", "?").unwrap();
        assert_eq!(db.setting("prefix").unwrap(), Some("?".to_string()));
    }
}
