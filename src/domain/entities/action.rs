use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Utc};

use super::ids::{ChannelId, GuildId, ReminderId, UserId};

/// A timed action tracked in an action queue until it comes due or is
/// cancelled.
pub trait DeferredAction: Clone + PartialEq + Send + Sync + 'static {
    /// Identity under which the action is tracked. Scheduling a second
    /// action with the same key replaces the first.
    type Key: Clone + Eq + Hash + Debug + Send + Sync;

    fn key(&self) -> Self::Key;

    /// `None` means indefinite: the action never comes due on its own.
    fn due_at(&self) -> Option<DateTime<Utc>>;
}

/// A pending server mute awaiting expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mute {
    pub guild: GuildId,
    pub user: UserId,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Mute {
    pub fn new(guild: GuildId, user: UserId, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            guild,
            user,
            expires_at,
        }
    }

    pub fn indefinite(guild: GuildId, user: UserId) -> Self {
        Self::new(guild, user, None)
    }
}

impl DeferredAction for Mute {
    type Key = (GuildId, UserId);

    fn key(&self) -> Self::Key {
        (self.guild, self.user)
    }

    fn due_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// A pending reminder awaiting delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: ReminderId,
    pub guild: Option<GuildId>,
    pub channel: Option<ChannelId>,
    pub author: UserId,
    pub due_at: DateTime<Utc>,
    pub message: String,
}

impl Reminder {
    /// A reminder with no guild scope is delivered by direct message.
    pub fn new(author: UserId, due_at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            id: ReminderId::new(),
            guild: None,
            channel: None,
            author,
            due_at,
            message: message.into(),
        }
    }

    pub fn in_channel(mut self, guild: GuildId, channel: ChannelId) -> Self {
        self.guild = Some(guild);
        self.channel = Some(channel);
        self
    }
}

impl DeferredAction for Reminder {
    type Key = ReminderId;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn due_at(&self) -> Option<DateTime<Utc>> {
        Some(self.due_at)
    }
}
