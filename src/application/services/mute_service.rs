//! Mute expiry scheduler - one of the two deferred-action instantiations

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::application::errors::{BotError, DeliveryError, StorageError};
use crate::application::services::action_queue::ActionQueue;
use crate::application::services::sweeper::Sweeper;
use crate::domain::entities::{ChannelId, GuildId, Mute, RoleId, UserId};
use crate::domain::traits::{ActionStore, PlatformDirectory};

/// Tracks pending timed mutes and lifts them when they expire.
///
/// The scope key is (guild, user); scheduling a second mute for the same
/// subject replaces the first. An expiry of `None` means indefinite - the
/// mute stays until explicitly cancelled.
pub struct MuteService {
    queue: ActionQueue<Mute>,
    directory: Arc<dyn PlatformDirectory>,
    mute_role: Option<RoleId>,
    alert_channel: Option<ChannelId>,
}

impl MuteService {
    pub fn new(
        store: Arc<dyn ActionStore<Mute>>,
        directory: Arc<dyn PlatformDirectory>,
        mute_role: Option<RoleId>,
        alert_channel: Option<ChannelId>,
    ) -> Self {
        Self {
            queue: ActionQueue::new(store),
            directory,
            mute_role,
            alert_channel,
        }
    }

    /// Repopulates the queue from the store after a restart.
    pub async fn restore(&self) -> Result<usize, StorageError> {
        let count = self.queue.restore().await?;
        if count > 0 {
            info!("Restored {} pending mute(s)", count);
        }
        Ok(count)
    }

    pub async fn schedule(
        &self,
        guild: GuildId,
        user: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        self.queue.schedule(Mute::new(guild, user, expires_at)).await
    }

    pub async fn cancel(&self, guild: GuildId, user: UserId) -> Result<(), BotError> {
        self.queue.cancel(&(guild, user)).await?;
        Ok(())
    }

    pub async fn pending(&self) -> usize {
        self.queue.len().await
    }

    pub async fn is_muted(&self, guild: GuildId, user: UserId) -> bool {
        self.queue.contains(&(guild, user)).await
    }

    pub async fn expiry_of(&self, guild: GuildId, user: UserId) -> Option<Option<DateTime<Utc>>> {
        self.queue.get(&(guild, user)).await.map(|m| m.expires_at)
    }

    /// Lifts one expired mute. Delivery is at-most-once: whatever happens
    /// during resolution or role removal, the entry comes out of the queue.
    async fn expire(&self, mute: &Mute) {
        self.lift(mute).await;
        match self.queue.finish(mute).await {
            Ok(true) => debug!("Mute for {} in {} removed", mute.user, mute.guild),
            Ok(false) => {}
            Err(e) => warn!(
                "Failed to remove expired mute for {} in {}: {}",
                mute.user, mute.guild, e
            ),
        }
    }

    async fn lift(&self, mute: &Mute) {
        let Some(role) = self.mute_role else {
            warn!("No mute role configured, cannot lift mute for {}", mute.user);
            return;
        };
        let member = match self.directory.resolve_member(mute.guild, mute.user).await {
            Ok(member) => member,
            Err(e) => {
                warn!(
                    "Cannot resolve muted member {} in {}: {}",
                    mute.user, mute.guild, e
                );
                return;
            }
        };
        match self.directory.revoke_role(mute.guild, mute.user, role).await {
            Ok(()) => {
                info!("Mute expired for {} in {}", member.display_name(), mute.guild);
                self.alert(&format!("The mute of {} has expired.", member.display_name()))
                    .await;
            }
            Err(DeliveryError::Forbidden) => {
                warn!(
                    "Missing permission to unmute {} in {}",
                    mute.user, mute.guild
                );
                self.alert(&format!(
                    "The mute of {} expired but I lack permission to remove the role.",
                    member.display_name()
                ))
                .await;
            }
            Err(e) => {
                warn!("Failed to unmute {} in {}: {}", mute.user, mute.guild, e);
                self.alert(&format!(
                    "The mute of {} expired but removing the role failed.",
                    member.display_name()
                ))
                .await;
            }
        }
    }

    /// Best-effort notification on the configured alert channel.
    async fn alert(&self, text: &str) {
        let Some(channel) = self.alert_channel else {
            return;
        };
        if let Err(e) = self.directory.send_channel(channel, text).await {
            debug!("Alert channel notification failed: {}", e);
        }
    }
}

#[async_trait]
impl Sweeper for MuteService {
    fn name(&self) -> &'static str {
        "mute"
    }

    async fn sweep(&self, now: DateTime<Utc>) {
        if !self.directory.is_connected() {
            debug!("Platform connection down, leaving mutes pending");
            return;
        }
        for mute in self.queue.due(now).await {
            self.expire(&mute).await;
        }
    }
}
