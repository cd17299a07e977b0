//! Reminder delivery scheduler - the second deferred-action instantiation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::application::errors::{BotError, DeliveryError, StorageError};
use crate::application::mentions::scrub_mentions;
use crate::application::services::action_queue::ActionQueue;
use crate::application::services::sweeper::Sweeper;
use crate::domain::entities::{ChannelId, Reminder, ReminderId};
use crate::domain::traits::{ActionStore, PlatformDirectory};

/// Tracks pending reminders and delivers them when they come due.
///
/// Reminders key on their creation id, so unlike mutes they never collide;
/// the queue is effectively append-only until delivery or cancel.
pub struct ReminderService {
    queue: ActionQueue<Reminder>,
    directory: Arc<dyn PlatformDirectory>,
    alert_channel: Option<ChannelId>,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn ActionStore<Reminder>>,
        directory: Arc<dyn PlatformDirectory>,
        alert_channel: Option<ChannelId>,
    ) -> Self {
        Self {
            queue: ActionQueue::new(store),
            directory,
            alert_channel,
        }
    }

    pub async fn restore(&self) -> Result<usize, StorageError> {
        let count = self.queue.restore().await?;
        if count > 0 {
            info!("Restored {} pending reminder(s)", count);
        }
        Ok(count)
    }

    pub async fn schedule(&self, reminder: Reminder) -> Result<ReminderId, StorageError> {
        let id = reminder.id;
        self.queue.schedule(reminder).await?;
        Ok(id)
    }

    pub async fn cancel(&self, id: ReminderId) -> Result<(), BotError> {
        self.queue.cancel(&id).await?;
        Ok(())
    }

    pub async fn pending(&self) -> usize {
        self.queue.len().await
    }

    /// Delivers one due reminder, then removes it. At-most-once: a target
    /// that cannot be resolved is dropped without delivery rather than
    /// retried forever.
    async fn fire(&self, reminder: &Reminder) {
        self.deliver(reminder).await;
        match self.queue.finish(reminder).await {
            Ok(true) => debug!("Reminder {} removed", reminder.id),
            Ok(false) => {}
            Err(e) => warn!("Failed to remove reminder {}: {}", reminder.id, e),
        }
    }

    async fn deliver(&self, reminder: &Reminder) {
        let author = match self.directory.resolve_user(reminder.author).await {
            Ok(user) => user,
            Err(e) => {
                warn!(
                    "Cannot resolve reminder author {}: {}",
                    reminder.author, e
                );
                return;
            }
        };
        let text = scrub_mentions(&reminder.message, self.directory.as_ref(), reminder.guild).await;

        // Deliver in the origin channel when the author may still speak
        // there, otherwise fall back to a direct message.
        if let (Some(guild), Some(channel)) = (reminder.guild, reminder.channel) {
            let can_send = self
                .directory
                .member_can_send(guild, channel, reminder.author)
                .await;
            match can_send {
                Ok(true) => {
                    let result = self
                        .directory
                        .send_channel(channel, &format!("Reminder for {}: {}", author.name, text))
                        .await;
                    self.report(reminder, result).await;
                    return;
                }
                Ok(false) => debug!(
                    "Author {} may not send in {}, delivering by direct message",
                    reminder.author, channel
                ),
                Err(e) => {
                    warn!(
                        "Cannot check channel access for reminder {}: {}",
                        reminder.id, e
                    );
                    return;
                }
            }
        }

        let result = self
            .directory
            .send_user(reminder.author, &format!("Reminder: {}", text))
            .await;
        self.report(reminder, result).await;
    }

    async fn report(&self, reminder: &Reminder, result: Result<(), DeliveryError>) {
        match result {
            Ok(()) => info!("Delivered reminder {} to {}", reminder.id, reminder.author),
            Err(DeliveryError::Forbidden) => {
                warn!(
                    "Missing permission to deliver reminder {} to {}",
                    reminder.id, reminder.author
                );
                self.alert(&format!(
                    "A reminder for user {} could not be delivered: missing permission.",
                    reminder.author
                ))
                .await;
            }
            Err(e) => warn!(
                "Failed to deliver reminder {} to {}: {}",
                reminder.id, reminder.author, e
            ),
        }
    }

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
impl Sweeper for ReminderService {
    fn name(&self) -> &'static str {
        "reminder"
    }

    async fn sweep(&self, now: DateTime<Utc>) {
        if !self.directory.is_connected() {
            debug!("Platform connection down, leaving reminders pending");
            return;
        }
        for reminder in self.queue.due(now).await {
            self.fire(&reminder).await;
        }
    }
}
