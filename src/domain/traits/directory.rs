use async_trait::async_trait;

use crate::application::errors::{DeliveryError, DirectoryError};
use crate::domain::entities::{ChannelId, GuildId, RoleId, UserId};

/// PlatformDirectory trait - abstraction over live chat-platform lookups
/// and the delivery primitives the sweeps act through
#[async_trait]
pub trait PlatformDirectory: Send + Sync {
    /// Whether the platform connection is currently up. Sweeps treat a
    /// down connection as "leave everything pending".
    fn is_connected(&self) -> bool;

    async fn resolve_guild(&self, id: GuildId) -> Result<GuildRef, DirectoryError>;

    async fn resolve_user(&self, id: UserId) -> Result<UserRef, DirectoryError>;

    async fn resolve_channel(&self, id: ChannelId) -> Result<ChannelRef, DirectoryError>;

    async fn resolve_role(&self, guild: GuildId, id: RoleId) -> Result<RoleRef, DirectoryError>;

    /// Resolves a user as a member of a guild.
    async fn resolve_member(&self, guild: GuildId, user: UserId)
        -> Result<MemberRef, DirectoryError>;

    /// Whether a member may send messages in a channel.
    async fn member_can_send(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<bool, DirectoryError>;

    async fn revoke_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), DeliveryError>;

    async fn send_channel(&self, channel: ChannelId, text: &str) -> Result<(), DeliveryError>;

    async fn send_user(&self, user: UserId, text: &str) -> Result<(), DeliveryError>;
}

/// Resolved guild
#[derive(Debug, Clone)]
pub struct GuildRef {
    pub id: GuildId,
    pub name: String,
}

/// Resolved user
#[derive(Debug, Clone)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
}

/// Resolved channel
#[derive(Debug, Clone)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub guild: Option<GuildId>,
    pub name: String,
}

/// Resolved role
#[derive(Debug, Clone)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
}

/// Resolved guild member
#[derive(Debug, Clone)]
pub struct MemberRef {
    pub user: UserRef,
    pub guild: GuildId,
    pub nickname: Option<String>,
    pub roles: Vec<RoleId>,
}

impl MemberRef {
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.user.name)
    }
}
