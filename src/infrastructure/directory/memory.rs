//! In-memory platform directory
//!
//! Serves entity lookups and deliveries from an in-process world, loadable
//! from a JSON snapshot. Used for dev-mode sessions and as the test double;
//! the connectivity and permission knobs exist so sweep behavior can be
//! exercised without a live platform.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::application::errors::{ConfigError, DeliveryError, DirectoryError};
use crate::domain::entities::{ChannelId, GuildId, RoleId, UserId};
use crate::domain::traits::{
    ChannelRef, GuildRef, MemberRef, PlatformDirectory, RoleRef, UserRef,
};

#[derive(Default)]
struct Guild {
    name: String,
    roles: HashMap<RoleId, String>,
    members: HashMap<UserId, Member>,
}

#[derive(Default)]
struct Member {
    nickname: Option<String>,
    roles: HashSet<RoleId>,
}

struct Channel {
    guild: Option<GuildId>,
    name: String,
    send_denied: HashSet<UserId>,
}

/// One recorded delivery, for inspection in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Channel(ChannelId, String),
    User(UserId, String),
}

#[derive(Default)]
struct World {
    users: HashMap<UserId, String>,
    guilds: HashMap<GuildId, Guild>,
    channels: HashMap<ChannelId, Channel>,
    deny_role_changes: bool,
    deny_messages: bool,
    echo: bool,
    sent: Vec<Delivery>,
    revoked: Vec<(GuildId, UserId, RoleId)>,
}

pub struct MemoryDirectory {
    connected: AtomicBool,
    world: RwLock<World>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            world: RwLock::new(World::default()),
        }
    }

    /// Loads a directory world from a JSON snapshot file.
    pub fn from_snapshot(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: DirectorySnapshot = serde_json::from_str(&content)?;
        Ok(snapshot.build())
    }

    /// A small built-in world for `run --dev`.
    pub fn demo() -> Self {
        let snapshot: DirectorySnapshot = match serde_json::from_str(DEMO_SNAPSHOT) {
            Ok(snapshot) => snapshot,
            Err(_) => DirectorySnapshot::default(),
        };
        snapshot.build()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Prints deliveries to stdout as they happen (dev console mode).
    pub async fn set_echo(&self, echo: bool) {
        self.world.write().await.echo = echo;
    }

    pub async fn deny_role_changes(&self, deny: bool) {
        self.world.write().await.deny_role_changes = deny;
    }

    pub async fn deny_messages(&self, deny: bool) {
        self.world.write().await.deny_messages = deny;
    }

    pub async fn add_user(&self, id: UserId, name: &str) {
        self.world.write().await.users.insert(id, name.to_string());
    }

    pub async fn add_guild(&self, id: GuildId, name: &str) {
        let mut world = self.world.write().await;
        world.guilds.entry(id).or_default().name = name.to_string();
    }

    pub async fn add_role(&self, guild: GuildId, role: RoleId, name: &str) {
        let mut world = self.world.write().await;
        if let Some(g) = world.guilds.get_mut(&guild) {
            g.roles.insert(role, name.to_string());
        }
    }

    pub async fn add_member(&self, guild: GuildId, user: UserId, nickname: Option<&str>) {
        let mut world = self.world.write().await;
        if let Some(g) = world.guilds.get_mut(&guild) {
            g.members.insert(
                user,
                Member {
                    nickname: nickname.map(str::to_string),
                    roles: HashSet::new(),
                },
            );
        }
    }

    pub async fn remove_member(&self, guild: GuildId, user: UserId) {
        let mut world = self.world.write().await;
        if let Some(g) = world.guilds.get_mut(&guild) {
            g.members.remove(&user);
        }
    }

    pub async fn add_channel(&self, id: ChannelId, guild: Option<GuildId>, name: &str) {
        self.world.write().await.channels.insert(
            id,
            Channel {
                guild,
                name: name.to_string(),
                send_denied: HashSet::new(),
            },
        );
    }

    pub async fn deny_send(&self, channel: ChannelId, user: UserId) {
        let mut world = self.world.write().await;
        if let Some(c) = world.channels.get_mut(&channel) {
            c.send_denied.insert(user);
        }
    }

    /// Grants a role directly in the world. The command layer uses this when
    /// applying a mute; the core only ever revokes through the trait.
    pub async fn grant_role(&self, guild: GuildId, user: UserId, role: RoleId) -> bool {
        let mut world = self.world.write().await;
        match world.guilds.get_mut(&guild).and_then(|g| g.members.get_mut(&user)) {
            Some(member) => {
                member.roles.insert(role);
                true
            }
            None => false,
        }
    }

    pub async fn member_has_role(&self, guild: GuildId, user: UserId, role: RoleId) -> bool {
        let world = self.world.read().await;
        world
            .guilds
            .get(&guild)
            .and_then(|g| g.members.get(&user))
            .map(|m| m.roles.contains(&role))
            .unwrap_or(false)
    }

    pub async fn sent(&self) -> Vec<Delivery> {
        self.world.read().await.sent.clone()
    }

    pub async fn revoked(&self) -> Vec<(GuildId, UserId, RoleId)> {
        self.world.read().await.revoked.clone()
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformDirectory for MemoryDirectory {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn resolve_guild(&self, id: GuildId) -> Result<GuildRef, DirectoryError> {
        let world = self.world.read().await;
        world
            .guilds
            .get(&id)
            .map(|g| GuildRef {
                id,
                name: g.name.clone(),
            })
            .ok_or_else(|| DirectoryError::not_found("guild", id))
    }

    async fn resolve_user(&self, id: UserId) -> Result<UserRef, DirectoryError> {
        let world = self.world.read().await;
        world
            .users
            .get(&id)
            .map(|name| UserRef {
                id,
                name: name.clone(),
            })
            .ok_or_else(|| DirectoryError::not_found("user", id))
    }

    async fn resolve_channel(&self, id: ChannelId) -> Result<ChannelRef, DirectoryError> {
        let world = self.world.read().await;
        world
            .channels
            .get(&id)
            .map(|c| ChannelRef {
                id,
                guild: c.guild,
                name: c.name.clone(),
            })
            .ok_or_else(|| DirectoryError::not_found("channel", id))
    }

    async fn resolve_role(&self, guild: GuildId, id: RoleId) -> Result<RoleRef, DirectoryError> {
        let world = self.world.read().await;
        world
            .guilds
            .get(&guild)
            .ok_or_else(|| DirectoryError::not_found("guild", guild))?
            .roles
            .get(&id)
            .map(|name| RoleRef {
                id,
                name: name.clone(),
            })
            .ok_or_else(|| DirectoryError::not_found("role", id))
    }

    async fn resolve_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<MemberRef, DirectoryError> {
        let world = self.world.read().await;
        let g = world
            .guilds
            .get(&guild)
            .ok_or_else(|| DirectoryError::not_found("guild", guild))?;
        let member = g
            .members
            .get(&user)
            .ok_or_else(|| DirectoryError::not_found("member", user))?;
        let name = world
            .users
            .get(&user)
            .cloned()
            .unwrap_or_else(|| user.to_string());
        Ok(MemberRef {
            user: UserRef { id: user, name },
            guild,
            nickname: member.nickname.clone(),
            roles: member.roles.iter().copied().collect(),
        })
    }

    async fn member_can_send(
        &self,
        guild: GuildId,
        channel: ChannelId,
        user: UserId,
    ) -> Result<bool, DirectoryError> {
        let world = self.world.read().await;
        let c = world
            .channels
            .get(&channel)
            .ok_or_else(|| DirectoryError::not_found("channel", channel))?;
        world
            .guilds
            .get(&guild)
            .and_then(|g| g.members.get(&user))
            .ok_or_else(|| DirectoryError::not_found("member", user))?;
        Ok(!c.send_denied.contains(&user))
    }

    async fn revoke_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), DeliveryError> {
        let mut world = self.world.write().await;
        if world.deny_role_changes {
            return Err(DeliveryError::Forbidden);
        }
        let member = world
            .guilds
            .get_mut(&guild)
            .and_then(|g| g.members.get_mut(&user))
            .ok_or_else(|| DeliveryError::Failed(format!("no member {} in {}", user, guild)))?;
        member.roles.remove(&role);
        world.revoked.push((guild, user, role));
        Ok(())
    }

    async fn send_channel(&self, channel: ChannelId, text: &str) -> Result<(), DeliveryError> {
        let mut world = self.world.write().await;
        if world.deny_messages {
            return Err(DeliveryError::Forbidden);
        }
        let name = world
            .channels
            .get(&channel)
            .map(|c| c.name.clone())
            .ok_or_else(|| DeliveryError::Failed(format!("no channel {}", channel)))?;
        if world.echo {
            println!("[#{}] {}", name, text);
        }
        world.sent.push(Delivery::Channel(channel, text.to_string()));
        Ok(())
    }

    async fn send_user(&self, user: UserId, text: &str) -> Result<(), DeliveryError> {
        let mut world = self.world.write().await;
        if world.deny_messages {
            return Err(DeliveryError::Forbidden);
        }
        let name = world
            .users
            .get(&user)
            .cloned()
            .ok_or_else(|| DeliveryError::Failed(format!("no user {}", user)))?;
        if world.echo {
            println!("[@{}] {}", name, text);
        }
        world.sent.push(Delivery::User(user, text.to_string()));
        Ok(())
    }
}

// Snapshot format

#[derive(Debug, Default, Deserialize)]
struct DirectorySnapshot {
    #[serde(default)]
    users: Vec<UserSeed>,
    #[serde(default)]
    guilds: Vec<GuildSeed>,
    #[serde(default)]
    channels: Vec<ChannelSeed>,
}

#[derive(Debug, Deserialize)]
struct UserSeed {
    id: UserId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GuildSeed {
    id: GuildId,
    name: String,
    #[serde(default)]
    roles: Vec<RoleSeed>,
    #[serde(default)]
    members: Vec<MemberSeed>,
}

#[derive(Debug, Deserialize)]
struct RoleSeed {
    id: RoleId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct MemberSeed {
    user: UserId,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    roles: Vec<RoleId>,
}

#[derive(Debug, Deserialize)]
struct ChannelSeed {
    id: ChannelId,
    #[serde(default)]
    guild: Option<GuildId>,
    name: String,
    #[serde(default)]
    deny_send: Vec<UserId>,
}

impl DirectorySnapshot {
    fn build(self) -> MemoryDirectory {
        let mut world = World::default();
        for user in self.users {
            world.users.insert(user.id, user.name);
        }
        for guild in self.guilds {
            let mut g = Guild {
                name: guild.name,
                ..Default::default()
            };
            for role in guild.roles {
                g.roles.insert(role.id, role.name);
            }
            for member in guild.members {
                g.members.insert(
                    member.user,
                    Member {
                        nickname: member.nickname,
                        roles: member.roles.into_iter().collect(),
                    },
                );
            }
            world.guilds.insert(guild.id, g);
        }
        for channel in self.channels {
            world.channels.insert(
                channel.id,
                Channel {
                    guild: channel.guild,
                    name: channel.name,
                    send_denied: channel.deny_send.into_iter().collect(),
                },
            );
        }
        MemoryDirectory {
            connected: AtomicBool::new(true),
            world: RwLock::new(world),
        }
    }
}

const DEMO_SNAPSHOT: &str = r#"{
    "users": [
        {"id": 1, "name": "operator"},
        {"id": 2, "name": "alice"},
        {"id": 3, "name": "bob"}
    ],
    "guilds": [
        {
            "id": 10,
            "name": "demo",
            "roles": [{"id": 100, "name": "muted"}],
            "members": [
                {"user": 1},
                {"user": 2, "nickname": "Alice"},
                {"user": 3, "roles": [100]}
            ]
        }
    ],
    "channels": [
        {"id": 20, "guild": 10, "name": "general"},
        {"id": 21, "guild": 10, "name": "bot-alerts"}
    ]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_world_resolves_entities() {
        let dir = MemoryDirectory::demo();
        assert!(dir.is_connected());
        assert_eq!(dir.resolve_user(UserId(2)).await.unwrap().name, "alice");
        let member = dir.resolve_member(GuildId(10), UserId(2)).await.unwrap();
        assert_eq!(member.display_name(), "Alice");
        assert!(dir.member_has_role(GuildId(10), UserId(3), RoleId(100)).await);
        assert!(matches!(
            dir.resolve_guild(GuildId(99)).await,
            Err(DirectoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn revoke_respects_the_permission_knob() {
        let dir = MemoryDirectory::demo();
        dir.deny_role_changes(true).await;
        assert_eq!(
            dir.revoke_role(GuildId(10), UserId(3), RoleId(100)).await,
            Err(DeliveryError::Forbidden)
        );
        dir.deny_role_changes(false).await;
        dir.revoke_role(GuildId(10), UserId(3), RoleId(100))
            .await
            .unwrap();
        assert!(!dir.member_has_role(GuildId(10), UserId(3), RoleId(100)).await);
        assert_eq!(dir.revoked().await.len(), 1);
    }
}
