//! Server dependencies (using traits for testability)
//!
//! This module provides the dependency container handed to the reconciler and
//! the self-service handler, plus the adapters that back the traits in production.

use anyhow::{Context, Result};
use async_trait::async_trait;
use discord::{CreateMessage, DiscordClient, Embed, Snowflake};
use sqlx::MySqlPool;
use std::sync::Arc;

use crate::domains::supporters::models::User;
use crate::kernel::{BaseEntitlementStore, BaseInteractionResponder, BaseRoleDirectory};

/// Embed colour for audit notices
const AUDIT_EMBED_COLOR: u32 = 0xE9_1E_63;

// =============================================================================
// DiscordDirectory (implements BaseRoleDirectory over the REST client)
// =============================================================================

/// Role directory backed by one Discord guild
pub struct DiscordDirectory {
    client: Arc<DiscordClient>,
    guild_id: Snowflake,
}

impl DiscordDirectory {
    pub fn new(client: Arc<DiscordClient>, guild_id: Snowflake) -> Self {
        Self { client, guild_id }
    }
}

#[async_trait]
impl BaseRoleDirectory for DiscordDirectory {
    async fn members_holding(&self, role: Snowflake) -> Result<Vec<Snowflake>> {
        let members = self
            .client
            .list_guild_members(self.guild_id)
            .await
            .context("Failed to list guild members")?;

        Ok(members
            .into_iter()
            .filter(|m| m.has_role(role))
            .map(|m| m.user.id)
            .collect())
    }

    async fn member_roles(&self, member: Snowflake) -> Result<Option<Vec<Snowflake>>> {
        let member = self
            .client
            .get_guild_member(self.guild_id, member)
            .await
            .with_context(|| format!("Failed to fetch guild member {}", member))?;

        Ok(member.map(|m| m.roles))
    }

    async fn add_role(&self, member: Snowflake, role: Snowflake, reason: &str) -> Result<()> {
        self.client
            .add_member_role(self.guild_id, member, role, reason)
            .await
            .with_context(|| format!("Failed to add role {} to {}", role, member))
    }

    async fn remove_role(&self, member: Snowflake, role: Snowflake, reason: &str) -> Result<()> {
        self.client
            .remove_member_role(self.guild_id, member, role, reason)
            .await
            .with_context(|| format!("Failed to remove role {} from {}", role, member))
    }

    async fn post_audit(&self, channel: Snowflake, title: &str, text: &str) -> Result<()> {
        let message = CreateMessage {
            content: None,
            embeds: vec![Embed {
                title: Some(title.to_string()),
                description: Some(text.to_string()),
                color: Some(AUDIT_EMBED_COLOR),
            }],
        };

        self.client
            .create_message(channel, &message)
            .await
            .map(|_| ())
            .with_context(|| format!("Failed to post audit message to {}", channel))
    }
}

// =============================================================================
// DiscordInteractionResponder (implements BaseInteractionResponder)
// =============================================================================

/// Delivers deferred slash-command replies through the interaction webhook
pub struct DiscordInteractionResponder(pub Arc<DiscordClient>);

impl DiscordInteractionResponder {
    pub fn new(client: Arc<DiscordClient>) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BaseInteractionResponder for DiscordInteractionResponder {
    async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<()> {
        self.0
            .edit_original_interaction_response(interaction_token, content)
            .await
            .context("Failed to deliver interaction reply")
    }
}

// =============================================================================
// MySqlEntitlementStore (implements BaseEntitlementStore over the read pool)
// =============================================================================

pub struct MySqlEntitlementStore {
    pool: MySqlPool,
}

impl MySqlEntitlementStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseEntitlementStore for MySqlEntitlementStore {
    async fn find_by_discord_id(&self, discord_id: Snowflake) -> Result<Option<User>> {
        User::find_by_discord_id(discord_id, &self.pool).await
    }

    async fn find_all_supporters(&self) -> Result<Vec<User>> {
        User::find_all_supporters(&self.pool).await
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Fixed Discord ids the sync operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupporterSettings {
    pub role_id: Snowflake,
    pub audit_channel_id: Snowflake,
}

/// Dependencies shared by the scheduled pass and the self-service command.
/// Constructed once at startup; cheap to clone.
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseEntitlementStore>,
    pub directory: Arc<dyn BaseRoleDirectory>,
    pub settings: SupporterSettings,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn BaseEntitlementStore>,
        directory: Arc<dyn BaseRoleDirectory>,
        settings: SupporterSettings,
    ) -> Self {
        Self {
            store,
            directory,
            settings,
        }
    }
}
