// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The reconciliation rules live in domains/supporters and only talk to these.
//
// Naming convention: Base* for trait names (e.g., BaseRoleDirectory)

use anyhow::Result;
use async_trait::async_trait;
use discord::Snowflake;

use crate::domains::supporters::models::User;

// =============================================================================
// Entitlement Store Trait (Infrastructure - user database, read only)
// =============================================================================

#[async_trait]
pub trait BaseEntitlementStore: Send + Sync {
    /// Look up the user linked to a Discord account. A missing link is `Ok(None)`.
    async fn find_by_discord_id(&self, discord_id: Snowflake) -> Result<Option<User>>;

    /// Every user with the supporter bit set, unordered.
    async fn find_all_supporters(&self) -> Result<Vec<User>>;
}

// =============================================================================
// Role Directory Trait (Infrastructure - Discord guild)
// =============================================================================

#[async_trait]
pub trait BaseRoleDirectory: Send + Sync {
    /// Ids of guild members currently holding `role`.
    async fn members_holding(&self, role: Snowflake) -> Result<Vec<Snowflake>>;

    /// Role set of a guild member, `Ok(None)` if they are not in the guild.
    async fn member_roles(&self, member: Snowflake) -> Result<Option<Vec<Snowflake>>>;

    /// Grant `role`. Granting a role the member already has is a no-op.
    async fn add_role(&self, member: Snowflake, role: Snowflake, reason: &str) -> Result<()>;

    /// Revoke `role`. Revoking a role the member lacks is a no-op.
    async fn remove_role(&self, member: Snowflake, role: Snowflake, reason: &str) -> Result<()>;

    /// Post a titled notice to a channel. Callers treat failures as non-fatal.
    async fn post_audit(&self, channel: Snowflake, title: &str, text: &str) -> Result<()>;
}

// =============================================================================
// Interaction Responder Trait (Infrastructure - Discord interaction webhooks)
// =============================================================================

#[async_trait]
pub trait BaseInteractionResponder: Send + Sync {
    /// Replace the placeholder of a deferred interaction with `content`.
    async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<()>;
}
