// TestDependencies - in-memory implementations for testing
//
// Provides mock store/directory services that can be injected into ServerDeps.
// Both record the calls made against them and support per-member failure injection.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use discord::Snowflake;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use super::{
    BaseEntitlementStore, BaseInteractionResponder, BaseRoleDirectory, ServerDeps,
    SupporterSettings,
};
use crate::domains::supporters::models::{Privileges, User};

pub const TEST_ROLE_ID: Snowflake = Snowflake(900);
pub const TEST_AUDIT_CHANNEL_ID: Snowflake = Snowflake(901);

/// Build a user record for tests
pub fn test_user(id: i32, supporter: bool, discord_id: Option<u64>) -> User {
    let mut bits = Privileges::USER_PUBLIC | Privileges::USER_NORMAL;
    if supporter {
        bits |= Privileges::USER_DONOR;
    }
    User {
        id,
        username: format!("user{}", id),
        privileges: Privileges(bits),
        discord_id: discord_id.map(|d| d as i64),
    }
}

// =============================================================================
// Mock Entitlement Store
// =============================================================================

#[derive(Default)]
pub struct MockEntitlementStore {
    users: Mutex<Vec<User>>,
    failing_lookups: Mutex<HashSet<Snowflake>>,
    fail_listing: Mutex<bool>,
    supporter_listing: Mutex<Option<Vec<User>>>,
    lookups: Mutex<Vec<Snowflake>>,
}

impl MockEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.users.lock().unwrap().push(user);
        self
    }

    /// Replace or insert a user (matched by internal id)
    pub fn upsert_user(&self, user: User) {
        let mut users = self.users.lock().unwrap();
        users.retain(|u| u.id != user.id);
        users.push(user);
    }

    /// Make lookups for this Discord id fail
    pub fn fail_lookup_for(&self, discord_id: Snowflake) {
        self.failing_lookups.lock().unwrap().insert(discord_id);
    }

    pub fn fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    /// Answer `find_all_supporters` with these rows instead of the user table,
    /// as if the store changed between the two reads of a pass
    pub fn set_supporter_listing(&self, users: Vec<User>) {
        *self.supporter_listing.lock().unwrap() = Some(users);
    }

    /// Discord ids passed to `find_by_discord_id`, in call order
    pub fn lookups(&self) -> Vec<Snowflake> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseEntitlementStore for MockEntitlementStore {
    async fn find_by_discord_id(&self, discord_id: Snowflake) -> Result<Option<User>> {
        self.lookups.lock().unwrap().push(discord_id);

        if self.failing_lookups.lock().unwrap().contains(&discord_id) {
            return Err(anyhow!("simulated store failure for {}", discord_id));
        }

        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.discord_id() == Some(discord_id))
            .cloned())
    }

    async fn find_all_supporters(&self) -> Result<Vec<User>> {
        if *self.fail_listing.lock().unwrap() {
            return Err(anyhow!("simulated store outage"));
        }

        if let Some(listing) = self.supporter_listing.lock().unwrap().clone() {
            return Ok(listing);
        }

        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.is_supporter())
            .cloned()
            .collect())
    }
}

// =============================================================================
// Mock Role Directory
// =============================================================================

/// A role mutation recorded by the mock directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCall {
    Added { member: Snowflake, role: Snowflake },
    Removed { member: Snowflake, role: Snowflake },
}

impl RoleCall {
    pub fn member(&self) -> Snowflake {
        match self {
            RoleCall::Added { member, .. } | RoleCall::Removed { member, .. } => *member,
        }
    }
}

/// A posted audit notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPost {
    pub channel: Snowflake,
    pub title: String,
    pub text: String,
}

#[derive(Default)]
pub struct MockRoleDirectory {
    /// Guild members and their role sets
    members: Mutex<BTreeMap<Snowflake, BTreeSet<Snowflake>>>,
    failing_members: Mutex<HashSet<Snowflake>>,
    fail_listing: Mutex<bool>,
    fail_audit: Mutex<bool>,
    calls: Mutex<Vec<RoleCall>>,
    audits: Mutex<Vec<AuditPost>>,
}

impl MockRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a guild member holding the given roles
    pub fn with_member(self, member: Snowflake, roles: &[Snowflake]) -> Self {
        self.members
            .lock()
            .unwrap()
            .insert(member, roles.iter().copied().collect());
        self
    }

    /// Make every per-member read or write for this member fail
    pub fn fail_member(&self, member: Snowflake) {
        self.failing_members.lock().unwrap().insert(member);
    }

    pub fn fail_listing(&self, fail: bool) {
        *self.fail_listing.lock().unwrap() = fail;
    }

    pub fn fail_audit(&self, fail: bool) {
        *self.fail_audit.lock().unwrap() = fail;
    }

    pub fn has_role(&self, member: Snowflake, role: Snowflake) -> bool {
        self.members
            .lock()
            .unwrap()
            .get(&member)
            .is_some_and(|roles| roles.contains(&role))
    }

    /// Role mutations applied so far, in call order
    pub fn calls(&self) -> Vec<RoleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn audits(&self) -> Vec<AuditPost> {
        self.audits.lock().unwrap().clone()
    }

    pub fn clear_history(&self) {
        self.calls.lock().unwrap().clear();
        self.audits.lock().unwrap().clear();
    }

    fn check_member(&self, member: Snowflake) -> Result<()> {
        if self.failing_members.lock().unwrap().contains(&member) {
            return Err(anyhow!("simulated discord failure for {}", member));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseRoleDirectory for MockRoleDirectory {
    async fn members_holding(&self, role: Snowflake) -> Result<Vec<Snowflake>> {
        if *self.fail_listing.lock().unwrap() {
            return Err(anyhow!("simulated discord outage"));
        }

        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn member_roles(&self, member: Snowflake) -> Result<Option<Vec<Snowflake>>> {
        self.check_member(member)?;

        Ok(self
            .members
            .lock()
            .unwrap()
            .get(&member)
            .map(|roles| roles.iter().copied().collect()))
    }

    async fn add_role(&self, member: Snowflake, role: Snowflake, _reason: &str) -> Result<()> {
        self.check_member(member)?;

        let mut members = self.members.lock().unwrap();
        let roles = members
            .get_mut(&member)
            .ok_or_else(|| anyhow!("unknown member {}", member))?;
        roles.insert(role);
        self.calls
            .lock()
            .unwrap()
            .push(RoleCall::Added { member, role });
        Ok(())
    }

    async fn remove_role(&self, member: Snowflake, role: Snowflake, _reason: &str) -> Result<()> {
        self.check_member(member)?;

        let mut members = self.members.lock().unwrap();
        let roles = members
            .get_mut(&member)
            .ok_or_else(|| anyhow!("unknown member {}", member))?;
        roles.remove(&role);
        self.calls
            .lock()
            .unwrap()
            .push(RoleCall::Removed { member, role });
        Ok(())
    }

    async fn post_audit(&self, channel: Snowflake, title: &str, text: &str) -> Result<()> {
        if *self.fail_audit.lock().unwrap() {
            return Err(anyhow!("simulated audit channel failure"));
        }

        self.audits.lock().unwrap().push(AuditPost {
            channel,
            title: title.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Mock Interaction Responder
// =============================================================================

/// Records deferred interaction replies as `(token, content)`
#[derive(Default)]
pub struct MockInteractionResponder {
    replies: Mutex<Vec<(String, String)>>,
    notify: tokio::sync::Notify,
}

impl MockInteractionResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }

    /// Wait until at least `count` replies have been delivered
    pub async fn wait_for_replies(&self, count: usize) -> Vec<(String, String)> {
        loop {
            let notified = self.notify.notified();
            let replies = self.replies();
            if replies.len() >= count {
                return replies;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl BaseInteractionResponder for MockInteractionResponder {
    async fn edit_original_response(&self, interaction_token: &str, content: &str) -> Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((interaction_token.to_string(), content.to_string()));
        self.notify.notify_waiters();
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock store and directory wired into a `ServerDeps`
pub struct TestDependencies {
    pub store: Arc<MockEntitlementStore>,
    pub directory: Arc<MockRoleDirectory>,
}

impl TestDependencies {
    pub fn new(store: MockEntitlementStore, directory: MockRoleDirectory) -> Self {
        Self {
            store: Arc::new(store),
            directory: Arc::new(directory),
        }
    }

    pub fn settings() -> SupporterSettings {
        SupporterSettings {
            role_id: TEST_ROLE_ID,
            audit_channel_id: TEST_AUDIT_CHANNEL_ID,
        }
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(
            self.store.clone(),
            self.directory.clone(),
            Self::settings(),
        )
    }
}
