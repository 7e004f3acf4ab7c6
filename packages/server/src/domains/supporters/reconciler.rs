//! Supporter role reconciliation.
//!
//! Converges the guild's supporter role holders with the database's supporter
//! bit. One pass is two sweeps over independent member sets:
//!
//! - Sweep A (shrink): every current role holder is checked against the store.
//!   Holders unknown to the store or without the bit lose the role.
//! - Sweep B (grow): every supporter in the store is checked against the guild.
//!   Linked members present in the guild who lack the role receive it.
//!
//! Failures are isolated per member: they are logged and counted, and the sweep
//! moves on. Nothing carries over between passes.

use std::collections::HashSet;

use anyhow::Result;
use discord::Snowflake;
use tracing::{debug, error, info, warn};

use super::audit::{self, AuditAction};
use super::models::User;
use crate::kernel::ServerDeps;

/// What a member's supporter role should undergo to match the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Grant,
    Revoke,
    Keep,
}

/// The role is held iff the member is entitled.
pub fn decide(entitled: bool, holds_role: bool) -> RoleAction {
    match (entitled, holds_role) {
        (true, false) => RoleAction::Grant,
        (false, true) => RoleAction::Revoke,
        _ => RoleAction::Keep,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    /// The holder has no linked user in the store (manual grant or deleted link).
    UnknownToStore,
    /// The linked user no longer has the supporter bit.
    NotEntitled,
}

impl RemovalReason {
    fn audit_log_reason(self) -> &'static str {
        match self {
            RemovalReason::UnknownToStore => "Supporter sync: member not linked to any account",
            RemovalReason::NotEntitled => "Supporter sync: supporter status expired",
        }
    }
}

/// Summary of one pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub added: Vec<Snowflake>,
    pub removed: Vec<Snowflake>,
    /// Members already in the target state
    pub unchanged: usize,
    /// Supporters with no linked Discord account
    pub skipped_unlinked: usize,
    /// Linked supporters not currently in the guild
    pub skipped_absent: usize,
    /// Supporters whose role was removed earlier in the same pass
    pub skipped_removed_this_pass: usize,
    /// Per-member failures
    pub failed: usize,
    /// Sweeps that could not list their member set at all
    pub failed_sweeps: usize,
}

impl PassReport {
    pub fn mutations(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped_unlinked + self.skipped_absent + self.skipped_removed_this_pass
    }
}

/// Grant the supporter role and post the audit notice.
pub(crate) async fn grant(deps: &ServerDeps, member: Snowflake, reason: &str) -> Result<()> {
    deps.directory
        .add_role(member, deps.settings.role_id, reason)
        .await?;
    audit::record(deps, member, AuditAction::Added).await;
    Ok(())
}

/// Revoke the supporter role and post the audit notice.
pub(crate) async fn revoke(deps: &ServerDeps, member: Snowflake, reason: &str) -> Result<()> {
    deps.directory
        .remove_role(member, deps.settings.role_id, reason)
        .await?;
    audit::record(deps, member, AuditAction::Removed).await;
    Ok(())
}

/// Run one full pass: Sweep A, then Sweep B.
pub async fn run_pass(deps: &ServerDeps) -> PassReport {
    let mut report = PassReport::default();

    shrink_sweep(deps, &mut report).await;

    let removed: HashSet<Snowflake> = report.removed.iter().copied().collect();
    grow_sweep(deps, &removed, &mut report).await;

    report
}

// =============================================================================
// Sweep A - shrink
// =============================================================================

async fn shrink_sweep(deps: &ServerDeps, report: &mut PassReport) {
    let holders = match deps.directory.members_holding(deps.settings.role_id).await {
        Ok(holders) => holders,
        Err(e) => {
            error!("Failed to list supporter role holders, skipping shrink sweep: {:#}", e);
            report.failed_sweeps += 1;
            return;
        }
    };

    debug!("Checking {} supporter role holders", holders.len());

    for member in holders {
        match shrink_member(deps, member).await {
            Ok(None) => report.unchanged += 1,
            Ok(Some(_)) => report.removed.push(member),
            Err(e) => {
                error!(member_id = %member, "Failed to check supporter role holder: {:#}", e);
                report.failed += 1;
            }
        }
    }
}

/// Returns the removal reason if the role was removed.
async fn shrink_member(deps: &ServerDeps, member: Snowflake) -> Result<Option<RemovalReason>> {
    let user = deps.store.find_by_discord_id(member).await?;
    let entitled = user.as_ref().is_some_and(User::is_supporter);

    if decide(entitled, true) == RoleAction::Keep {
        return Ok(None);
    }

    let reason = match &user {
        None => {
            warn!(
                member_id = %member,
                "Supporter role holder is unknown to the database, removing role"
            );
            RemovalReason::UnknownToStore
        }
        Some(user) => {
            info!(
                member_id = %member,
                user_id = user.id,
                "User {} is no longer a supporter, removing role",
                user.username
            );
            RemovalReason::NotEntitled
        }
    };

    revoke(deps, member, reason.audit_log_reason()).await?;
    Ok(Some(reason))
}

// =============================================================================
// Sweep B - grow
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrowOutcome {
    Unlinked,
    NotInGuild,
    RemovedThisPass,
    AlreadyHeld,
    Added,
}

async fn grow_sweep(deps: &ServerDeps, removed: &HashSet<Snowflake>, report: &mut PassReport) {
    let supporters = match deps.store.find_all_supporters().await {
        Ok(supporters) => supporters,
        Err(e) => {
            error!("Failed to fetch supporters, skipping grow sweep: {:#}", e);
            report.failed_sweeps += 1;
            return;
        }
    };

    debug!("Checking {} supporters", supporters.len());

    for user in supporters {
        match grow_member(deps, &user, removed).await {
            Ok(GrowOutcome::Unlinked) => report.skipped_unlinked += 1,
            Ok(GrowOutcome::NotInGuild) => report.skipped_absent += 1,
            Ok(GrowOutcome::RemovedThisPass) => report.skipped_removed_this_pass += 1,
            Ok(GrowOutcome::AlreadyHeld) => report.unchanged += 1,
            Ok(GrowOutcome::Added) => {
                if let Some(member) = user.discord_id() {
                    report.added.push(member);
                }
            }
            Err(e) => {
                error!(user_id = user.id, "Failed to sync supporter: {:#}", e);
                report.failed += 1;
            }
        }
    }
}

async fn grow_member(
    deps: &ServerDeps,
    user: &User,
    removed: &HashSet<Snowflake>,
) -> Result<GrowOutcome> {
    let Some(member) = user.discord_id() else {
        debug!(user_id = user.id, "Supporter {} has no linked Discord account", user.username);
        return Ok(GrowOutcome::Unlinked);
    };

    // Store changed between sweeps; leave it for the next pass
    if removed.contains(&member) {
        info!(
            member_id = %member,
            user_id = user.id,
            "Supporter role was removed earlier in this pass, not re-adding"
        );
        return Ok(GrowOutcome::RemovedThisPass);
    }

    let Some(roles) = deps.directory.member_roles(member).await? else {
        debug!(member_id = %member, user_id = user.id, "Supporter is not in the guild");
        return Ok(GrowOutcome::NotInGuild);
    };

    if roles.contains(&deps.settings.role_id) {
        return Ok(GrowOutcome::AlreadyHeld);
    }

    info!(
        member_id = %member,
        user_id = user.id,
        "User {} is a supporter, adding role",
        user.username
    );
    grant(deps, member, "Supporter sync: supporter status active").await?;
    Ok(GrowOutcome::Added)
}
