//! Self-service supporter sync for a single member.
//!
//! Applies the same rule as a reconciliation pass (role held iff the linked
//! user has the supporter bit) to the requester only, and reports the result.

use anyhow::Result;
use discord::Snowflake;
use tracing::{error, info};

use super::reconciler::{decide, grant, revoke, RoleAction};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfServiceOutcome {
    /// No user is linked to the requester's Discord account
    NotLinked,
    AlreadyGranted,
    Granted,
    Removed,
    NotEntitled,
    /// The store or Discord failed; nothing is known about the entitlement
    TryAgainLater,
}

impl SelfServiceOutcome {
    /// Message shown privately to the requester
    pub fn message(self) -> &'static str {
        match self {
            SelfServiceOutcome::NotLinked => {
                "Your Discord account isn't linked to a game account. \
                 Link it from your account settings, then try again."
            }
            SelfServiceOutcome::AlreadyGranted => {
                "You already have the supporter role. Thank you for your support!"
            }
            SelfServiceOutcome::Granted => {
                "You've been given the supporter role. Thank you for your support!"
            }
            SelfServiceOutcome::Removed => {
                "Your supporter status has expired, so your supporter role has been removed."
            }
            SelfServiceOutcome::NotEntitled => "You don't currently have supporter status.",
            SelfServiceOutcome::TryAgainLater => {
                "Something went wrong while checking your supporter status. Please try again later."
            }
        }
    }
}

/// Reconcile the requester's supporter role and report the outcome.
pub async fn sync_member(deps: &ServerDeps, member: Snowflake) -> SelfServiceOutcome {
    match try_sync_member(deps, member).await {
        Ok(outcome) => {
            info!(member_id = %member, ?outcome, "Self-service supporter sync");
            outcome
        }
        Err(e) => {
            error!(member_id = %member, "Self-service supporter sync failed: {:#}", e);
            SelfServiceOutcome::TryAgainLater
        }
    }
}

async fn try_sync_member(deps: &ServerDeps, member: Snowflake) -> Result<SelfServiceOutcome> {
    let Some(user) = deps.store.find_by_discord_id(member).await? else {
        return Ok(SelfServiceOutcome::NotLinked);
    };

    let holds_role = deps
        .directory
        .member_roles(member)
        .await?
        .is_some_and(|roles| roles.contains(&deps.settings.role_id));
    let entitled = user.is_supporter();

    let outcome = match decide(entitled, holds_role) {
        RoleAction::Grant => {
            grant(deps, member, "Supporter sync: requested by member").await?;
            SelfServiceOutcome::Granted
        }
        RoleAction::Revoke => {
            revoke(deps, member, "Supporter sync: requested by member").await?;
            SelfServiceOutcome::Removed
        }
        RoleAction::Keep if entitled => SelfServiceOutcome::AlreadyGranted,
        RoleAction::Keep => SelfServiceOutcome::NotEntitled,
    };

    Ok(outcome)
}
