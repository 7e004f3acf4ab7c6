//! Audit notices for supporter role changes.
//!
//! Every role mutation is followed by one notice in the admin logs channel.
//! Posting is best-effort: a failed post is logged and never undoes or fails
//! the mutation it describes.

use discord::Snowflake;
use tracing::warn;

use crate::kernel::ServerDeps;

pub const AUDIT_TITLE: &str = "Supporter role update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Added,
    Removed,
}

impl AuditAction {
    fn phrase(self) -> &'static str {
        match self {
            AuditAction::Added => "just had their supporter role added",
            AuditAction::Removed => "just had their supporter role removed",
        }
    }
}

/// `<@member> just had their supporter role added.`
pub fn audit_message(member: Snowflake, action: AuditAction) -> String {
    format!("<@{}> {}.", member, action.phrase())
}

/// Post the audit notice for a mutation that already succeeded.
pub async fn record(deps: &ServerDeps, member: Snowflake, action: AuditAction) {
    let text = audit_message(member, action);

    if let Err(e) = deps
        .directory
        .post_audit(deps.settings.audit_channel_id, AUDIT_TITLE, &text)
        .await
    {
        warn!(member_id = %member, ?action, "Failed to post audit notice: {:#}", e);
    }
}
