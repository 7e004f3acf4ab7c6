//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod scheduled_tasks;
pub mod test_dependencies;
pub mod traits;

pub use deps::{
    DiscordDirectory, DiscordInteractionResponder, MySqlEntitlementStore, ServerDeps,
    SupporterSettings,
};
pub use scheduled_tasks::start_scheduler;
pub use test_dependencies::TestDependencies;
pub use traits::*;
