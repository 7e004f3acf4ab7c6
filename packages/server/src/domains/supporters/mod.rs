//! Supporters domain - keeps the Discord supporter role in line with the
//! supporter privilege in the user database.

pub mod audit;
pub mod models;
pub mod reconciler;
pub mod self_service;

pub use models::{Privileges, User};
pub use reconciler::{run_pass, PassReport};
pub use self_service::{sync_member, SelfServiceOutcome};
