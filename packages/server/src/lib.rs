// Supporter Sync - API Core
//
// Keeps the Discord supporter role in line with the supporter privilege in the
// user database: a scheduled reconciliation pass plus a self-service slash command.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
