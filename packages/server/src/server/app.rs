//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use sqlx::MySqlPool;
use tower_http::trace::TraceLayer;

use crate::kernel::{BaseInteractionResponder, ServerDeps};
use crate::server::routes::{health_handler, interactions_handler};
use crate::server::signature::InteractionVerifier;

/// Name of the self-service slash command
pub const SUPPORTER_COMMAND: &str = "supporter";
pub const SUPPORTER_COMMAND_DESCRIPTION: &str =
    "Sync your supporter role with your account status";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
    pub verifier: InteractionVerifier,
    /// Delivers the reply to a deferred slash command
    pub responder: Arc<dyn BaseInteractionResponder>,
    /// `None` when running against in-memory dependencies
    pub db_pool: Option<MySqlPool>,
}

/// Build the Axum router
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/interactions", post(interactions_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
