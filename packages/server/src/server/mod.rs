// HTTP server setup (Axum + Discord interactions endpoint)
pub mod app;
pub mod routes;
pub mod signature;

pub use app::*;
pub use signature::{InteractionVerifier, SignatureError};
