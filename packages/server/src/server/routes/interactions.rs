//! Discord interactions endpoint.
//!
//! Discord POSTs every slash command invocation here. Requests are verified,
//! PINGs are answered with PONG, and the supporter command is acknowledged
//! with a deferred ephemeral response. The self-service sync then runs in the
//! background and its outcome replaces the placeholder, so a slow store or
//! Discord API never runs into the 3 second acknowledgement window.

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use discord::{Interaction, InteractionResponse, INTERACTION_APPLICATION_COMMAND, INTERACTION_PING};
use tracing::{debug, error, warn};

use crate::domains::supporters::sync_member;
use crate::server::app::{AppState, SUPPORTER_COMMAND};
use crate::server::signature::SignatureError;

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("invalid request signature: {0}")]
    Signature(#[from] SignatureError),
    #[error("malformed interaction: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported interaction type {0}")]
    Unsupported(u8),
}

impl IntoResponse for InteractionError {
    fn into_response(self) -> Response {
        let status = match &self {
            InteractionError::Signature(_) => StatusCode::UNAUTHORIZED,
            InteractionError::Malformed(_) | InteractionError::Unsupported(_) => {
                StatusCode::BAD_REQUEST
            }
        };
        (status, self.to_string()).into_response()
    }
}

pub async fn interactions_handler(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, InteractionError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let (Some(signature), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER))
    else {
        return Err(SignatureError::MissingHeaders.into());
    };

    if let Err(e) = state.verifier.verify(signature, timestamp, &body) {
        warn!("Rejected interaction: {}", e);
        return Err(e.into());
    }

    let interaction: Interaction = serde_json::from_slice(&body)?;

    match interaction.kind {
        INTERACTION_PING => Ok(Json(InteractionResponse::pong())),
        INTERACTION_APPLICATION_COMMAND => Ok(Json(handle_command(&state, interaction))),
        other => Err(InteractionError::Unsupported(other)),
    }
}

fn handle_command(state: &AppState, interaction: Interaction) -> InteractionResponse {
    let name = interaction
        .data
        .as_ref()
        .map(|d| d.name.as_str())
        .unwrap_or_default();

    if name != SUPPORTER_COMMAND {
        debug!("Ignoring unknown command {:?}", name);
        return InteractionResponse::ephemeral("Unknown command.");
    }

    // Only guild invocations carry a member whose roles we can manage
    let Some(member) = interaction.member.as_ref().map(|m| m.user.id) else {
        return InteractionResponse::ephemeral("Please use this command inside the server.");
    };

    let deps = state.deps.clone();
    let responder = state.responder.clone();
    let token = interaction.token;
    tokio::spawn(async move {
        let outcome = sync_member(&deps, member).await;
        if let Err(e) = responder
            .edit_original_response(&token, outcome.message())
            .await
        {
            error!(member_id = %member, ?outcome, "Failed to deliver supporter reply: {:#}", e);
        }
    });

    InteractionResponse::deferred_ephemeral()
}
