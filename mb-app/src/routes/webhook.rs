use crate::router::{Responder, route_event};
use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

pub struct WebhookState {
    verify_token: String,
    app_secret: Option<String>,
    responder: Responder,
}

impl WebhookState {
    pub fn new(verify_token: String, app_secret: Option<String>, responder: Responder) -> Self {
        Self {
            verify_token,
            app_secret,
            responder,
        }
    }
}

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(ingest))
        .with_state(state)
}

#[derive(Debug, serde::Deserialize)]
struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

#[tracing::instrument(level = "debug", skip_all)]
async fn verify(
    State(state): State<Arc<WebhookState>>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> impl IntoResponse {
    // Repeated or unparsable hub.* parameters fail the handshake like a wrong token.
    let Ok(Query(query)) = query else {
        tracing::warn!("webhook verification rejected: unparsable query");
        return StatusCode::FORBIDDEN.into_response();
    };
    let subscribe = query.mode.as_deref() == Some("subscribe");
    let token_matches = query.verify_token.as_deref() == Some(state.verify_token.as_str());
    if subscribe && token_matches {
        tracing::info!("webhook verified");
        return (StatusCode::OK, query.challenge.unwrap_or_default()).into_response();
    }
    tracing::warn!(mode = ?query.mode, "webhook verification rejected");
    StatusCode::FORBIDDEN.into_response()
}

#[tracing::instrument(level = "debug", skip_all)]
async fn ingest(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.app_secret.as_deref() {
        if !verify_signature(&headers, &body, secret) {
            tracing::warn!("rejecting webhook with invalid x-hub-signature-256");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(error = %error, "webhook body is not valid json");
            return StatusCode::BAD_REQUEST;
        }
    };

    // Acknowledge immediately; the reply goes out in the background.
    if let Some(action) = route_event(&event) {
        tracing::debug!(to = %action.recipient(), "dispatching reply");
        state.responder.spawn_dispatch(action);
    }
    StatusCode::OK
}

/// Check `X-Hub-Signature-256: sha256=<hex>` against an HMAC-SHA256 of the raw body.
fn verify_signature(headers: &HeaderMap, body: &[u8], app_secret: &str) -> bool {
    let Some(expected) = headers
        .get("x-hub-signature-256")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .and_then(|value| value.strip_prefix("sha256="))
        .and_then(|value| hex::decode(value).ok())
    else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
