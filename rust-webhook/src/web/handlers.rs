//! HTTP endpoint handlers.
//!
//! The webhook handler only:
//! 1. Checks the three Svix headers are present
//! 2. Verifies the signature over the raw body
//! 3. Applies the event to the user store (at most one write)

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::store::UserStore;
use crate::sync::{apply_event, SyncError, WebhookEvent};
use crate::web::signature::{
    Webhook, SVIX_ID_HEADER, SVIX_SIGNATURE_HEADER, SVIX_TIMESTAMP_HEADER,
};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub webhook: Arc<Webhook>,
    pub store: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(config: Config, webhook: Webhook, store: Arc<dyn UserStore>) -> Self {
        Self {
            config: Arc::new(config),
            webhook: Arc::new(webhook),
            store,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Landing Page
// =============================================================================

/// Landing page with sign-up and sign-out controls.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>UserSync</title></head>
<body style="min-height:100vh;display:flex;justify-content:center;gap:0.5rem">
<a href="{sign_up}"><button>SignUp</button></a>
<a href="{sign_out}"><button>SignOut</button></a>
</body>
</html>
"#,
        sign_up = escape_attr(&state.config.sign_up_url),
        sign_out = escape_attr(&state.config.sign_out_url),
    ))
}

fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// Identity Provider Webhook
// =============================================================================

/// Webhook response.
#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl WebhookResponse {
    fn reply(
        code: StatusCode,
        status: &'static str,
        event_type: Option<String>,
    ) -> (StatusCode, Json<Self>) {
        (code, Json(Self { status, event_type }))
    }
}

/// Identity provider webhook endpoint.
///
/// The body is taken as raw bytes so verification sees exactly what was
/// signed. Responds 400 for missing headers, bad signatures, or a body that
/// is not JSON; 500 when a user event cannot be written (store failure or a
/// user object without an id); 200 otherwise, including envelopes whose
/// `type` is missing or unknown.
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let msg_id = header_value(&headers, SVIX_ID_HEADER);
    let timestamp = header_value(&headers, SVIX_TIMESTAMP_HEADER);
    let signature = header_value(&headers, SVIX_SIGNATURE_HEADER);

    let (msg_id, timestamp, signature) = match (msg_id, timestamp, signature) {
        (Some(id), Some(ts), Some(sig)) => (id, ts, sig),
        (id, ts, sig) => {
            warn!(
                has_id = id.is_some(),
                has_timestamp = ts.is_some(),
                has_signature = sig.is_some(),
                "webhook_missing_headers"
            );
            return WebhookResponse::reply(StatusCode::BAD_REQUEST, "missing_headers", None);
        }
    };

    info!(msg_id = %msg_id, body_length = body.len(), "webhook_received");

    if let Err(e) = state.webhook.verify(&body, msg_id, timestamp, signature) {
        warn!(msg_id = %msg_id, error = %e, "webhook_signature_invalid");
        return WebhookResponse::reply(StatusCode::BAD_REQUEST, "invalid_signature", None);
    }

    let event = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => WebhookEvent::from(value),
        Err(e) => {
            warn!(msg_id = %msg_id, error = %e, "webhook_payload_malformed");
            return WebhookResponse::reply(StatusCode::BAD_REQUEST, "malformed_payload", None);
        }
    };

    let event_type = event.event_type.clone();

    match apply_event(state.store.as_ref(), event).await {
        Ok(outcome) => {
            info!(
                msg_id = %msg_id,
                event_type = ?event_type,
                outcome = ?outcome,
                "webhook_processed"
            );
            WebhookResponse::reply(StatusCode::OK, "ok", event_type)
        }
        Err(e @ SyncError::MalformedPayload { .. }) => {
            error!(msg_id = %msg_id, error = %e, "webhook_user_payload_invalid");
            WebhookResponse::reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "invalid_user_payload",
                event_type,
            )
        }
        Err(e @ SyncError::Store { .. }) => {
            error!(msg_id = %msg_id, event_type = ?event_type, error = %e, "webhook_db_error");
            WebhookResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "db_error", event_type)
        }
    }
}

/// A header value, treating absent, non-UTF-8 and empty values alike.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
