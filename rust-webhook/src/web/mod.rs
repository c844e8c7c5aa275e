//! Web server module.
//!
//! This module provides a thin web server that:
//! - Receives user lifecycle webhooks from the identity provider
//! - Verifies the Svix signature over the raw body
//! - Mirrors the event into the user store
//! - Serves a health check and a minimal landing page

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{clerk_webhook, health, index, AppState, HealthResponse, WebhookResponse};
pub use signature::{Webhook, WebhookError};

/// Route the identity provider delivers webhooks to.
pub const WEBHOOK_PATH: &str = "/api/webhooks/clerk";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route(WEBHOOK_PATH, post(clerk_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
