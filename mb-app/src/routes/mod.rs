pub mod health;
pub mod webhook;

use axum::Router;
use std::sync::Arc;

pub fn router(webhook_state: Arc<webhook::WebhookState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(webhook::router(webhook_state))
}
