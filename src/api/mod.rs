//! HTTP surface: the Vercel webhook endpoint and a health check.

pub mod handlers;
pub mod webhook;

use axum::{Router, routing};

use crate::SharedState;

pub use handlers::root;
pub use webhook::handle_webhook;

pub const WEBHOOK_PATH: &str = "/api/vercel-webhook";

/// Builds the router. The webhook route accepts every method so that
/// non-POST requests get the relay's JSON 405 body.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route(WEBHOOK_PATH, routing::any(handle_webhook))
        .with_state(state)
}
