//! Webhook handler for Vercel deployment events
//!
//! A delivery moves through signature check, event type filter, deployment
//! lookup, target resolution, log fetch and comment post. Any step may end
//! the request early: rejected (401), ignored (200) or failed (500).

use axum::{
    Json,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{RelayError, Result};
use crate::github::format_comment;
use crate::logs::fetch_error_excerpt;
use crate::resolve::{GitHubTarget, Resolution};
use crate::signature::{SIGNATURE_HEADER, verify_signature};
use crate::webhook::{Delivery, parse_delivery, with_scheme};
use crate::{AppState, SharedState};

const DASHBOARD_URL: &str = "https://vercel.com/dashboard";

/// How a verified delivery was handled. Every variant is a 200 response.
#[derive(Debug)]
pub enum WebhookOutcome {
    Posted {
        target: GitHubTarget,
        comment_url: Option<String>,
    },
    UnhandledEvent(String),
    NoRepository { meta: Value },
    NoPullRequest,
}

impl IntoResponse for WebhookOutcome {
    fn into_response(self) -> Response {
        let body = match self {
            WebhookOutcome::Posted {
                target,
                comment_url,
            } => json!({
                "success": true,
                "message": format!("Posted comment to {}", target),
                "comment_url": comment_url,
            }),
            WebhookOutcome::UnhandledEvent(event_type) => json!({
                "message": "Event type not handled",
                "type": event_type,
            }),
            WebhookOutcome::NoRepository { meta } => json!({
                "message": "No repository info found",
                "meta": meta,
            }),
            WebhookOutcome::NoPullRequest => {
                json!({ "message": "No PR associated with this deployment" })
            }
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

/// Handles the Vercel webhook request.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        info!("Rejecting {} request to webhook endpoint", method);
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "Method not allowed" })),
        )
            .into_response();
    }

    let delivery_id = Uuid::now_v7();
    let span = info_span!("webhook", %delivery_id);

    async move {
        match relay(&state, &headers, &body).await {
            Ok(outcome) => outcome.into_response(),
            Err(e) => {
                if e.status_code().is_server_error() {
                    error!("Error processing webhook: {}", e);
                } else {
                    warn!("Rejected webhook: {}", e);
                }
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

/// Checks the signature header against the raw body.
fn authenticate(secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let header = match headers.get(SIGNATURE_HEADER) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(RelayError::MissingSignature),
    };
    let signature = header.to_str().map_err(|_| RelayError::InvalidSignature)?;

    if !verify_signature(secret, body, signature) {
        return Err(RelayError::InvalidSignature);
    }
    Ok(())
}

async fn relay(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<WebhookOutcome> {
    let missing = state.config.missing_secrets();
    if missing.any() {
        return Err(RelayError::MissingConfiguration(missing));
    }

    let secret = state.config.vercel.client_secret.as_deref().unwrap_or_default();
    authenticate(secret, headers, body)?;

    let event = match parse_delivery(body)? {
        Delivery::DeploymentError(event) => event,
        Delivery::Other(event_type) => {
            info!("Ignoring event type: {}", event_type);
            return Ok(WebhookOutcome::UnhandledEvent(event_type));
        }
    };

    let deployment = event.deployment_ref().ok_or_else(|| {
        RelayError::InvalidPayload("deployment-error event without payload.deployment.id".into())
    })?;
    info!(
        "Processing deployment error: {} (event {})",
        deployment.id,
        event.id.as_deref().unwrap_or("unknown")
    );

    let details = state.vercel.get_deployment(&deployment).await?;

    let target = match details.resolve_target() {
        Resolution::Target(target) => target,
        Resolution::NoRepository => {
            info!("Could not extract repository info from deployment {}", deployment.id);
            return Ok(WebhookOutcome::NoRepository {
                meta: Value::Object(details.meta),
            });
        }
        Resolution::NoPullRequest => {
            info!("Deployment {} not associated with a PR", deployment.id);
            return Ok(WebhookOutcome::NoPullRequest);
        }
    };
    info!("Found PR: {}", target);

    let excerpt = fetch_error_excerpt(&state.vercel, &deployment).await;
    if excerpt.is_degraded() {
        info!("Posting comment for {} without build logs", target);
    }

    let deployment_url = event
        .deployment_url()
        .or_else(|| details.url.as_deref().map(with_scheme))
        .unwrap_or_else(|| DASHBOARD_URL.to_string());
    let deployment_name = details.name.as_deref().or(event.deployment_name());

    let comment = format_comment(excerpt.text(), &deployment_url, deployment_name, Utc::now());
    let posted = state.github.post_comment(&target, &comment).await?;

    info!(
        "Successfully posted error comment to {} ({})",
        target,
        posted.html_url.as_deref().unwrap_or("no url returned")
    );

    Ok(WebhookOutcome::Posted {
        target,
        comment_url: posted.html_url,
    })
}
