//! Inbound Vercel webhook payload.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{RelayError, Result};

/// The only event type the relay acts on.
pub const DEPLOYMENT_ERROR: &str = "deployment-error";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub deployment: Option<DeploymentInfo>,
    #[serde(default)]
    pub team: Option<Identified>,
    #[serde(default)]
    pub links: Option<Links>,
    #[serde(default)]
    pub project: Option<Identified>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Identified {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

/// Identifies the deployment to query on the Vercel API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRef {
    pub id: String,
    pub team_id: Option<String>,
}

/// A verified delivery, classified by its `type`.
#[derive(Debug, Clone)]
pub enum Delivery {
    DeploymentError(WebhookEvent),
    Other(String),
}

/// Reads `type` first and decodes the full event only for `deployment-error`,
/// so the other event types are acknowledged whatever their other fields hold.
pub fn parse_delivery(body: &[u8]) -> Result<Delivery> {
    let raw: Value =
        serde_json::from_slice(body).map_err(|e| RelayError::InvalidPayload(e.to_string()))?;

    let event_type = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RelayError::InvalidPayload("missing event type".into()))?;
    if event_type != DEPLOYMENT_ERROR {
        return Ok(Delivery::Other(event_type.to_string()));
    }

    serde_json::from_value(raw)
        .map(Delivery::DeploymentError)
        .map_err(|e| RelayError::InvalidPayload(e.to_string()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl WebhookEvent {
    pub fn is_deployment_error(&self) -> bool {
        self.event_type == DEPLOYMENT_ERROR
    }

    /// Returns None when the payload carries no usable deployment id.
    pub fn deployment_ref(&self) -> Option<DeploymentRef> {
        let id = self
            .payload
            .deployment
            .as_ref()
            .and_then(|d| non_empty(&d.id))
            .filter(|id| *id != "." && *id != "..")?;
        let team_id = self
            .payload
            .team
            .as_ref()
            .and_then(|t| non_empty(&t.id))
            .map(String::from);
        Some(DeploymentRef {
            id: id.to_string(),
            team_id,
        })
    }

    /// Dashboard link for the deployment, falling back to its preview URL.
    pub fn deployment_url(&self) -> Option<String> {
        if let Some(link) = self.payload.links.as_ref().and_then(|l| non_empty(&l.deployment)) {
            return Some(link.to_string());
        }
        self.payload
            .deployment
            .as_ref()
            .and_then(|d| non_empty(&d.url))
            .map(with_scheme)
    }

    pub fn deployment_name(&self) -> Option<&str> {
        self.payload.deployment.as_ref().and_then(|d| non_empty(&d.name))
    }
}

/// Vercel reports bare hostnames (`app-abc123.vercel.app`) for deployment URLs.
pub fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
