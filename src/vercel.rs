//! Vercel REST API client: deployment details and build event stream.

use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::debug;

use crate::api_url;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::resolve::DeploymentDetails;
use crate::webhook::DeploymentRef;

pub const TEAM_ID_HEADER: &str = "x-vercel-team-id";

#[derive(Debug, Clone)]
pub struct VercelClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl VercelClient {
    pub fn new(http: reqwest::Client, config: &RelayConfig) -> Self {
        Self {
            http,
            api_base: config.vercel.api_base.trim_end_matches('/').to_string(),
            token: config.vercel.api_token.clone().unwrap_or_default(),
        }
    }

    /// Authenticated GET scoped to the deployment's team when one is known.
    fn get(&self, segments: &[&str], deployment: &DeploymentRef) -> Result<RequestBuilder> {
        let url = api_url(&self.api_base, segments)?;
        debug!("GET {}", url);
        let request = self.http.get(url).bearer_auth(&self.token);
        Ok(match &deployment.team_id {
            Some(team_id) => request
                .header(TEAM_ID_HEADER, team_id)
                .query(&[("teamId", team_id)]),
            None => request,
        })
    }

    /// `GET /v13/deployments/{id}`. Any non-2xx status is an error.
    pub async fn get_deployment(&self, deployment: &DeploymentRef) -> Result<DeploymentDetails> {
        let resp = self
            .get(&["v13", "deployments", deployment.id.as_str()], deployment)?
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RelayError::DeploymentFetch {
                status: resp.status().as_u16(),
            });
        }

        Ok(resp.json::<DeploymentDetails>().await?)
    }

    /// `GET /v3/deployments/{id}/events`, the build output as a JSON array.
    pub async fn get_deployment_events(&self, deployment: &DeploymentRef) -> Result<Vec<Value>> {
        let resp = self
            .get(&["v3", "deployments", deployment.id.as_str(), "events"], deployment)?
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RelayError::LogFetch {
                status: resp.status().as_u16(),
            });
        }

        Ok(resp.json::<Vec<Value>>().await?)
    }
}
