//! GitHub comment publishing.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::api_url;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::resolve::GitHubTarget;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// The fields of a created issue comment the relay reports back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostedComment {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

/// Renders the Markdown comment body.
pub fn format_comment(
    excerpt: &str,
    deployment_url: &str,
    deployment_name: Option<&str>,
    at: DateTime<Utc>,
) -> String {
    let project = deployment_name.filter(|n| !n.is_empty()).unwrap_or("Unknown");
    let timestamp = at.format("%b %-d, %Y, %I:%M %p UTC");

    format!(
        "## ❌ Vercel Deployment Failed\n\
         \n\
         **Project:** {project}  \n\
         **Time:** {timestamp}  \n\
         **Deployment:** [View in Vercel Dashboard]({deployment_url})\n\
         \n\
         ### Error Details\n\
         \n\
         <details>\n\
         <summary>Click to view build error logs</summary>\n\
         \n\
         ```\n\
         {excerpt}\n\
         ```\n\
         \n\
         </details>\n\
         \n\
         ---\n\
         <sub>Posted automatically when deployment fails • [View Vercel Deployment]({deployment_url})</sub>"
    )
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, config: &RelayConfig) -> Self {
        Self {
            http,
            api_base: config.github.api_base.trim_end_matches('/').to_string(),
            token: config.github.token.clone().unwrap_or_default(),
        }
    }

    /// Creates one comment on the pull request. Non-2xx responses carry the
    /// status and response text.
    pub async fn post_comment(&self, target: &GitHubTarget, body: &str) -> Result<PostedComment> {
        let url = api_url(
            &self.api_base,
            &[
                "repos",
                target.owner.as_str(),
                target.repo.as_str(),
                "issues",
                target.pr_number.as_str(),
                "comments",
            ],
        )?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .json(&json!({ "body": body }))
            .send()
            .await?;

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read GitHub response body ({}): {}", status, e);
                String::new()
            }
        };
        if !status.is_success() {
            return Err(RelayError::CommentPost {
                status: status.as_u16(),
                body: text,
            });
        }

        // The comment exists at this point, so an odd body only loses the link.
        match serde_json::from_str(&text) {
            Ok(comment) => Ok(comment),
            Err(e) => {
                warn!("Comment created on {} but the response was not readable: {}", target, e);
                Ok(PostedComment::default())
            }
        }
    }
}
