pub mod api;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod logs;
pub mod resolve;
pub mod signature;
pub mod vercel;
pub mod webhook;

use chrono::{DateTime, Utc};
use reqwest::Url;
use std::sync::Arc;
use std::time::Instant;

use config::RelayConfig;
use error::{RelayError, Result};
use github::GitHubClient;
use vercel::VercelClient;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Appends `segments` to the path of `base`. Each segment is percent-encoded,
/// `/`, `?` and `#` included, so values taken from webhook payloads stay
/// inside their own segment.
pub(crate) fn api_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| RelayError::ConfigError(format!("Invalid API base '{}': {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| RelayError::ConfigError(format!("API base '{}' cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Shared, read-only state handed to every request.
pub struct AppState {
    pub config: RelayConfig,
    pub vercel: VercelClient,
    pub github: GitHubClient,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds the API clients once; they share a connection pool and the
    /// configured per-call timeout.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            vercel: VercelClient::new(http.clone(), &config),
            github: GitHubClient::new(http, &config),
            config,
            start_time: Instant::now(),
            started_at: Utc::now(),
        })
    }
}

pub type SharedState = Arc<AppState>;
