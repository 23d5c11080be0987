use std::io;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::config::MissingSecrets;

/// Custom error type for deploy_failure_relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Server configuration error: missing {0}")]
    MissingConfiguration(MissingSecrets),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing signature")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Failed to fetch deployment details: {status}")]
    DeploymentFetch { status: u16 },

    #[error("Failed to fetch logs: {status}")]
    LogFetch { status: u16 },

    #[error("Failed to post GitHub comment: {status} - {body}")]
    CommentPost { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingSignature | RelayError::InvalidSignature => StatusCode::UNAUTHORIZED,
            RelayError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            RelayError::MissingConfiguration(missing) => json!({
                "error": "Server configuration error",
                "missing": missing,
            }),
            RelayError::MissingSignature | RelayError::InvalidSignature => {
                json!({ "error": self.to_string() })
            }
            RelayError::InvalidPayload(reason) => json!({
                "error": "Invalid payload",
                "message": reason,
            }),
            _ => json!({
                "error": "Internal server error",
                "message": self.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
