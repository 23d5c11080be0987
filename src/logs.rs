//! Build log excerpt for the PR comment.

use serde_json::Value;
use tracing::{info, warn};

use crate::vercel::VercelClient;
use crate::webhook::DeploymentRef;

/// Only the most recent matching lines are kept.
pub const MAX_EXCERPT_LINES: usize = 50;
/// GitHub rejects very large comment bodies.
pub const MAX_EXCERPT_CHARS: usize = 4000;
pub const TRUNCATION_MARKER: &str = "\n\n... (truncated)";

pub const NO_ERROR_LOGS: &str =
    "Build failed but no specific error logs were found. Check the Vercel dashboard for details.";
pub const LOGS_UNAVAILABLE: &str =
    "Error logs could not be retrieved. Please check the Vercel dashboard.";

const STDERR_EVENT: &str = "stderr";

/// Result of building the excerpt. Retrieval is best-effort, so failure is a
/// variant rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogExcerpt {
    /// Matching lines, already bounded.
    Filtered(String),
    /// The stream was fetched but nothing looked like an error.
    NoMatches,
    /// The stream could not be fetched.
    Unavailable { reason: String },
}

impl LogExcerpt {
    pub fn text(&self) -> &str {
        match self {
            LogExcerpt::Filtered(text) => text,
            LogExcerpt::NoMatches => NO_ERROR_LOGS,
            LogExcerpt::Unavailable { .. } => LOGS_UNAVAILABLE,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, LogExcerpt::Unavailable { .. })
    }
}

fn event_text(event: &Value) -> Option<&str> {
    event
        .get("payload")
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
}

/// Returns true for stderr events and for lines that mention an error or failure.
pub fn is_error_event(event: &Value) -> bool {
    if event.get("type").and_then(|t| t.as_str()) == Some(STDERR_EVENT) {
        return true;
    }
    let Some(text) = event_text(event) else {
        return false;
    };
    let lower = text.to_lowercase();
    lower.contains("error") || lower.contains("failed") || text.contains('✘') || text.contains("ERROR")
}

/// Keeps the first `MAX_EXCERPT_CHARS` characters and marks the cut.
pub fn truncate_excerpt(text: String) -> String {
    let cut = text.char_indices().nth(MAX_EXCERPT_CHARS).map(|(i, _)| i);
    match cut {
        Some(cut) => {
            let mut truncated = text;
            truncated.truncate(cut);
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text,
    }
}

/// Reduces a deployment event stream to the error-relevant lines.
pub fn filter_error_logs(events: &[Value]) -> LogExcerpt {
    let lines: Vec<String> = events
        .iter()
        .filter(|event| is_error_event(event))
        .map(|event| match event_text(event) {
            Some(text) => text.to_string(),
            None => event.to_string(),
        })
        .collect();

    if lines.is_empty() {
        return LogExcerpt::NoMatches;
    }

    let start = lines.len().saturating_sub(MAX_EXCERPT_LINES);
    LogExcerpt::Filtered(truncate_excerpt(lines[start..].join("\n")))
}

/// Fetches the event stream and builds the excerpt. Never fails.
pub async fn fetch_error_excerpt(client: &VercelClient, deployment: &DeploymentRef) -> LogExcerpt {
    match client.get_deployment_events(deployment).await {
        Ok(events) => {
            let excerpt = filter_error_logs(&events);
            info!(
                "Fetched {} events for deployment {}, excerpt is {} chars",
                events.len(),
                deployment.id,
                excerpt.text().chars().count()
            );
            excerpt
        }
        Err(e) => {
            warn!("Could not fetch logs for deployment {}: {}", deployment.id, e);
            LogExcerpt::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stdout(text: &str) -> Value {
        json!({ "type": "stdout", "payload": { "text": text } })
    }

    #[test]
    fn keeps_last_fifty_matching_lines() {
        let events: Vec<Value> = (0..60).map(|i| stdout(&format!("error {}", i))).collect();
        let expected = (10..60)
            .map(|i| format!("error {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(filter_error_logs(&events), LogExcerpt::Filtered(expected));
    }

    #[test]
    fn no_matches_yields_placeholder() {
        let events = vec![stdout("Installing dependencies"), stdout("Build completed")];
        let excerpt = filter_error_logs(&events);
        assert_eq!(excerpt, LogExcerpt::NoMatches);
        assert_eq!(excerpt.text(), NO_ERROR_LOGS);
    }

    #[test]
    fn empty_stream_yields_placeholder() {
        assert_eq!(filter_error_logs(&[]), LogExcerpt::NoMatches);
    }

    #[test]
    fn matches_are_case_insensitive_and_ordered() {
        let events = vec![
            stdout("Type Error: x is not a function"),
            stdout("compiling"),
            stdout("Command FAILED with exit code 1"),
            stdout("✘ lint"),
            stdout("ok"),
        ];
        assert_eq!(
            filter_error_logs(&events).text(),
            "Type Error: x is not a function\nCommand FAILED with exit code 1\n✘ lint"
        );
    }

    #[test]
    fn stderr_events_are_kept() {
        let events = vec![json!({ "type": "stderr", "payload": { "text": "warning: unused" } })];
        assert_eq!(filter_error_logs(&events).text(), "warning: unused");
    }

    #[test]
    fn stderr_without_text_falls_back_to_json() {
        let event = json!({ "type": "stderr", "created": 1 });
        let excerpt = filter_error_logs(std::slice::from_ref(&event));
        assert_eq!(excerpt.text(), event.to_string());
    }

    #[test]
    fn long_output_is_truncated_to_limit() {
        let line = "error: ".to_string() + &"x".repeat(193);
        let events: Vec<Value> = (0..30).map(|_| stdout(&line)).collect();
        let text = filter_error_logs(&events).text().to_string();

        let body = text.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(body.chars().count(), MAX_EXCERPT_CHARS);
        assert!(text.ends_with("... (truncated)"));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "✘".repeat(MAX_EXCERPT_CHARS + 1);
        let truncated = truncate_excerpt(text);
        let body = truncated.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(body.chars().count(), MAX_EXCERPT_CHARS);
    }

    #[test]
    fn text_at_limit_is_untouched() {
        let text = "e".repeat(MAX_EXCERPT_CHARS);
        assert_eq!(truncate_excerpt(text.clone()), text);
    }

    #[test]
    fn unavailable_uses_fixed_placeholder() {
        let excerpt = LogExcerpt::Unavailable {
            reason: "Failed to fetch logs: 500".to_string(),
        };
        assert!(excerpt.is_degraded());
        assert_eq!(excerpt.text(), LOGS_UNAVAILABLE);
    }
}
