//! Conversion of octocrab failures into store errors.

use crate::error::{IssueDbError, mentions_secondary_limit};

/// Build a detailed error message from an octocrab GitHub error.
///
/// This extracts structured error information from octocrab's error types
/// so the message names the failing status and GitHub's own explanation.
/// The text is also what [`github_error`] inspects to tell a secondary rate
/// limit apart from other failures, since GitHub reports both as 403s.
pub fn build_github_error_message(error: &octocrab::Error) -> String {
    match error {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code;
            let status_text = status.canonical_reason().unwrap_or("Unknown");
            let mut message = format!(
                "GitHub API error ({} {}): {}",
                status.as_u16(),
                status_text,
                source.message
            );

            if let Some(errors) = &source.errors
                && !errors.is_empty()
            {
                message.push_str("\n\nErrors:");
                for error in errors {
                    message.push_str(&format!("\n- {error}"));
                }
            }

            message
        }
        octocrab::Error::Http { source, .. } => format!("HTTP error: {source}"),
        octocrab::Error::Service { source, .. } => format!("Service error: {source}"),
        octocrab::Error::Serde { source, .. } => format!("Serialization error: {source}"),
        octocrab::Error::Json { source, .. } => {
            format!("JSON error in {}: {}", source.path(), source.inner())
        }
        _ => format!("GitHub API error: {error}"),
    }
}

/// Convert an octocrab failure, naming the operation that produced it.
///
/// Secondary (abuse) rate limits become [`IssueDbError::SecondaryRateLimit`]
/// so the throttled transport can pause before retrying; everything else is
/// an [`IssueDbError::Api`].
pub fn github_error(operation: &str, error: octocrab::Error) -> IssueDbError {
    let message = format!("{operation}: {}", build_github_error_message(&error));
    if mentions_secondary_limit(&message) {
        IssueDbError::SecondaryRateLimit(message)
    } else {
        IssueDbError::Api(message)
    }
}
