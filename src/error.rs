//! Error taxonomy shared by the fill engine and the Trakt adapters.

use thiserror::Error;

const AUTH_HINT: &str =
    "re-run the Trakt authorization and update CLIENT_ID, ACCESS_TOKEN and USERNAME";

#[derive(Debug, Error)]
pub enum GapFillError {
    /// Missing, rejected or expired credentials. Fatal for the whole run.
    #[error("authentication failed: {detail} (hint: {AUTH_HINT})")]
    Auth { detail: String },

    /// A remote read failed. Fatal for the affected show only.
    #[error("failed to fetch {what}: {detail}")]
    Fetch { what: String, detail: String },

    /// Malformed selection token.
    #[error("invalid selection '{token}': {reason}")]
    Parse { token: String, reason: String },

    /// Selection index outside `1..=max`.
    #[error("show number {index} is out of range (valid: 1-{max})")]
    Index { index: usize, max: usize },

    /// No watched episode to anchor synthesized timestamps on.
    #[error("nothing to anchor on: {0}")]
    NoAnchor(String),

    /// The remote rejected the batch, fully or in part.
    #[error("submission failed: {0}")]
    Submission(String),
}

impl GapFillError {
    pub fn auth<S: Into<String>>(detail: S) -> Self {
        Self::Auth {
            detail: detail.into(),
        }
    }

    pub fn fetch<W: Into<String>, D: Into<String>>(what: W, detail: D) -> Self {
        Self::Fetch {
            what: what.into(),
            detail: detail.into(),
        }
    }

    pub fn parse<T: Into<String>, R: Into<String>>(token: T, reason: R) -> Self {
        Self::Parse {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Errors the user can fix by typing a different selection.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Index { .. })
    }
}

pub type Result<T> = std::result::Result<T, GapFillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_carries_remediation_hint() {
        let err = GapFillError::auth("HTTP status 401");
        let text = err.to_string();
        assert!(text.contains("HTTP status 401"), "{text}");
        assert!(text.contains("ACCESS_TOKEN"), "{text}");
    }

    #[test]
    fn only_selection_errors_are_input_errors() {
        assert!(GapFillError::parse("1x", "unknown modifier").is_input_error());
        assert!(GapFillError::Index { index: 5, max: 3 }.is_input_error());
        assert!(!GapFillError::fetch("history", "timeout").is_input_error());
        assert!(!GapFillError::Submission("rejected".to_string()).is_input_error());
    }

    #[test]
    fn index_error_names_valid_range() {
        let err = GapFillError::Index { index: 5, max: 3 };
        assert_eq!(err.to_string(), "show number 5 is out of range (valid: 1-3)");
    }
}
