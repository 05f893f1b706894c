//! Unified error type for the keygate workspace.

use std::time::Duration;
use thiserror::Error;

/// Enumerates all error kinds that can occur across keygate crates.
#[derive(Debug, Error)]
pub enum GateError {
    /// The caller is not allowed to use this proxy (bad access code,
    /// disabled API keys, refused Copilot plugin token).
    #[error("{0}")]
    AccessDenied(String),

    /// The operator disabled the requested model.
    #[error("you are not allowed to use {0} model")]
    ModelDisabled(String),

    /// Operator misconfiguration detected before any upstream call.
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream call exceeded the hard request deadline.
    #[error("upstream request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// HTTP transport error (connect, TLS, broken stream).
    #[error("http error: {0}")]
    Http(String),
}

// ── Feature-gated From impls ──────────────────────────────────────────────────

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for GateError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_access_denied() {
        let err = GateError::AccessDenied("access code invalid".to_string());
        assert_eq!(err.to_string(), "access code invalid");
    }

    #[test]
    fn test_error_display_model_disabled() {
        let err = GateError::ModelDisabled("gpt-4".to_string());
        assert_eq!(err.to_string(), "you are not allowed to use gpt-4 model");
    }

    #[test]
    fn test_error_display_timeout() {
        let err = GateError::Timeout(Duration::from_secs(600));
        assert_eq!(err.to_string(), "upstream request timed out after 600s");
    }
}
