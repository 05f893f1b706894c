//! API error type that maps [`GateError`] variants to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keygate_types::GateError;
use serde_json::json;

/// Wrapper around [`GateError`] that implements [`IntoResponse`].
pub struct ApiError(pub GateError);

impl ApiError {
    /// Returns `(status, error_type, error_code)` for the wrapped error.
    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match &self.0 {
            GateError::AccessDenied(_) => (StatusCode::FORBIDDEN, "permission_error", "access_denied"),
            GateError::ModelDisabled(_) => {
                (StatusCode::FORBIDDEN, "permission_error", "model_disabled")
            }
            GateError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                "server_misconfigured",
            ),
            GateError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "server_error", "upstream_timeout"),
            GateError::Http(_) => (StatusCode::BAD_GATEWAY, "server_error", "upstream_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, error_code) = self.classify();
        let msg = self.0.to_string();
        if status.is_server_error() {
            tracing::warn!(%status, error = %msg, "request failed");
        }
        (
            status,
            Json(json!({
                "error": {
                    "message": msg,
                    "type": error_type,
                    "code": error_code,
                }
            })),
        )
            .into_response()
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        Self(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt as _;
    use std::time::Duration;

    async fn extract_error_body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_access_denied() {
        let (status, body) =
            extract_error_body(ApiError(GateError::AccessDenied("access code invalid".into()))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["type"], "permission_error");
        assert_eq!(body["error"]["code"], "access_denied");
        assert_eq!(body["error"]["message"], "access code invalid");
    }

    #[tokio::test]
    async fn test_model_disabled() {
        let (status, body) =
            extract_error_body(ApiError(GateError::ModelDisabled("gpt-4".into()))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "model_disabled");
        assert_eq!(body["error"]["message"], "you are not allowed to use gpt-4 model");
    }

    #[tokio::test]
    async fn test_config_error() {
        let (status, body) =
            extract_error_body(ApiError(GateError::Config("missing azure api version".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "configuration_error");
    }

    #[tokio::test]
    async fn test_timeout_error() {
        let (status, body) =
            extract_error_body(ApiError(GateError::Timeout(Duration::from_secs(600)))).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["code"], "upstream_timeout");
    }

    #[tokio::test]
    async fn test_http_transport_error() {
        let (status, body) =
            extract_error_body(ApiError(GateError::Http("connection refused".into()))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "server_error");
        assert_eq!(body["error"]["code"], "upstream_error");
    }
}
