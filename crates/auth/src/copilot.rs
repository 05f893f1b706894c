//! GitHub Copilot session tokens.
//!
//! Copilot chat does not accept the long-lived plugin token directly: it is
//! exchanged at `api.github.com/copilot_internal/v2/token` for a short-lived
//! session token. Session tokens are cached per plugin token with no expiry;
//! a 401 from the chat endpoint triggers exactly one re-exchange and one retry.

use keygate_types::{GateError, Result, SessionTokenStore, UpstreamResponse, mask_token};
use reqwest::Client;
use serde_json::Value;
use std::{future::Future, sync::Arc, time::Duration};

// Header values identifying the client to Copilot.
pub const USER_AGENT: &str = "GitHubCopilotChat/0.8.0";
pub const EDITOR_VERSION: &str = "vscode/1.83.1";
pub const PLUGIN_VERSION: &str = "copilot-chat/0.8.0";
pub const OPENAI_ORGANIZATION: &str = "github-copilot";

/// Deadline for a single token exchange.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Message returned to the caller when the plugin token cannot be exchanged.
const REFUSED: &str = "your GitHub plugin token is not allowed to request";

/// Exchanges plugin tokens for session tokens and drives the 401 retry.
pub struct CopilotTokenBroker {
    http: Client,
    store: Arc<dyn SessionTokenStore>,
    token_url: String,
}

impl CopilotTokenBroker {
    /// Creates a broker over a shared HTTP client and token store.
    pub fn new(http: Client, store: Arc<dyn SessionTokenStore>, token_url: impl Into<String>) -> Self {
        Self {
            http,
            store,
            token_url: token_url.into(),
        }
    }

    /// Runs `send` with a session token for `plugin_token`.
    ///
    /// Uses the cached session token when there is one, exchanging on a miss.
    /// If the upstream answers exactly 401, the token is re-exchanged, the
    /// cache entry overwritten, and `send` called once more. Whatever the
    /// second call returns is final.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::AccessDenied`] if an exchange fails, or any error
    /// produced by `send`.
    pub async fn forward<F, Fut>(&self, plugin_token: &str, mut send: F) -> Result<UpstreamResponse>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<UpstreamResponse>>,
    {
        let session = self.session_token(plugin_token).await?;
        let resp = send(session).await?;
        if resp.status != http::StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        tracing::info!(plugin = %mask_token(plugin_token), "copilot session token rejected, re-exchanging");
        drop(resp);
        let fresh = self.refresh(plugin_token).await?;
        send(fresh).await
    }

    /// Returns the cached session token, exchanging on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::AccessDenied`] if the exchange fails.
    pub async fn session_token(&self, plugin_token: &str) -> Result<String> {
        if let Some(token) = self.store.load(plugin_token).await {
            return Ok(token);
        }
        self.refresh(plugin_token).await
    }

    /// Exchanges unconditionally and overwrites the cache entry.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::AccessDenied`] if the exchange fails.
    pub async fn refresh(&self, plugin_token: &str) -> Result<String> {
        let token = self.exchange(plugin_token).await.map_err(|e| {
            tracing::warn!(plugin = %mask_token(plugin_token), error = %e, "copilot token exchange failed");
            GateError::AccessDenied(REFUSED.to_string())
        })?;
        self.store.save(plugin_token, token.clone()).await;
        Ok(token)
    }

    async fn exchange(&self, plugin_token: &str) -> Result<String> {
        let resp = self
            .http
            .get(&self.token_url)
            .header("authorization", format!("token {plugin_token}"))
            .header("content-type", "application/json")
            .header("editor-version", EDITOR_VERSION)
            .header("editor-plugin-version", PLUGIN_VERSION)
            .header("openai-organization", OPENAI_ORGANIZATION)
            .header("user-agent", USER_AGENT)
            .timeout(EXCHANGE_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        tracing::debug!(%status, "copilot token exchange response");
        if status != reqwest::StatusCode::OK {
            return Err(GateError::Http(format!("token endpoint returned {status}")));
        }

        let json: Value = resp.json().await?;
        json.get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| GateError::Http("missing token in Copilot response".into()))
    }
}
