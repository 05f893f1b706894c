//! HTTP proxy layer: axum router, route handlers, and error mapping.
//!
//! Each `/api/{provider}/...` route resolves the caller's credential,
//! optionally gates the requested model, and streams the request to the
//! provider with the right authentication header attached.

mod error;
pub mod forward;
pub mod gate;
mod handlers;
pub mod relay;

pub use error::ApiError;

use arc_swap::ArcSwap;
use axum::{
    Router,
    routing::{any, get},
};
use keygate_config::Config;
use keygate_store::InMemorySessionStore;
use keygate_types::SessionTokenStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state passed to all route handlers.
pub struct AppState {
    /// Server configuration, atomically swappable for hot-reloading.
    pub config: Arc<ArcSwap<Config>>,
    /// HTTP client for upstream requests. Never follows redirects.
    pub http: reqwest::Client,
    /// Copilot plugin token → session token cache.
    pub sessions: Arc<dyn SessionTokenStore>,
}

impl AppState {
    /// Creates the shared state with an empty in-memory session cache.
    ///
    /// The HTTP client is built once from the initial snapshot, so a changed
    /// `proxy_url` needs a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Arc<ArcSwap<Config>>) -> keygate_types::Result<Arc<Self>> {
        Self::with_sessions(config, Arc::new(InMemorySessionStore::new()))
    }

    /// Creates the shared state over an existing session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_sessions(
        config: Arc<ArcSwap<Config>>,
        sessions: Arc<dyn SessionTokenStore>,
    ) -> keygate_types::Result<Arc<Self>> {
        let http = build_http_client(config.load().proxy_url.as_deref())?;
        Ok(Arc::new(Self {
            config,
            http,
            sessions,
        }))
    }
}

/// Build the upstream HTTP client, optionally routed through a proxy.
///
/// Redirects are disabled: a 3xx is relayed to the caller instead of
/// carrying credentials to whatever host it names.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_http_client(proxy_url: Option<&str>) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
    if let Some(url) = proxy_url.filter(|u| !u.is_empty()) {
        match reqwest::Proxy::all(url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => {
                tracing::warn!(url = url, error = %e, "invalid proxy_url, using direct connection");
            }
        }
    }
    builder.build()
}

/// Build the full axum router.
///
/// Routes:
/// - ANY /api/openai/{*path}   `OpenAI` (Azure when `azure.url` is set)
/// - ANY /api/azure/{*path}    Azure `OpenAI`
/// - ANY /api/google/{*path}   Gemini
/// - ANY /api/github/{*path}   Copilot chat
/// - GET /api/config           client settings
/// - GET /health
pub fn make_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/openai/{*path}", any(handlers::openai))
        .route("/api/azure/{*path}", any(handlers::azure))
        .route("/api/google/{*path}", any(handlers::google))
        .route("/api/github/{*path}", any(handlers::copilot))
        .route("/api/config", get(handlers::client_config))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
