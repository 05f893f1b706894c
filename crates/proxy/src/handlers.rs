//! Route handlers.
//!
//! Every handler loads one configuration snapshot and uses it for the whole
//! request, so a hot reload never splits a request across two configs.

use crate::{
    AppState,
    error::ApiError,
    forward::{OutboundBody, OutboundRequest, RequestForwarder, compose_url},
    gate::{GateOutcome, MAX_GATED_BODY, ModelGate},
    relay::ResponseRelay,
};
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, Uri, header},
    response::Response,
};
use keygate_auth::{
    AccessPolicy, CopilotTokenBroker, CredentialResolver, SystemCredentials, UpstreamCredential,
};
use keygate_config::{Config, DEFAULT_MODELS, ModelTable};
use keygate_types::{GateError, ProviderId};
use serde_json::{Value, json};
use std::sync::Arc;

const OPENAI_PREFIX: &str = "/api/openai/";
const AZURE_PREFIX: &str = "/api/azure/";
const GOOGLE_PREFIX: &str = "/api/google/";

fn authorization(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Caller address as reported by the fronting proxy, for logs only.
fn client_ip(headers: &HeaderMap) -> &str {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    header_str("x-real-ip")
        .or_else(|| {
            header_str("x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
        })
        .unwrap_or("unknown")
}

/// The raw, still percent-encoded path after the route prefix, plus the
/// inbound query string.
fn upstream_path_and_query(uri: &Uri, prefix: &str) -> String {
    let path = uri.path().strip_prefix(prefix).unwrap_or_default();
    match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    }
}

/// `ANY /api/openai/{*path}`: `OpenAI`, or Azure when `azure.url` is set.
pub async fn openai(State(state): State<Arc<AppState>>, req: Request) -> Result<Response, ApiError> {
    let config = state.config.load_full();
    let provider = if config.is_azure() {
        ProviderId::Azure
    } else {
        ProviderId::OpenAI
    };
    proxy(&state, &config, provider, OPENAI_PREFIX, req).await
}

/// `ANY /api/azure/{*path}`
pub async fn azure(State(state): State<Arc<AppState>>, req: Request) -> Result<Response, ApiError> {
    let config = state.config.load_full();
    proxy(&state, &config, ProviderId::Azure, AZURE_PREFIX, req).await
}

/// `ANY /api/google/{*path}`
pub async fn google(State(state): State<Arc<AppState>>, req: Request) -> Result<Response, ApiError> {
    let config = state.config.load_full();
    proxy(&state, &config, ProviderId::Gemini, GOOGLE_PREFIX, req).await
}

#[tracing::instrument(name = "proxy", skip_all, fields(%provider, client_ip = tracing::field::Empty))]
async fn proxy(
    state: &AppState,
    config: &Config,
    provider: ProviderId,
    route_prefix: &str,
    req: Request,
) -> Result<Response, ApiError> {
    tracing::Span::current().record("client_ip", client_ip(req.headers()));
    let path_and_query = upstream_path_and_query(req.uri(), route_prefix);

    // Operator misconfiguration fails the same way whatever the caller sent.
    compose_url(config, provider, &path_and_query)?;

    let policy = AccessPolicy::from_config(&config.access);
    let grant = CredentialResolver::resolve(authorization(req.headers()), provider, &policy)
        .into_result()
        .inspect_err(|e| tracing::info!(reason = %e, "access denied"))?;

    let (parts, body) = req.into_parts();
    let body = match config.custom_models() {
        Some(custom) if provider.is_model_gated() => {
            let table = ModelTable::collect(DEFAULT_MODELS, custom);
            match ModelGate::new(&table).check(body).await {
                GateOutcome::Allow(bytes) => OutboundBody::Buffered(bytes),
                GateOutcome::Deny(model) => return Err(GateError::ModelDisabled(model).into()),
            }
        }
        _ => OutboundBody::Stream(body),
    };

    let system = SystemCredentials::from_config(config);
    let credential = UpstreamCredential::from_grant(grant, &system, provider);
    let outbound = OutboundRequest::for_provider(
        config,
        provider,
        parts.method,
        &path_and_query,
        &credential,
        body,
    )?;

    let upstream = RequestForwarder::new(&state.http).forward(outbound).await?;
    Ok(ResponseRelay::relay(upstream))
}

/// `ANY /api/github/{*path}`: Copilot chat. The path is ignored; the chat
/// URL is fixed by configuration.
#[tracing::instrument(name = "copilot", skip_all, fields(client_ip = tracing::field::Empty))]
pub async fn copilot(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Response, ApiError> {
    tracing::Span::current().record("client_ip", client_ip(req.headers()));
    let config = state.config.load_full();
    let policy = AccessPolicy::from_config(&config.access);
    let grant =
        CredentialResolver::resolve(authorization(req.headers()), ProviderId::Copilot, &policy)
            .into_result()
            .inspect_err(|e| tracing::info!(reason = %e, "access denied"))?;

    let system = SystemCredentials::from_config(&config);
    let credential = UpstreamCredential::from_grant(grant, &system, ProviderId::Copilot);
    let Some(plugin_token) = credential.expose().map(str::to_string) else {
        return Err(GateError::AccessDenied("no GitHub plugin token available".into()).into());
    };

    // Buffered so the body can be sent again after a token refresh.
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_GATED_BODY)
        .await
        .map_err(|e| GateError::Http(format!("failed to read request body: {e}")))?;

    let broker = CopilotTokenBroker::new(
        state.http.clone(),
        Arc::clone(&state.sessions),
        config.copilot.token_url.clone(),
    );
    let forwarder = RequestForwarder::new(&state.http);
    let forwarder = &forwarder;

    let upstream = broker
        .forward(&plugin_token, |session| {
            let request =
                OutboundRequest::for_copilot(&config, parts.method.clone(), &session, body.clone());
            async move {
                match request {
                    Ok(request) => forwarder.forward(request).await,
                    Err(e) => Err(e),
                }
            }
        })
        .await?;

    Ok(ResponseRelay::relay_event_stream(upstream))
}

/// `GET /api/config`: what a client UI needs to know before prompting.
pub async fn client_config(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = state.config.load();
    Json(json!({
        "needCode": config.access.code_required(),
        "hideUserApiKey": config.access.hide_user_api_key,
        "customModels": config.custom_models().unwrap_or_default(),
    }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
