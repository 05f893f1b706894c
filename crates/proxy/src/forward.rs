//! Outbound request construction and dispatch.
//!
//! [`OutboundRequest`] carries everything needed for one upstream call and
//! is built fresh for every attempt. [`RequestForwarder`] sends it without
//! following redirects and under a hard deadline that also covers body
//! streaming.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use futures_util::TryStreamExt as _;
use keygate_auth::{UpstreamCredential, copilot};
use keygate_config::Config;
use keygate_types::{GateError, ProviderId, Result, UpstreamResponse};
use std::time::Duration;

const AZURE_KEY_HEADER: &str = "api-key";
const GOOGLE_KEY_HEADER: &str = "x-goog-api-key";
const ORGANIZATION_HEADER: &str = "openai-organization";

/// Request body for an outbound call.
pub enum OutboundBody {
    /// The caller's body, streamed through untouched.
    Stream(Body),
    /// A body that was already read into memory (model gate, Copilot retry).
    Buffered(Bytes),
}

/// One upstream call: method, URL, headers, body, deadline.
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: OutboundBody,
    pub deadline: Duration,
}

/// Prefixes `https://` when no http(s) scheme is present and strips
/// trailing slashes.
#[must_use]
pub fn normalize_base_url(base: &str) -> String {
    let base = base.trim();
    let with_scheme = if base.starts_with("http") {
        base.to_string()
    } else {
        format!("https://{base}")
    };
    with_scheme.trim_end_matches('/').to_string()
}

/// Rewrites an `OpenAI`-style path for an Azure deployment: drops `v1/`
/// and appends the `api-version` query parameter.
#[must_use]
pub fn make_azure_path(path: &str, api_version: &str) -> String {
    let path = path.replace("v1/", "");
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}api-version={api_version}")
}

/// Full upstream URL for `path_and_query` (relative, no leading slash).
///
/// # Errors
///
/// Returns [`GateError::Config`] for Azure without an API version or URL,
/// and for Copilot, whose URL is fixed.
pub fn compose_url(config: &Config, provider: ProviderId, path_and_query: &str) -> Result<String> {
    let base = config.base_url(provider).ok_or_else(|| {
        GateError::Config(format!("no base url configured for provider {provider}"))
    })?;
    let path = path_and_query.trim_start_matches('/');
    let path = if provider == ProviderId::Azure {
        let version = config
            .azure
            .api_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                GateError::Config("missing azure api version in server configuration".into())
            })?;
        make_azure_path(path, version)
    } else {
        path.to_string()
    };
    Ok(format!("{}/{path}", normalize_base_url(base)))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| GateError::AccessDenied("credential contains invalid header characters".into()))
}

fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers
}

impl OutboundRequest {
    /// Builds a request for the `OpenAI`, Azure, or Gemini upstream.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Config`] when the URL cannot be composed (see
    /// [`compose_url`]), before anything touches the network.
    pub fn for_provider(
        config: &Config,
        provider: ProviderId,
        method: Method,
        path_and_query: &str,
        credential: &UpstreamCredential,
        body: OutboundBody,
    ) -> Result<Self> {
        let url = compose_url(config, provider, path_and_query)?;
        let mut headers = base_headers();

        if let Some(secret) = credential.expose() {
            match provider {
                ProviderId::Azure => {
                    headers.insert(HeaderName::from_static(AZURE_KEY_HEADER), header_value(secret)?);
                }
                ProviderId::Gemini => {
                    headers.insert(HeaderName::from_static(GOOGLE_KEY_HEADER), header_value(secret)?);
                }
                ProviderId::OpenAI | ProviderId::Copilot => {
                    headers.insert(header::AUTHORIZATION, header_value(&format!("Bearer {secret}"))?);
                }
            }
        }

        if matches!(provider, ProviderId::OpenAI | ProviderId::Azure)
            && let Some(org) = config.openai.org_id.as_deref().filter(|o| !o.is_empty())
        {
            tracing::debug!(org, "attaching openai organization");
            if let Ok(v) = HeaderValue::from_str(org) {
                headers.insert(HeaderName::from_static(ORGANIZATION_HEADER), v);
            }
        }

        Ok(Self {
            method,
            url,
            headers,
            body,
            deadline: config.request_timeout(),
        })
    }

    /// Builds a Copilot chat request carrying `session_token`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::AccessDenied`] if the token is not a valid header value.
    pub fn for_copilot(
        config: &Config,
        method: Method,
        session_token: &str,
        body: Bytes,
    ) -> Result<Self> {
        let mut headers = base_headers();
        headers.insert(
            HeaderName::from_static("editor-version"),
            HeaderValue::from_static(copilot::EDITOR_VERSION),
        );
        headers.insert(
            HeaderName::from_static("editor-plugin-version"),
            HeaderValue::from_static(copilot::PLUGIN_VERSION),
        );
        headers.insert(
            HeaderName::from_static(ORGANIZATION_HEADER),
            HeaderValue::from_static(copilot::OPENAI_ORGANIZATION),
        );
        headers.insert(header::USER_AGENT, HeaderValue::from_static(copilot::USER_AGENT));
        headers.insert(
            header::AUTHORIZATION,
            header_value(&format!("Bearer {session_token}"))?,
        );

        Ok(Self {
            method,
            url: config.copilot.chat_url.clone(),
            headers,
            body: OutboundBody::Buffered(body),
            deadline: config.request_timeout(),
        })
    }
}

/// Maps a transport error, keeping deadline expiry distinct.
fn transport_error(e: &reqwest::Error, deadline: Duration) -> GateError {
    if e.is_timeout() {
        GateError::Timeout(deadline)
    } else {
        GateError::Http(e.to_string())
    }
}

/// Sends [`OutboundRequest`]s over a shared client.
///
/// The client must be built with redirects disabled (see
/// [`build_http_client`](crate::build_http_client)) so a 3xx reaches the
/// caller as-is and credentials never follow it to another host.
pub struct RequestForwarder<'a> {
    http: &'a reqwest::Client,
}

impl<'a> RequestForwarder<'a> {
    #[must_use]
    pub fn new(http: &'a reqwest::Client) -> Self {
        Self { http }
    }

    /// Issues the request. Any status, including 3xx and 4xx, is returned
    /// as a response; only transport failures are errors.
    ///
    /// Dropping the returned future or body stream cancels the call.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Timeout`] when the deadline passes and
    /// [`GateError::Http`] for other transport failures.
    pub async fn forward(&self, request: OutboundRequest) -> Result<UpstreamResponse> {
        let OutboundRequest {
            method,
            url,
            headers,
            body,
            deadline,
        } = request;

        tracing::info!(%method, url = %url, "forwarding upstream");

        let body = match body {
            OutboundBody::Stream(body) => reqwest::Body::wrap_stream(body.into_data_stream()),
            OutboundBody::Buffered(bytes) => reqwest::Body::from(bytes),
        };

        let resp = self
            .http
            .request(method, &url)
            .headers(headers)
            .body(body)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| {
                let err = transport_error(&e, deadline);
                tracing::warn!(url = %url, error = %err, "upstream request failed");
                err
            })?;

        let status = resp.status();
        tracing::debug!(%status, "upstream responded");
        let headers = resp.headers().clone();
        let body = resp
            .bytes_stream()
            .map_err(move |e| transport_error(&e, deadline));

        Ok(UpstreamResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}
