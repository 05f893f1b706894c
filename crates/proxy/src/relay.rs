//! Streams an upstream response back to the caller.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, header},
    response::Response,
};
use futures_util::TryStreamExt as _;
use keygate_types::UpstreamResponse;

/// Headers that must not be forwarded (hop-by-hop), plus the framing
/// header that stops being true once the body is re-streamed.
const STRIPPED: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    // browsers pop a credentials dialog on a 401 carrying this
    "www-authenticate",
    "content-length",
];

/// Content codings the HTTP client decodes. Any other coding reaches the
/// relay still encoded, so its header must survive.
const DECODED_ENCODINGS: &[&str] = &["gzip", "br", "deflate"];

fn is_decoded_encoding(value: &HeaderValue) -> bool {
    value
        .to_str()
        .is_ok_and(|v| DECODED_ENCODINGS.iter().any(|e| v.trim().eq_ignore_ascii_case(e)))
}

pub struct ResponseRelay;

impl ResponseRelay {
    /// Copies upstream headers, dropping [`STRIPPED`] ones and any
    /// `content-encoding` the client already decoded, and disables proxy
    /// buffering.
    #[must_use]
    pub fn sanitize_headers(upstream: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(upstream.len() + 1);
        for (name, value) in upstream {
            if STRIPPED.contains(&name.as_str())
                || (*name == header::CONTENT_ENCODING && is_decoded_encoding(value))
            {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
        headers
    }

    /// Relays status, sanitized headers, and the live body stream.
    #[must_use]
    pub fn relay(upstream: UpstreamResponse) -> Response {
        let headers = Self::sanitize_headers(&upstream.headers);
        let body = upstream
            .body
            .inspect_err(|e| tracing::warn!(error = %e, "upstream body stream ended with error"));
        let mut resp = Response::new(Body::from_stream(body));
        *resp.status_mut() = upstream.status;
        *resp.headers_mut() = headers;
        resp
    }

    /// Like [`relay`](Self::relay) but forces `text/event-stream`, as Copilot
    /// chat always streams.
    #[must_use]
    pub fn relay_event_stream(upstream: UpstreamResponse) -> Response {
        let mut resp = Self::relay(upstream);
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream"),
        );
        resp
    }
}
