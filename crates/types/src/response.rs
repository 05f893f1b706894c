//! Provider-neutral view of an upstream HTTP response.

use crate::ByteStream;
use http::{HeaderMap, StatusCode};

/// Status, headers, and a live body stream from an upstream provider.
///
/// Non-2xx statuses are not errors here: they are relayed to the caller
/// verbatim.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
