//! Async traits shared across all keygate crates.
//!
//! Every cross-crate abstraction is defined here so that higher layers depend
//! only on `keygate-types`, not on each other.

use crate::GateError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;

/// A pinned, sendable stream of response body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GateError>> + Send>>;

/// Cache of exchanged Copilot session tokens, keyed by plugin token.
///
/// Entries carry no expiry; a stale session token is discovered by a 401
/// from the upstream and replaced with [`save`](Self::save). Implementations
/// must tolerate concurrent writers for the same key: the last write wins.
#[async_trait]
pub trait SessionTokenStore: Send + Sync {
    /// Returns the cached session token for `plugin_token`, if any.
    async fn load(&self, plugin_token: &str) -> Option<String>;
    /// Stores (or overwrites) the session token for `plugin_token`.
    async fn save(&self, plugin_token: &str, session_token: String);
}
