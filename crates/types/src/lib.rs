//! Core types and traits for the keygate workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! proxy: the error type, provider identifiers, the parsed inbound
//! credential, the upstream response shape, and the session-token store trait.

pub mod credential;
pub mod error;
pub mod provider;
pub mod response;
pub mod traits;

pub use credential::{AccessCredential, mask_token};
pub use error::{GateError, Result};
pub use provider::ProviderId;
pub use response::UpstreamResponse;
pub use traits::{ByteStream, SessionTokenStore};
