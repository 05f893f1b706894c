//! Access control and upstream credentials.
//!
//! - [`resolver`]: decides whether an inbound request may use the proxy.
//! - [`system`]: operator-held upstream credentials and the credential that
//!   is finally forwarded.
//! - [`copilot`]: plugin-token → session-token exchange for GitHub Copilot.

pub mod copilot;
pub mod resolver;
pub mod system;

pub use copilot::CopilotTokenBroker;
pub use resolver::{AccessPolicy, CredentialResolver, Decision, DenyReason, Grant};
pub use system::{SystemCredentials, UpstreamCredential};
