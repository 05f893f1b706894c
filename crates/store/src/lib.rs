//! Session token storage for the Copilot token broker.
//!
//! Only an in-memory backend exists: exchanged tokens are short-lived and are
//! never persisted across restarts.

pub mod memory;

pub use memory::InMemorySessionStore;
