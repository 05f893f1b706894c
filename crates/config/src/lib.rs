//! Configuration loading and hot-reloading for the keygate proxy.
//!
//! Uses figment for YAML + environment configuration with sensible defaults,
//! and notify + arc-swap for live file watching. Request handlers load a
//! fresh snapshot on every call, so access codes and upstream settings take
//! effect without a restart.

pub mod models;
pub mod schema;
pub mod watcher;

pub use models::{DEFAULT_MODELS, ModelEntry, ModelTable};
pub use schema::{
    AccessConfig, AzureConfig, Config, CopilotConfig, GoogleConfig, LogConfig, LogFormat,
    OpenAIConfig,
};
pub use watcher::ConfigWatcher;
