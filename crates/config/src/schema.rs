use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};
use keygate_types::ProviderId;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path, time::Duration};

/// Prefix for environment overrides, e.g. `KEYGATE_ACCESS__CODE_REQUIRED=true`.
pub const ENV_PREFIX: &str = "KEYGATE_";

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_timeout_secs() -> u64 {
    600
}
fn default_code_prefix() -> String {
    "nk-".to_string()
}
fn default_openai_base() -> String {
    "https://api.openai.com".to_string()
}
fn default_google_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_copilot_token_url() -> String {
    "https://api.github.com/copilot_internal/v2/token".to_string()
}
fn default_copilot_chat_url() -> String {
    "https://api.githubcopilot.com/chat/completions".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Access-code policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Whether callers without an API key must present a valid access code.
    /// Defaults to "required iff any code is configured".
    #[serde(default)]
    pub code_required: Option<bool>,
    /// Marker distinguishing access codes from raw API keys.
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,
    /// Reject callers that bring their own API key.
    #[serde(default)]
    pub hide_user_api_key: bool,
    /// Access code → expiry as unix seconds (`null` never expires).
    #[serde(default)]
    pub codes: HashMap<String, Option<u64>>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            code_required: None,
            code_prefix: default_code_prefix(),
            hide_user_api_key: false,
            codes: HashMap::new(),
        }
    }
}

impl AccessConfig {
    /// Effective `code_required` flag.
    #[must_use]
    pub fn code_required(&self) -> bool {
        self.code_required.unwrap_or(!self.codes.is_empty())
    }
}

/// Generic `OpenAI`-compatible upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default = "default_openai_base")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Sent as `OpenAI-Organization` when set.
    #[serde(default)]
    pub org_id: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base(),
            api_key: None,
            org_id: None,
        }
    }
}

/// Azure `OpenAI` deployment. `url` is the deployment base, e.g.
/// `https://{resource}.openai.azure.com/openai/deployments/{deployment}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Google Gemini upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_google_base")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: default_google_base(),
            api_key: None,
        }
    }
}

/// GitHub Copilot upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotConfig {
    /// Operator-held plugin token used when the caller brings none.
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default = "default_copilot_token_url")]
    pub token_url: String,
    #[serde(default = "default_copilot_chat_url")]
    pub chat_url: String,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            token_url: default_copilot_token_url(),
            chat_url: default_copilot_chat_url(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listen port (defaults to 3000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen address (defaults to `127.0.0.1`).
    #[serde(default = "default_host")]
    pub host: String,
    /// Hard deadline for one upstream call, including body streaming.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Optional outbound HTTP proxy for all upstream traffic.
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub copilot: CopilotConfig,
    /// Model overrides, e.g. `-all,+gpt-4o,gpt-4o-mini=Mini`. Enables the
    /// model gate when set.
    #[serde(default)]
    pub custom_models: Option<String>,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            request_timeout_secs: default_timeout_secs(),
            proxy_url: None,
            access: AccessConfig::default(),
            openai: OpenAIConfig::default(),
            azure: AzureConfig::default(),
            google: GoogleConfig::default(),
            copilot: CopilotConfig::default(),
            custom_models: None,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads defaults, then the optional YAML file, then `KEYGATE_*`
    /// environment variables (`__` separates nested keys).
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if a source cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Hard deadline applied to every upstream request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether the `/api/openai` route targets Azure instead of `OpenAI`.
    #[must_use]
    pub fn is_azure(&self) -> bool {
        self.azure.url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Base URL for a provider, before normalization. Copilot has no base:
    /// its chat URL is fixed.
    #[must_use]
    pub fn base_url(&self, provider: ProviderId) -> Option<&str> {
        match provider {
            ProviderId::OpenAI => Some(self.openai.base_url.as_str()),
            ProviderId::Azure => self.azure.url.as_deref(),
            ProviderId::Gemini => Some(self.google.base_url.as_str()),
            ProviderId::Copilot => None,
        }
    }

    /// Operator-held upstream credential for a provider, as configured.
    #[must_use]
    pub fn system_key(&self, provider: ProviderId) -> Option<&str> {
        let key = match provider {
            ProviderId::OpenAI => self.openai.api_key.as_deref(),
            ProviderId::Azure => self.azure.api_key.as_deref(),
            ProviderId::Gemini => self.google.api_key.as_deref(),
            ProviderId::Copilot => self.copilot.github_token.as_deref(),
        };
        key.filter(|k| !k.is_empty())
    }

    /// Custom model overrides, when non-empty.
    #[must_use]
    pub fn custom_models(&self) -> Option<&str> {
        self.custom_models
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
