//! Provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a supported upstream AI provider.
///
/// Chosen from the inbound route and fixed for the lifetime of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Any `OpenAI`-compatible endpoint (api.openai.com or a self-hosted gateway).
    #[serde(rename = "openai")]
    OpenAI,
    /// Azure `OpenAI` deployments.
    Azure,
    /// GitHub Copilot chat, reached through a plugin-token exchange.
    Copilot,
    /// Google Gemini (`generativelanguage.googleapis.com`).
    Gemini,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Azure => write!(f, "azure"),
            Self::Copilot => write!(f, "copilot"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for ProviderId {
    type Err = crate::GateError;

    /// Parse a provider name or well-known alias into a [`ProviderId`].
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Config`](crate::GateError::Config) if the string
    /// does not match any known provider name or alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAI),
            "azure" => Ok(Self::Azure),
            "copilot" | "github" => Ok(Self::Copilot),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(crate::GateError::Config(format!("unknown provider: {other}"))),
        }
    }
}

impl ProviderId {
    /// Returns all known provider variants.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::OpenAI, Self::Azure, Self::Copilot, Self::Gemini]
    }

    /// Whether requests for this provider go through the model gate.
    ///
    /// Only the `OpenAI` family shares the model table; Gemini and Copilot
    /// model names are not covered by it.
    #[must_use]
    pub fn is_model_gated(self) -> bool {
        matches!(self, Self::OpenAI | Self::Azure)
    }
}
