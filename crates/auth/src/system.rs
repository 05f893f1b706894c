//! Operator-held upstream credentials.

use crate::resolver::Grant;
use keygate_config::Config;
use keygate_types::ProviderId;
use secrecy::{ExposeSecret as _, SecretString};
use std::collections::HashMap;

/// One upstream credential per provider, taken from the configuration.
#[derive(Default)]
pub struct SystemCredentials {
    keys: HashMap<ProviderId, SecretString>,
}

impl SystemCredentials {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let keys = ProviderId::all()
            .iter()
            .filter_map(|p| {
                config
                    .system_key(*p)
                    .map(|k| (*p, SecretString::from(k.to_string())))
            })
            .collect();
        Self { keys }
    }

    /// The operator's credential for `provider`. `None` is a valid outcome:
    /// the request is then forwarded unauthenticated.
    #[must_use]
    pub fn select(&self, provider: ProviderId) -> Option<&SecretString> {
        self.keys.get(&provider)
    }
}

/// The credential finally attached to the outbound request.
#[derive(Debug)]
pub enum UpstreamCredential {
    /// The caller's own API key.
    Caller(String),
    /// The operator's key for this provider.
    System(SecretString),
    /// Nothing to attach.
    None,
}

impl UpstreamCredential {
    /// Builds the outbound credential from a resolver grant.
    #[must_use]
    pub fn from_grant(grant: Grant, system: &SystemCredentials, provider: ProviderId) -> Self {
        if let Some(key) = grant.api_key {
            tracing::debug!(%provider, "using caller api key");
            return Self::Caller(key);
        }
        if !grant.inject_system_credential {
            return Self::None;
        }
        match system.select(provider) {
            Some(key) => {
                tracing::debug!(%provider, "using system api key");
                Self::System(key.clone())
            }
            None => {
                tracing::info!(%provider, "no system api key configured, forwarding unauthenticated");
                Self::None
            }
        }
    }

    /// The raw secret, if any.
    #[must_use]
    pub fn expose(&self) -> Option<&str> {
        match self {
            Self::Caller(key) => Some(key),
            Self::System(key) => Some(key.expose_secret()),
            Self::None => None,
        }
    }
}
