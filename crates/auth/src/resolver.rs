//! Inbound access control.
//!
//! The resolver is a pure function of the `Authorization` header, the
//! current access policy, and the current time. It never mutates the
//! request: callers turn the returned [`Decision`] into an outbound
//! credential with [`UpstreamCredential::from_grant`](crate::UpstreamCredential::from_grant).

use keygate_config::AccessConfig;
use keygate_types::{AccessCredential, GateError, ProviderId};
use std::{
    collections::HashMap,
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

/// Borrowed view of the access settings from one configuration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy<'a> {
    pub code_required: bool,
    pub hide_user_api_key: bool,
    pub code_prefix: &'a str,
    /// Access code → expiry in unix seconds (`None` never expires).
    pub codes: &'a HashMap<String, Option<u64>>,
}

impl<'a> AccessPolicy<'a> {
    #[must_use]
    pub fn from_config(access: &'a AccessConfig) -> Self {
        Self {
            code_required: access.code_required(),
            hide_user_api_key: access.hide_user_api_key,
            code_prefix: &access.code_prefix,
            codes: &access.codes,
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    CodeEmpty,
    CodeInvalid,
    CodeExpired,
    ApiKeyDisabled,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::CodeEmpty => "access code empty",
            Self::CodeInvalid => "access code invalid",
            Self::CodeExpired => "access code expired",
            Self::ApiKeyDisabled => "caller API keys are disabled",
        };
        f.write_str(msg)
    }
}

impl From<DenyReason> for GateError {
    fn from(reason: DenyReason) -> Self {
        Self::AccessDenied(reason.to_string())
    }
}

/// An allowed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// The operator's credential must be attached upstream.
    pub inject_system_credential: bool,
    /// The caller's own key, forwarded as-is when present.
    pub api_key: Option<String>,
}

/// Outcome of [`CredentialResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny(DenyReason),
}

impl Decision {
    /// Converts a denial into [`GateError::AccessDenied`].
    ///
    /// # Errors
    ///
    /// Returns the denial reason as an error.
    pub fn into_result(self) -> Result<Grant, GateError> {
        match self {
            Self::Allow(grant) => Ok(grant),
            Self::Deny(reason) => Err(reason.into()),
        }
    }
}

/// Applies the access policy to an inbound `Authorization` header.
pub struct CredentialResolver;

impl CredentialResolver {
    /// Decides against the current wall clock.
    #[must_use]
    pub fn resolve(raw_authorization: &str, provider: ProviderId, policy: &AccessPolicy<'_>) -> Decision {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self::resolve_at(raw_authorization, provider, policy, now)
    }

    /// Decides as of `now` (unix seconds).
    #[must_use]
    pub fn resolve_at(
        raw_authorization: &str,
        provider: ProviderId,
        policy: &AccessPolicy<'_>,
        now: u64,
    ) -> Decision {
        let credential = AccessCredential::parse(raw_authorization, policy.code_prefix);
        let api_key = credential.api_key().map(str::to_string);

        if policy.code_required && api_key.is_none() {
            let code = credential.access_code().unwrap_or_default();
            if code.is_empty() {
                tracing::debug!(%provider, "denied: no access code");
                return Decision::Deny(DenyReason::CodeEmpty);
            }
            match policy.codes.get(code) {
                None => {
                    tracing::debug!(%provider, "denied: unknown access code");
                    return Decision::Deny(DenyReason::CodeInvalid);
                }
                Some(Some(expires_at)) if *expires_at < now => {
                    tracing::debug!(%provider, expires_at, "denied: access code expired");
                    return Decision::Deny(DenyReason::CodeExpired);
                }
                Some(_) => {}
            }
        }

        if policy.hide_user_api_key && api_key.is_some() {
            tracing::debug!(%provider, "denied: caller api key while keys are hidden");
            return Decision::Deny(DenyReason::ApiKeyDisabled);
        }

        Decision::Allow(Grant {
            inject_system_credential: api_key.is_none(),
            api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;
    const FUTURE: u64 = NOW + 86_400;
    const PAST: u64 = NOW - 86_400;

    fn codes() -> HashMap<String, Option<u64>> {
        HashMap::from([
            ("abc".to_string(), Some(FUTURE)),
            ("old".to_string(), Some(PAST)),
            ("forever".to_string(), None),
        ])
    }

    fn policy(codes: &HashMap<String, Option<u64>>, required: bool, hide: bool) -> AccessPolicy<'_> {
        AccessPolicy {
            code_required: required,
            hide_user_api_key: hide,
            code_prefix: "nk-",
            codes,
        }
    }

    fn resolve(header: &str, policy: &AccessPolicy<'_>) -> Decision {
        CredentialResolver::resolve_at(header, ProviderId::OpenAI, policy, NOW)
    }

    #[test]
    fn test_valid_code_injects_system_credential() {
        let codes = codes();
        let d = resolve("Bearer nk-abc", &policy(&codes, true, false));
        assert_eq!(
            d,
            Decision::Allow(Grant {
                inject_system_credential: true,
                api_key: None
            })
        );
    }

    #[test]
    fn test_unknown_code_is_invalid() {
        let codes = codes();
        let d = resolve("Bearer nk-xyz", &policy(&codes, true, false));
        assert_eq!(d, Decision::Deny(DenyReason::CodeInvalid));
    }

    #[test]
    fn test_past_code_is_expired() {
        let codes = codes();
        let d = resolve("Bearer nk-old", &policy(&codes, true, false));
        assert_eq!(d, Decision::Deny(DenyReason::CodeExpired));
    }

    #[test]
    fn test_code_expiring_now_is_still_valid() {
        let codes = HashMap::from([("edge".to_string(), Some(NOW))]);
        let d = resolve("Bearer nk-edge", &policy(&codes, true, false));
        assert!(matches!(d, Decision::Allow(_)));
    }

    #[test]
    fn test_code_without_expiry_never_expires() {
        let codes = codes();
        let d = resolve("Bearer nk-forever", &policy(&codes, true, false));
        assert!(matches!(d, Decision::Allow(_)));
    }

    #[test]
    fn test_empty_and_missing_code_are_both_empty() {
        let codes = codes();
        let p = policy(&codes, true, false);
        assert_eq!(resolve("Bearer nk-", &p), Decision::Deny(DenyReason::CodeEmpty));
        assert_eq!(resolve("", &p), Decision::Deny(DenyReason::CodeEmpty));
    }

    #[test]
    fn test_api_key_bypasses_code_checks() {
        let codes = codes();
        let d = resolve("Bearer sk-user", &policy(&codes, true, false));
        assert_eq!(
            d,
            Decision::Allow(Grant {
                inject_system_credential: false,
                api_key: Some("sk-user".into())
            })
        );
    }

    #[test]
    fn test_hidden_api_key_denied_even_when_code_optional() {
        let codes = codes();
        let d = resolve("Bearer sk-user", &policy(&codes, false, true));
        assert_eq!(d, Decision::Deny(DenyReason::ApiKeyDisabled));
        let d = resolve("Bearer sk-user", &policy(&codes, true, true));
        assert_eq!(d, Decision::Deny(DenyReason::ApiKeyDisabled));
    }

    #[test]
    fn test_hidden_api_key_still_allows_codes() {
        let codes = codes();
        let d = resolve("Bearer nk-abc", &policy(&codes, true, true));
        assert!(matches!(d, Decision::Allow(Grant { inject_system_credential: true, .. })));
    }

    #[test]
    fn test_code_not_required_allows_anything() {
        let codes = codes();
        let p = policy(&codes, false, false);
        assert!(matches!(resolve("", &p), Decision::Allow(Grant { inject_system_credential: true, .. })));
        assert!(matches!(resolve("Bearer nk-bogus", &p), Decision::Allow(_)));
    }

    #[test]
    fn test_deny_reason_messages() {
        assert_eq!(DenyReason::CodeInvalid.to_string(), "access code invalid");
        assert_eq!(DenyReason::CodeExpired.to_string(), "access code expired");
        let err: GateError = DenyReason::CodeEmpty.into();
        assert!(matches!(err, GateError::AccessDenied(m) if m == "access code empty"));
    }

    #[test]
    fn test_into_result() {
        assert!(Decision::Deny(DenyReason::CodeInvalid).into_result().is_err());
        let grant = Decision::Allow(Grant {
            inject_system_credential: true,
            api_key: None,
        })
        .into_result()
        .unwrap();
        assert!(grant.inject_system_credential);
    }

    #[test]
    fn test_policy_from_config() {
        let access = AccessConfig {
            codes: codes(),
            ..AccessConfig::default()
        };
        let p = AccessPolicy::from_config(&access);
        assert!(p.code_required);
        assert_eq!(p.code_prefix, "nk-");
    }
}
