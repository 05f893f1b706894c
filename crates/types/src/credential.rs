//! Parsed form of the inbound `Authorization` header.

/// What the caller presented in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessCredential {
    /// Nothing usable was sent.
    Missing,
    /// An operator-issued access code, prefix already stripped. May be empty
    /// when the caller sent the prefix alone.
    AccessCode(String),
    /// A caller-supplied upstream API key, used verbatim.
    ApiKey(String),
}

impl AccessCredential {
    /// Parses a raw `Authorization` header value.
    ///
    /// Strips every `Bearer ` marker and surrounding whitespace, then
    /// classifies the remaining token by `code_prefix`.
    #[must_use]
    pub fn parse(raw: &str, code_prefix: &str) -> Self {
        let token = raw.replace("Bearer ", "");
        let token = token.trim();
        if !code_prefix.is_empty()
            && let Some(code) = token.strip_prefix(code_prefix)
        {
            return Self::AccessCode(code.trim().to_string());
        }
        if token.is_empty() {
            Self::Missing
        } else {
            Self::ApiKey(token.to_string())
        }
    }

    /// The caller's own API key, if one was supplied.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        match self {
            Self::ApiKey(key) => Some(key),
            _ => None,
        }
    }

    /// The access code, if one was supplied (possibly empty).
    #[must_use]
    pub fn access_code(&self) -> Option<&str> {
        match self {
            Self::AccessCode(code) => Some(code),
            _ => None,
        }
    }
}

/// Masks a secret for logging, keeping at most a 4-character prefix.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{prefix}****")
    }
}
