//! Token material returned by sign-in and token exchange.

use serde::{Deserialize, Serialize};

/// The result of a successful token exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResult {
    /// Access token scoped to the target organization.
    pub access_token: String,
    /// Token type, normally `"Bearer"`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Refresh token, when the provider issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// ID token, when the provider issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Granted scopes, space separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenResult {
    /// Create a bearer token result with no optional fields.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_in: None,
            refresh_token: None,
            id_token: None,
            scope: None,
        }
    }
}

impl std::fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResult")
            .field("access_token", &"****")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_masks_access_token() {
        let token = TokenResult::bearer("secret-value");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("secret-value"));
    }

    #[test]
    fn test_deserialize_defaults_token_type() {
        let token: TokenResult =
            serde_json::from_str(r#"{"accessToken":"abc","expiresIn":3600}"#).expect("parse");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, Some(3600));
    }
}
