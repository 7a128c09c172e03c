//! OAuth client built from a [`ClientConfig`].

use crate::auth::store::ClientConfig;
use crate::error::AuthError;

/// Redirect URI used when the credentials document supplies none
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/oauth2callback";

/// OAuth 2.0 client identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
}

impl OAuthClient {
    /// Build the client, rejecting empty identifiers before any network use
    pub fn from_config(config: ClientConfig) -> Result<Self, AuthError> {
        if config.client_id.trim().is_empty() {
            return Err(AuthError::ClientConstruction {
                reason: "client_id is empty".to_string(),
            });
        }
        if config.client_secret.trim().is_empty() {
            return Err(AuthError::ClientConstruction {
                reason: "client_secret is empty".to_string(),
            });
        }

        Ok(Self {
            client_id: config.client_id,
            client_secret: config.client_secret,
            redirect_uri: config
                .redirect_uri
                .filter(|uri| !uri.is_empty())
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            auth_uri: config.auth_uri,
            token_uri: config.token_uri,
        })
    }

    /// Consent URL requesting offline access so a refresh token is issued
    pub fn authorization_url(&self, scopes: &[String]) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_uri,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes.join(" "))
        )
    }
}
