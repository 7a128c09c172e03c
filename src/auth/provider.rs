//! Network side of the token lifecycle: probing, refreshing, code exchange.

use async_trait::async_trait;
use serde::Deserialize;

use crate::auth::client::OAuthClient;
use crate::auth::store::Token;
use crate::error::AuthError;

/// Token endpoint and probe operations used by the authenticator
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// One lightweight authenticated call proving `access_token` is usable
    async fn probe(&self, access_token: &str) -> Result<(), AuthError>;

    /// Exchange `refresh_token` for a new token
    async fn refresh(&self, client: &OAuthClient, refresh_token: &str) -> Result<Token, AuthError>;
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, fallback_refresh: Option<&str>) -> Token {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut token = Token::new(self.access_token);
        token.refresh_token = self
            .refresh_token
            .or_else(|| fallback_refresh.map(str::to_string));
        token.token_type = self.token_type;
        token.scope = self.scope;
        token.expiry_date = self.expires_in.map(|secs| now_ms + secs * 1000);
        if let Some(id_token) = self.id_token {
            token.extra.insert("id_token".to_string(), id_token.into());
        }
        token
    }
}

/// OAuth error body, e.g. `{"error": "invalid_grant", "error_description": "..."}`
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthErrorResponse {
    fn describe(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error.clone(),
        }
    }
}

/// Gmail profile, used as the probe target
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email_address: String,
}

/// Google implementation of [`OAuthProvider`]
pub struct GoogleOAuthProvider {
    http_client: reqwest::Client,

    /// Gmail API base, probed with `GET {gmail_base}/users/me/profile`
    gmail_base: String,
}

impl GoogleOAuthProvider {
    /// Create a provider probing the Gmail API at `gmail_base`
    pub fn new(http_client: reqwest::Client, gmail_base: impl Into<String>) -> Self {
        Self {
            http_client,
            gmail_base: gmail_base.into(),
        }
    }

    /// Fetch the profile of the token's owner
    pub async fn profile(&self, access_token: &str) -> Result<Profile, AuthError> {
        let url = format!("{}/users/me/profile", self.gmail_base);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::ProbeRejected {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::ProbeRejected {
                message: format!("{}: {}", status, text),
            });
        }

        response.json().await.map_err(|e| AuthError::ProbeRejected {
            message: e.to_string(),
        })
    }

    /// Exchange an authorization code for a token
    pub async fn exchange_code(&self, client: &OAuthClient, code: &str) -> Result<Token, AuthError> {
        let params = [
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", client.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&client.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<OAuthErrorResponse>(&text) {
                Ok(body) if body.error == "redirect_uri_mismatch" => {
                    AuthError::RedirectUriMismatch {
                        redirect_uri: client.redirect_uri.clone(),
                    }
                }
                Ok(body) => AuthError::TokenExchangeFailed {
                    message: body.describe(),
                },
                Err(_) => AuthError::TokenExchangeFailed { message: text },
            });
        }

        let token_response: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| AuthError::TokenExchangeFailed {
                    message: e.to_string(),
                })?;

        Ok(token_response.into_token(None))
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthProvider {
    async fn probe(&self, access_token: &str) -> Result<(), AuthError> {
        let profile = self.profile(access_token).await?;
        tracing::debug!("Token probe succeeded for {}", profile.email_address);
        Ok(())
    }

    async fn refresh(&self, client: &OAuthClient, refresh_token: &str) -> Result<Token, AuthError> {
        let params = [
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&client.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OAuthErrorResponse>(&text)
                .map(|body| body.describe())
                .unwrap_or(text);
            return Err(AuthError::RefreshFailed { message });
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| AuthError::RefreshFailed {
                message: e.to_string(),
            })?;

        Ok(token_response.into_token(Some(refresh_token)))
    }
}
