//! Token authenticator: turns persisted credentials into a verified session.
//!
//! ```text
//! Unauthenticated -> ConfigLoaded -> ClientBuilt -> TokenLoaded -> Verified
//! ```
//!
//! Every transition can fail, which ends the attempt. When the probe in
//! `TokenLoaded` fails, recovery is one refresh and one re-probe, never more.
//! Once verified, the session is cached for the life of the authenticator.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

use crate::auth::client::OAuthClient;
use crate::auth::provider::{GoogleOAuthProvider, OAuthProvider};
use crate::auth::store::{ClientConfig, CredentialStore, Token};
use crate::config::Config;
use crate::error::{AuthError, Result};

/// Refresh tokens this close to expiry before handing them out
const EXPIRY_MARGIN_MS: i64 = 60_000;

enum AuthState {
    Unauthenticated,
    ConfigLoaded(ClientConfig),
    ClientBuilt(OAuthClient),
    TokenLoaded { client: OAuthClient, token: Token },
    Verified(Arc<AuthSession>),
}

impl AuthState {
    fn name(&self) -> &'static str {
        match self {
            AuthState::Unauthenticated => "UNAUTHENTICATED",
            AuthState::ConfigLoaded(_) => "CONFIG_LOADED",
            AuthState::ClientBuilt(_) => "CLIENT_BUILT",
            AuthState::TokenLoaded { .. } => "TOKEN_LOADED",
            AuthState::Verified(_) => "VERIFIED",
        }
    }
}

/// The live authenticated handle shared by all services
pub struct AuthSession {
    client: OAuthClient,
    token: RwLock<Token>,
    provider: Arc<dyn OAuthProvider>,
    store: CredentialStore,
}

impl fmt::Debug for AuthSession {
    // Tokens stay out of logs and test output
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("client_id", &self.client.client_id)
            .field("token_path", &self.store.token_path())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    fn new(
        client: OAuthClient,
        token: Token,
        provider: Arc<dyn OAuthProvider>,
        store: CredentialStore,
    ) -> Self {
        Self {
            client,
            token: RwLock::new(token),
            provider,
            store,
        }
    }

    /// OAuth client this session was built from
    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    /// Snapshot of the active token
    pub async fn token(&self) -> Token {
        self.token.read().await.clone()
    }

    /// Bearer token for an API call.
    ///
    /// A token about to expire is refreshed once and persisted; without a
    /// refresh token the current access token is returned as-is.
    pub async fn access_token(&self) -> Result<String> {
        let now_ms = chrono::Utc::now().timestamp_millis();

        {
            let token = self.token.read().await;
            if !token.expires_within(now_ms, EXPIRY_MARGIN_MS) || token.refresh_token().is_none() {
                return Ok(token.access_token.clone());
            }
        }

        let mut token = self.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if !token.expires_within(now_ms, EXPIRY_MARGIN_MS) {
            return Ok(token.access_token.clone());
        }
        let Some(refresh_token) = token.refresh_token().map(str::to_string) else {
            return Ok(token.access_token.clone());
        };

        tracing::info!("Access token expiring, refreshing");
        let renewed = self.provider.refresh(&self.client, &refresh_token).await?;
        self.store.save_token(&renewed).await?;
        *token = renewed;

        Ok(token.access_token.clone())
    }
}

/// Runs the authentication sequence at most once to success
pub struct Authenticator {
    store: CredentialStore,
    provider: Arc<dyn OAuthProvider>,
    session: OnceCell<Arc<AuthSession>>,
}

impl Authenticator {
    /// Create an authenticator over a store and provider
    pub fn new(store: CredentialStore, provider: Arc<dyn OAuthProvider>) -> Self {
        Self {
            store,
            provider,
            session: OnceCell::new(),
        }
    }

    /// Authenticator talking to Google with the paths and endpoints of `config`
    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        let provider = GoogleOAuthProvider::new(http_client, config.endpoints.gmail.clone());
        Self::new(CredentialStore::from_config(config), Arc::new(provider))
    }

    /// Whether a verified session is cached
    pub fn is_ready(&self) -> bool {
        self.session.initialized()
    }

    /// Return the verified session, running the sequence if needed.
    ///
    /// Concurrent first callers share one attempt. A failed attempt caches
    /// nothing, so a later call starts over from `UNAUTHENTICATED`.
    pub async fn initialize(&self) -> std::result::Result<Arc<AuthSession>, AuthError> {
        let session = self.session.get_or_try_init(|| self.authenticate()).await?;
        Ok(Arc::clone(session))
    }

    async fn authenticate(&self) -> std::result::Result<Arc<AuthSession>, AuthError> {
        let mut state = AuthState::Unauthenticated;

        loop {
            if let AuthState::Verified(session) = state {
                tracing::info!("Authentication verified");
                return Ok(session);
            }

            let from = state.name();
            state = match self.advance(state).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!("Authentication failed in {}: {}", from, e);
                    return Err(e);
                }
            };
            tracing::debug!("Auth state {} -> {}", from, state.name());
        }
    }

    async fn advance(&self, state: AuthState) -> std::result::Result<AuthState, AuthError> {
        match state {
            AuthState::Unauthenticated => {
                let config = self.store.load_client_config().await?;
                Ok(AuthState::ConfigLoaded(config))
            }
            AuthState::ConfigLoaded(config) => {
                let client = OAuthClient::from_config(config)?;
                Ok(AuthState::ClientBuilt(client))
            }
            AuthState::ClientBuilt(client) => match self.store.load_token().await {
                Some(token) => Ok(AuthState::TokenLoaded { client, token }),
                None => Err(AuthError::TokenMissing {
                    path: self.store.token_path().display().to_string(),
                }),
            },
            AuthState::TokenLoaded { client, token } => {
                let token = self.verify(&client, token).await?;
                let session = AuthSession::new(
                    client,
                    token,
                    Arc::clone(&self.provider),
                    self.store.clone(),
                );
                Ok(AuthState::Verified(Arc::new(session)))
            }
            verified @ AuthState::Verified(_) => Ok(verified),
        }
    }

    async fn verify(
        &self,
        client: &OAuthClient,
        token: Token,
    ) -> std::result::Result<Token, AuthError> {
        match self.provider.probe(&token.access_token).await {
            Ok(()) => Ok(token),
            Err(e) => {
                tracing::warn!("Token probe failed ({}), attempting a single refresh", e);
                self.recover(client, &token)
                    .await
                    .map_err(AuthError::authentication_failed)
            }
        }
    }

    /// One refresh, one persist, one re-probe. The re-probe outcome is final.
    async fn recover(
        &self,
        client: &OAuthClient,
        token: &Token,
    ) -> std::result::Result<Token, AuthError> {
        let refresh_token = token.refresh_token().ok_or(AuthError::NoRefreshToken)?;

        let renewed = self.provider.refresh(client, refresh_token).await?;

        self.store
            .save_token(&renewed)
            .await
            .map_err(|e| AuthError::TokenPersistFailed {
                message: e.to_string(),
            })?;

        self.provider.probe(&renewed.access_token).await?;
        tracing::info!("Token refreshed and verified");

        Ok(renewed)
    }
}
