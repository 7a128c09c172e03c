//! Persisted OAuth client configuration and token.
//!
//! A missing document and an unreadable one look the same to callers: both
//! are "not usable". Only a readable credentials document with neither a
//! `web` nor an `installed` section is reported as an invalid format.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{AuthError, Result};

/// Default Google authorization endpoint
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Default Google token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client configuration extracted from a credentials document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,

    /// First entry of `redirect_uris`, if any
    pub redirect_uri: Option<String>,

    pub auth_uri: String,
    pub token_uri: String,
}

/// One section of the credentials document
#[derive(Debug, Deserialize)]
struct ClientSection {
    #[serde(default)]
    client_id: String,

    #[serde(default)]
    client_secret: String,

    #[serde(default)]
    redirect_uris: Vec<String>,

    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// Credentials document: exactly one of the two sections is expected
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    web: Option<ClientSection>,
    installed: Option<ClientSection>,
}

/// Stored OAuth token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Access token
    pub access_token: String,

    /// Refresh token, required for silent renewal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Expiry as epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Provider fields this crate does not interpret (e.g. `id_token`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    /// A bare token with only an access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: None,
            scope: None,
            expiry_date: None,
            extra: Map::new(),
        }
    }

    /// Attach a refresh token
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Refresh token, treating an empty string as absent
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether the token expires within `margin_ms` of `now_ms`
    pub fn expires_within(&self, now_ms: i64, margin_ms: i64) -> bool {
        self.expiry_date
            .map(|expiry| expiry - now_ms <= margin_ms)
            .unwrap_or(false)
    }
}

/// Loads and saves the credentials and token documents
#[derive(Debug, Clone)]
pub struct CredentialStore {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl CredentialStore {
    /// Store over explicit paths
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
        }
    }

    /// Store over the paths of a [`Config`]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.credentials_path, &config.token_path)
    }

    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Load the client configuration.
    ///
    /// Absent or unparsable documents yield `CredentialsMissing`; a document
    /// without exactly one recognized section yields `CredentialsInvalid`.
    /// Empty `client_id`/`client_secret` are passed through and rejected when
    /// the client is built.
    pub async fn load_client_config(&self) -> std::result::Result<ClientConfig, AuthError> {
        let missing = || AuthError::CredentialsMissing {
            path: self.credentials_path.display().to_string(),
        };

        let content = tokio::fs::read_to_string(&self.credentials_path)
            .await
            .map_err(|e| {
                tracing::debug!("Credentials not readable: {}", e);
                missing()
            })?;

        let file: CredentialsFile = serde_json::from_str(&content).map_err(|e| {
            tracing::debug!("Credentials not parsable: {}", e);
            missing()
        })?;

        let section = match (file.web, file.installed) {
            (Some(web), None) => web,
            (None, Some(installed)) => installed,
            (Some(_), Some(_)) => {
                return Err(AuthError::CredentialsInvalid {
                    reason: "both 'web' and 'installed' sections present".to_string(),
                })
            }
            (None, None) => {
                return Err(AuthError::CredentialsInvalid {
                    reason: "expected 'installed' or 'web' credentials".to_string(),
                })
            }
        };

        Ok(ClientConfig {
            client_id: section.client_id,
            client_secret: section.client_secret,
            redirect_uri: section.redirect_uris.into_iter().next(),
            auth_uri: section
                .auth_uri
                .unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
            token_uri: section
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    /// Load the token, or `None` when it is absent, unparsable or has no access token
    pub async fn load_token(&self) -> Option<Token> {
        let content = tokio::fs::read_to_string(&self.token_path).await.ok()?;

        let token: Token = match serde_json::from_str(&content) {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!("Token not parsable: {}", e);
                return None;
            }
        };

        if token.access_token.is_empty() {
            return None;
        }

        Some(token)
    }

    /// Overwrite the token document.
    ///
    /// Writes a uniquely named sibling temp file and renames it over the
    /// target, so a concurrent `load_token` sees either the old or the new
    /// document and concurrent writers never share a temp file.
    pub async fn save_token(&self, token: &Token) -> Result<()> {
        let content = serde_json::to_string_pretty(token)?;
        let token_path = self.token_path.clone();

        tokio::task::spawn_blocking(move || write_replacing(&token_path, content.as_bytes()))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        tracing::debug!("Token saved to {}", self.token_path.display());
        Ok(())
    }
}

fn write_replacing(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".token")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("credentials.json"), dir.path().join("token.json"))
    }

    async fn write(dir: &TempDir, name: &str, content: &str) {
        tokio::fs::write(dir.path().join(name), content).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_credentials_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = store_in(&dir).load_client_config().await.unwrap_err();
        assert!(matches!(err, AuthError::CredentialsMissing { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_credentials_look_like_missing() {
        let dir = TempDir::new().unwrap();
        write(&dir, "credentials.json", "{not json").await;

        let err = store_in(&dir).load_client_config().await.unwrap_err();
        assert!(matches!(err, AuthError::CredentialsMissing { .. }));
    }

    #[tokio::test]
    async fn test_unrecognized_shape_is_invalid() {
        let dir = TempDir::new().unwrap();
        write(&dir, "credentials.json", r#"{"service_account": {"client_id": "x"}}"#).await;

        let err = store_in(&dir).load_client_config().await.unwrap_err();
        assert!(matches!(err, AuthError::CredentialsInvalid { .. }));
    }

    #[tokio::test]
    async fn test_both_shapes_is_invalid() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "credentials.json",
            r#"{"web": {"client_id": "a", "client_secret": "b"},
                "installed": {"client_id": "c", "client_secret": "d"}}"#,
        )
        .await;

        let err = store_in(&dir).load_client_config().await.unwrap_err();
        assert!(matches!(err, AuthError::CredentialsInvalid { .. }));
    }

    #[tokio::test]
    async fn test_web_shape_uses_first_redirect_uri() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "credentials.json",
            r#"{"web": {
                "client_id": "id",
                "client_secret": "secret",
                "redirect_uris": ["http://localhost:8080/cb", "http://other"]
            }}"#,
        )
        .await;

        let config = store_in(&dir).load_client_config().await.unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.redirect_uri.as_deref(), Some("http://localhost:8080/cb"));
        assert_eq!(config.token_uri, DEFAULT_TOKEN_URI);
    }

    #[tokio::test]
    async fn test_installed_shape_without_redirect_uris() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "credentials.json",
            r#"{"installed": {"client_id": "X", "client_secret": "Y"}}"#,
        )
        .await;

        let config = store_in(&dir).load_client_config().await.unwrap();
        assert_eq!(config.client_secret, "Y");
        assert!(config.redirect_uri.is_none());
    }

    #[tokio::test]
    async fn test_token_without_access_token_is_not_found() {
        let dir = TempDir::new().unwrap();
        write(&dir, "token.json", r#"{"refresh_token": "r"}"#).await;
        assert!(store_in(&dir).load_token().await.is_none());

        write(&dir, "token.json", r#"{"access_token": "", "refresh_token": "r"}"#).await;
        assert!(store_in(&dir).load_token().await.is_none());
    }

    #[tokio::test]
    async fn test_save_token_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "token.json",
            r#"{"access_token": "old", "refresh_token": "r", "id_token": "jwt"}"#,
        )
        .await;
        let store = store_in(&dir);

        let loaded = store.load_token().await.unwrap();
        assert_eq!(loaded.extra["id_token"], "jwt");

        let renewed = Token::new("new").with_refresh_token("r");
        tokio_test::assert_ok!(store.save_token(&renewed).await);

        assert_eq!(store.load_token().await.unwrap(), renewed);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_saves_leave_one_complete_token() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let tokens: Vec<Token> = (0..8).map(|i| Token::new(format!("access-{}", i))).collect();
        let results = futures::future::join_all(tokens.iter().map(|t| store.save_token(t))).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let saved = store.load_token().await.unwrap();
        assert!(tokens.contains(&saved));

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("token.json")]);
    }

    #[test]
    fn test_expires_within() {
        let mut token = Token::new("a");
        assert!(!token.expires_within(1_000, 60_000));

        token.expiry_date = Some(50_000);
        assert!(token.expires_within(1_000, 60_000));
        assert!(!token.expires_within(1_000, 10_000));
    }
}
