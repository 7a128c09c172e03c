//! Configuration management for the Google Workspace MCP Server
//!
//! Handles paths, environment variables, and API endpoints.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result, WorkspaceMcpError};

/// Name of the client-credentials document
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Name of the token document
pub const TOKEN_FILE: &str = "token.json";

/// Configuration for the Google Workspace MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for storing configuration files
    pub config_dir: PathBuf,

    /// Path to the OAuth client credentials (`web` or `installed`)
    pub credentials_path: PathBuf,

    /// Path to the stored token (access/refresh)
    pub token_path: PathBuf,

    /// Port of the local OAuth callback
    pub oauth_callback_port: u16,

    /// Scopes requested during interactive consent
    pub scopes: Vec<String>,

    /// Time zone attached to created calendar events
    pub time_zone: String,

    /// Google API base URLs
    pub endpoints: ApiEndpoints,
}

impl Config {
    /// Create a new configuration from the environment, using `~/.google-workspace-mcp`
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        let mut config = Self::with_dir(&config_dir);

        if let Ok(path) = std::env::var("GOOGLE_MCP_CREDENTIALS_PATH") {
            config.credentials_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("GOOGLE_MCP_TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }

        if let Some(port) = std::env::var("GOOGLE_MCP_OAUTH_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            config.oauth_callback_port = port;
        }

        if let Ok(tz) = std::env::var("GOOGLE_MCP_TIME_ZONE") {
            config.time_zone = tz;
        }

        Ok(config)
    }

    /// Configuration rooted at `dir`, ignoring the environment
    pub fn with_dir(dir: &Path) -> Self {
        Self {
            config_dir: dir.to_path_buf(),
            credentials_path: dir.join(CREDENTIALS_FILE),
            token_path: dir.join(TOKEN_FILE),
            oauth_callback_port: 3000,
            scopes: vec![
                "https://mail.google.com/".to_string(),
                "https://www.googleapis.com/auth/drive".to_string(),
                "https://www.googleapis.com/auth/calendar".to_string(),
            ],
            time_zone: "America/New_York".to_string(),
            endpoints: ApiEndpoints::default(),
        }
    }

    /// Get the configuration directory, creating it if necessary
    fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| {
                WorkspaceMcpError::Config(ConfigError::DirNotFound {
                    path: "~".to_string(),
                })
            })?
            .join(".google-workspace-mcp");

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|_| {
                WorkspaceMcpError::Config(ConfigError::DirCreationFailed {
                    path: config_dir.display().to_string(),
                })
            })?;
        }

        Ok(config_dir)
    }

    /// Check if the client-credentials document exists
    pub fn credentials_exist(&self) -> bool {
        self.credentials_path.exists()
    }

    /// Copy `./credentials.json` into the config dir on first run
    pub fn find_and_copy_credentials(&self) -> Result<bool> {
        let local = std::env::current_dir()?.join(CREDENTIALS_FILE);

        if local.exists() && !self.credentials_exist() {
            std::fs::copy(&local, &self.credentials_path)?;
            tracing::info!("Copied {} into {}", local.display(), self.config_dir.display());
            return Ok(true);
        }

        Ok(false)
    }
}

/// Base URLs of the Google APIs used by the services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Gmail API, up to and including `/gmail/v1`
    pub gmail: String,

    /// Drive metadata API
    pub drive: String,

    /// Drive upload API
    pub drive_upload: String,

    /// Calendar API
    pub calendar: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            gmail: "https://gmail.googleapis.com/gmail/v1".to_string(),
            drive: "https://www.googleapis.com/drive/v3".to_string(),
            drive_upload: "https://www.googleapis.com/upload/drive/v3".to_string(),
            calendar: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

impl ApiEndpoints {
    /// Point every API at one mock server
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            gmail: format!("{}/gmail/v1", base),
            drive: format!("{}/drive/v3", base),
            drive_upload: format!("{}/upload/drive/v3", base),
            calendar: format!("{}/calendar/v3", base),
        }
    }
}
