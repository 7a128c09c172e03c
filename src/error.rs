//! Error types for the Google Workspace MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Google Workspace MCP Server
#[derive(Error, Debug)]
pub enum WorkspaceMcpError {
    /// OAuth credential and token lifecycle errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Errors reported by a Google API call. Displayed verbatim.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OAuth credential and token errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// The client-credentials document is absent or unreadable
    #[error("Failed to load credentials from {path}")]
    CredentialsMissing { path: String },

    #[error("Invalid credentials format: {reason}")]
    CredentialsInvalid { reason: String },

    #[error("Missing client credentials: {reason}")]
    ClientConstruction { reason: String },

    #[error("No token found at {path}")]
    TokenMissing { path: String },

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Failed to refresh access token: {message}")]
    RefreshFailed { message: String },

    #[error("Token probe rejected: {message}")]
    ProbeRejected { message: String },

    #[error("Failed to persist refreshed token: {message}")]
    TokenPersistFailed { message: String },

    /// Terminal failure after the probe failed and recovery did not succeed
    #[error("Authentication failed: {cause}")]
    AuthenticationFailed { cause: Box<AuthError> },

    #[error("Redirect URI mismatch: {redirect_uri} is not registered for this client")]
    RedirectUriMismatch { redirect_uri: String },

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("No authorization code provided")]
    NoAuthCode,
}

impl AuthError {
    /// Wrap a recovery failure into the terminal umbrella variant
    pub fn authentication_failed(cause: AuthError) -> Self {
        AuthError::AuthenticationFailed {
            cause: Box::new(cause),
        }
    }
}

/// Google API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// A forwarded call failed upstream; the provider message is kept as-is
    #[error("{message}")]
    UpstreamCallFailed { status: u16, message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create config directory: {path}")]
    DirCreationFailed { path: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, WorkspaceMcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::CredentialsMissing {
            path: "/path/to/credentials.json".to_string(),
        };
        assert!(err.to_string().contains("/path/to/credentials.json"));
    }

    #[test]
    fn test_error_conversion() {
        let auth_err = AuthError::NoAuthCode;
        let err: WorkspaceMcpError = auth_err.into();
        assert!(matches!(err, WorkspaceMcpError::Auth(_)));
    }

    #[test]
    fn test_authentication_failed_cites_cause() {
        let err = AuthError::authentication_failed(AuthError::NoRefreshToken);
        assert_eq!(
            err.to_string(),
            "Authentication failed: No refresh token available"
        );
    }

    #[test]
    fn test_upstream_message_is_verbatim() {
        let err: WorkspaceMcpError = ApiError::UpstreamCallFailed {
            status: 404,
            message: "Requested entity was not found.".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Requested entity was not found.");
    }

    #[test]
    fn test_validation_error_display() {
        let err: WorkspaceMcpError = ValidationError::InvalidEmail {
            email: "nope".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Validation error: Invalid email address: nope");
    }

    #[test]
    fn test_unknown_tool_display() {
        let err = McpError::UnknownTool {
            name: "launch_rocket".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown tool: launch_rocket");
    }
}
