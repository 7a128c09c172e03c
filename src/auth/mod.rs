//! OAuth2 credential handling
//!
//! Loads client credentials and tokens, verifies them against Google and
//! hands out an [`AuthSession`] to the API services.

pub mod authenticator;
pub mod client;
pub mod interactive;
pub mod provider;
pub mod store;

pub use authenticator::{AuthSession, Authenticator};
pub use client::OAuthClient;
pub use provider::{GoogleOAuthProvider, OAuthProvider};
pub use store::{ClientConfig, CredentialStore, Token};
