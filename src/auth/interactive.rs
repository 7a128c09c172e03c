//! Interactive consent flow behind the `auth` subcommand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{extract::Query, response::Html, routing::get, Router};
use reqwest::Url;
use tokio::io::AsyncBufReadExt;
use tokio::sync::oneshot;

use crate::auth::client::OAuthClient;
use crate::auth::provider::GoogleOAuthProvider;
use crate::auth::store::CredentialStore;
use crate::config::Config;
use crate::error::{AuthError, Result};

/// Where the local callback server should listen
#[derive(Debug, Clone, PartialEq, Eq)]
struct CallbackTarget {
    port: u16,
    path: String,

    /// Redirect URI to send to Google, with the port made explicit
    redirect_uri: String,
}

/// Resolve a loopback redirect URI into a listen target.
///
/// Returns `None` for anything that is not `http://localhost` or
/// `http://127.0.0.1`; those flows read the code from stdin instead.
fn callback_target(redirect_uri: &str, default_port: u16) -> Option<CallbackTarget> {
    let mut url = Url::parse(redirect_uri).ok()?;
    if url.scheme() != "http" {
        return None;
    }
    match url.host_str() {
        Some("localhost") | Some("127.0.0.1") => {}
        _ => return None,
    }

    let port = url.port().unwrap_or(default_port);
    url.set_port(Some(port)).ok()?;

    let path = match url.path() {
        "" => "/".to_string(),
        p => p.to_string(),
    };

    Some(CallbackTarget {
        port,
        path,
        redirect_uri: url.to_string(),
    })
}

/// Run the consent flow, save the token and return the connected address
pub async fn authenticate_interactive(config: &Config) -> Result<String> {
    let store = CredentialStore::from_config(config);
    let mut client = OAuthClient::from_config(store.load_client_config().await?)?;
    let provider = GoogleOAuthProvider::new(reqwest::Client::new(), config.endpoints.gmail.clone());

    let target = callback_target(&client.redirect_uri, config.oauth_callback_port);
    if let Some(target) = &target {
        client.redirect_uri = target.redirect_uri.clone();
    }

    let auth_url = client.authorization_url(&config.scopes);
    eprintln!("\nPlease visit this URL to authenticate:");
    eprintln!("{}\n", auth_url);

    if let Err(e) = open::that(&auth_url) {
        eprintln!("Could not open browser automatically: {}", e);
        eprintln!("Please open the URL manually.");
    }

    let code = match target {
        Some(target) => wait_for_callback(&target).await?,
        None => read_code_from_stdin().await?,
    };

    eprintln!("Received authorization code, exchanging for tokens...");
    let token = provider.exchange_code(&client, &code).await?;
    store.save_token(&token).await?;

    let profile = provider.profile(&token.access_token).await?;
    eprintln!("Connected to Gmail: {}", profile.email_address);

    Ok(profile.email_address)
}

async fn wait_for_callback(target: &CallbackTarget) -> Result<String> {
    let (tx, rx) = oneshot::channel::<std::result::Result<String, AuthError>>();
    let tx = Arc::new(Mutex::new(Some(tx)));

    let callback_handler = move |Query(params): Query<HashMap<String, String>>| {
        let tx = Arc::clone(&tx);
        async move {
            let outcome = match (params.get("code"), params.get("error")) {
                (Some(code), _) => Ok(code.clone()),
                (None, Some(error)) => Err(AuthError::CallbackError {
                    message: error.clone(),
                }),
                (None, None) => Err(AuthError::NoAuthCode),
            };
            let page = match &outcome {
                Ok(_) => "<html><body><h1>Authentication successful!</h1><p>You can close this window.</p></body></html>",
                Err(_) => "<html><body><h1>Authentication failed</h1><p>No authorization code received.</p></body></html>",
            };

            if let Ok(mut guard) = tx.lock() {
                if let Some(tx) = guard.take() {
                    let _ = tx.send(outcome);
                }
            }
            Html(page)
        }
    };

    let app = Router::new().route(&target.path, get(callback_handler));

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], target.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    eprintln!("Waiting for authentication callback on port {}...", target.port);

    tokio::select! {
        result = axum::serve(listener, app) => {
            let message = match result {
                Ok(()) => "callback server stopped".to_string(),
                Err(e) => e.to_string(),
            };
            Err(AuthError::CallbackError { message }.into())
        }
        outcome = rx => match outcome {
            Ok(outcome) => Ok(outcome?),
            Err(_) => Err(AuthError::NoAuthCode.into()),
        }
    }
}

async fn read_code_from_stdin() -> Result<String> {
    eprint!("Enter the authorization code: ");

    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;

    let code = line.trim();
    if code.is_empty() {
        return Err(AuthError::NoAuthCode.into());
    }
    Ok(code.to_string())
}
