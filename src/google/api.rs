//! Bearer-authenticated access to the Google REST APIs.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::AuthSession;
use crate::config::ApiEndpoints;
use crate::error::{ApiError, Result};

/// Shared HTTP plumbing for the Gmail, Drive and Calendar services
#[derive(Clone)]
pub struct GoogleApi {
    http_client: reqwest::Client,
    session: Arc<AuthSession>,
    endpoints: ApiEndpoints,
}

impl GoogleApi {
    pub fn new(http_client: reqwest::Client, session: Arc<AuthSession>, endpoints: ApiEndpoints) -> Self {
        Self {
            http_client,
            session,
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Start a request; authentication is added by [`GoogleApi::execute`]
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client.request(method, url)
    }

    /// Send `request` with the session's bearer token.
    ///
    /// Non-2xx responses become [`ApiError::UpstreamCallFailed`] carrying
    /// Google's own error message.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.session.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        tracing::debug!("Upstream call failed ({}): {}", status, text);
        Err(upstream_error(status, &text).into())
    }

    /// Execute and decode a JSON body
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        Ok(self.execute(request).await?.json().await?)
    }

    /// Execute and return the body as text
    pub async fn text(&self, request: RequestBuilder) -> Result<String> {
        Ok(self.execute(request).await?.text().await?)
    }

    /// Execute, discarding the body
    pub async fn send(&self, request: RequestBuilder) -> Result<()> {
        self.execute(request).await?;
        Ok(())
    }
}

/// Pull `error.message` out of a Google error body, falling back to the raw text
fn upstream_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Request failed with status code {}", status)
            } else {
                body.to_string()
            }
        });

    ApiError::UpstreamCallFailed { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_of(err: ApiError) -> String {
        match err {
            ApiError::UpstreamCallFailed { message, .. } => message,
        }
    }

    #[test]
    fn test_google_error_message_is_extracted() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#;
        assert_eq!(message_of(upstream_error(404, body)), "Requested entity was not found.");
    }

    #[test]
    fn test_unstructured_body_is_kept() {
        assert_eq!(message_of(upstream_error(502, "Bad Gateway")), "Bad Gateway");
    }

    #[test]
    fn test_empty_body_mentions_status() {
        assert_eq!(
            message_of(upstream_error(500, "")),
            "Request failed with status code 500"
        );
    }
}
