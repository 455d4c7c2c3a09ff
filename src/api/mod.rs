//! Thin wrappers over the backend's REST endpoints.
//!
//! Every call goes through [`ApiClient::execute`], which attaches the bearer
//! token when one is stored and folds the backend's failure shapes into
//! [`ApiError`].

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::session::SessionStore;

pub mod auth;
pub mod orders;
pub mod products;

pub const AUTHENTICATION_REQUIRED: &str = "Authentication required. Please login first.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication required. Please login first.")]
    AuthenticationRequired { message: Option<String> },
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response from backend: {0}")]
    MalformedResponse(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    pub fn is_authentication_required(&self) -> bool {
        matches!(self, ApiError::AuthenticationRequired { .. })
    }

    /// The backend's own wording, where it gave one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::AuthenticationRequired { message } => message.as_deref(),
            ApiError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// `{ success, data, message }` wrapper the backend puts around payloads.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: Option<bool>,
    data: Option<T>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Config,
    http: Client,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: Config, session: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(ApiClient {
            config,
            http,
            session,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        Ok(self.config.endpoint(segments)?)
    }

    /// Sends the request and returns the raw body of a 2xx response.
    async fn execute(&self, request: RequestBuilder, fallback: &str) -> Result<String, ApiError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|source| {
            log::warn!("request failed before a response arrived: {}", source);
            ApiError::Transport {
                message: fallback.to_string(),
                source,
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            message: fallback.to_string(),
            source,
        })?;

        if status == StatusCode::UNAUTHORIZED {
            log::info!("backend answered 401 for {}", fallback);
            return Err(ApiError::AuthenticationRequired {
                message: backend_message(&body),
            });
        }
        if !status.is_success() {
            let message = backend_message(&body).unwrap_or_else(|| fallback.to_string());
            log::warn!("backend rejected request ({}): {}", status, message);
            return Err(ApiError::Rejected { status, message });
        }
        Ok(body)
    }

    /// For endpoints whose payload the caller needs.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let body = self.execute(request, fallback).await?;
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::MalformedResponse(e.to_string()))?;

        if envelope.success == Some(false) {
            return Err(ApiError::Rejected {
                status: StatusCode::OK,
                message: envelope.message.unwrap_or_else(|| fallback.to_string()),
            });
        }
        envelope
            .data
            .ok_or_else(|| ApiError::MalformedResponse("response carries no data".to_string()))
    }

    /// For endpoints where only success matters. Bodies that are not an
    /// envelope are accepted as long as the status was 2xx.
    pub(crate) async fn submit(&self, request: RequestBuilder, fallback: &str) -> Result<(), ApiError> {
        let body = self.execute(request, fallback).await?;
        if let Ok(envelope) = serde_json::from_str::<Envelope<Value>>(&body) {
            if envelope.success == Some(false) {
                return Err(ApiError::Rejected {
                    status: StatusCode::OK,
                    message: envelope.message.unwrap_or_else(|| fallback.to_string()),
                });
            }
        }
        Ok(())
    }
}

/// Pulls a human-readable message out of an error body: `error.message`,
/// then `message`, then a bare JSON string.
fn backend_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .or_else(|| value.as_str())?;
    if message.trim().is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_error_message_wins() {
        let body = r#"{"message":"outer","error":{"message":"Email already used"}}"#;
        assert_eq!(backend_message(body).as_deref(), Some("Email already used"));
    }

    #[test]
    fn top_level_message_and_bare_strings_are_read() {
        assert_eq!(
            backend_message(r#"{"success":false,"message":"Out of stock"}"#).as_deref(),
            Some("Out of stock")
        );
        assert_eq!(
            backend_message(r#""Invalid credentials""#).as_deref(),
            Some("Invalid credentials")
        );
    }

    #[test]
    fn missing_or_blank_messages_yield_nothing() {
        assert_eq!(backend_message(""), None);
        assert_eq!(backend_message("<html>502</html>"), None);
        assert_eq!(backend_message(r#"{"message":"  "}"#), None);
        assert_eq!(backend_message(r#"{"data":null}"#), None);
    }

    #[test]
    fn authentication_required_reads_as_prompt_to_login() {
        let error = ApiError::AuthenticationRequired { message: None };
        assert_eq!(error.to_string(), AUTHENTICATION_REQUIRED);
        assert!(error.is_authentication_required());
    }
}
