//! Bearer-token session.
//!
//! The session holds no state of its own beyond the stored token: the
//! current user is decoded from the token on every call, so it can never
//! drift from what the backend issued.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthUser, Claims, SignInInput, SignUpInput};
use crate::storage::{LocalStorage, StorageError};

pub const TOKEN_KEY: &str = "auth_token";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),
    #[error("Invalid response format")]
    MalformedResponse,
    #[error("Invalid token format")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Api(ApiError),
    #[error("failed to store session: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    fn from_api(error: ApiError, fallback: &str) -> Self {
        match error {
            ApiError::AuthenticationRequired { message } => {
                AuthError::Rejected(message.unwrap_or_else(|| fallback.to_string()))
            }
            ApiError::Rejected { message, .. } => AuthError::Rejected(message),
            ApiError::MalformedResponse(_) => AuthError::MalformedResponse,
            other => AuthError::Api(other),
        }
    }
}

/// Decodes the token's claims without checking its signature; the signing
/// key lives only on the backend, which verifies every request anyway.
pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(AuthError::InvalidToken)
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: Arc<dyn LocalStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        SessionStore { storage }
    }

    pub fn token(&self) -> Option<String> {
        match self.storage.get_item(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                log::error!("failed to read stored token: {}", e);
                None
            }
        }
    }

    fn store_token(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set_item(TOKEN_KEY, token)
    }

    fn clear_token(&self) {
        if let Err(e) = self.storage.remove_item(TOKEN_KEY) {
            log::error!("failed to clear stored token: {}", e);
        }
    }

    pub async fn login(&self, api: &ApiClient, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let input = SignInInput {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = api
            .sign_in(&input)
            .await
            .map_err(|e| AuthError::from_api(e, "Login failed"))?;

        let claims = decode_claims(&token)?;
        self.store_token(&token)?;
        log::info!("signed in as {}", claims.email);
        Ok(claims.into())
    }

    /// Creates the account, then signs in with the same credentials.
    pub async fn register(&self, api: &ApiClient, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let input = SignUpInput {
            email: email.to_string(),
            password: password.to_string(),
        };
        api.sign_up(&input)
            .await
            .map_err(|e| AuthError::from_api(e, "Registration failed"))?;
        log::info!("registered {}", email);
        self.login(api, email, password).await
    }

    pub fn logout(&self) {
        self.clear_token();
        log::info!("signed out");
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    /// False when no token is stored or it has expired by `now`. A token
    /// that is expired or cannot be decoded is removed from storage.
    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        match decode_claims(&token) {
            Ok(claims) if claims.exp > now.timestamp() => true,
            Ok(_) => {
                log::info!("session expired");
                self.clear_token();
                false
            }
            Err(e) => {
                log::warn!("discarding unreadable token: {}", e);
                self.clear_token();
                false
            }
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.current_user_at(Utc::now())
    }

    pub fn current_user_at(&self, now: DateTime<Utc>) -> Option<AuthUser> {
        let token = self.token()?;
        let claims = decode_claims(&token).ok()?;
        if claims.exp <= now.timestamp() {
            return None;
        }
        Some(claims.into())
    }

    pub fn is_admin(&self) -> bool {
        self.current_user()
            .map(|user| user.role == "admin")
            .unwrap_or(false)
    }
}
