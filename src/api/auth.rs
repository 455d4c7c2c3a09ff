use serde_json::Value;

use super::{ApiClient, ApiError};
use crate::models::{AuthResponse, SignInInput, SignUpInput};

impl ApiClient {
    /// Exchanges credentials for a bearer token. The token is returned as-is;
    /// storing it is the session's job.
    pub async fn sign_in(&self, input: &SignInInput) -> Result<String, ApiError> {
        let request = self.http().post(self.url(&["auth", "login"])?).json(input);
        let response: AuthResponse = self.fetch(request, "Login failed").await?;
        Ok(response.token)
    }

    pub async fn sign_up(&self, input: &SignUpInput) -> Result<(), ApiError> {
        let request = self.http().post(self.url(&["auth", "register"])?).json(input);
        let _account: Value = self.fetch(request, "Registration failed").await?;
        Ok(())
    }
}
