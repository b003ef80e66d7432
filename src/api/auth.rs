//! Authentication routes

use std::sync::Arc;

use serde_json::Value;

use crate::api::client::{ApiClient, ApiResult};
use crate::models::{LoginRequest, LogoutResponse, RegisterRequest, TokenResponse, User};

/// Typed access to the `auth/*` routes.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Creates an account and returns the new identity.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<User> {
        let route = self.client.routes().register.clone();
        Ok(self.client.post(&route, Some(request)).await?.data)
    }

    /// Exchanges credentials for an access token.
    ///
    /// The token is returned, not stored; persisting it is the caller's call.
    pub async fn login(&self, request: &LoginRequest) -> ApiResult<TokenResponse> {
        let route = self.client.routes().login.clone();
        Ok(self.client.post(&route, Some(request)).await?.data)
    }

    /// Invalidates the server-side session.
    pub async fn logout(&self) -> ApiResult<LogoutResponse> {
        let route = self.client.routes().logout.clone();
        let response = self
            .client
            .post::<Option<LogoutResponse>, Value>(&route, None)
            .await?;
        Ok(response.data.unwrap_or_default())
    }

    /// Mints a new access token from the refresh cookie and persists it.
    pub async fn refresh_token(&self) -> ApiResult<String> {
        self.client.refresh_access_token().await
    }
}
