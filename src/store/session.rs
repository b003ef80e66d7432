//! Authentication session state
//!
//! [`SessionStore`] holds who is signed in and drives the `auth/*` routes.
//! The access token itself lives in the transport's credential store; this
//! store only decides when it is written or cleared.
//!
//! Every failing operation clears `is_loading`, records a display-ready
//! `error` and returns the failure, so callers can branch on the result or
//! read the state, whichever is more convenient.

use std::sync::Arc;

use crate::api::{ApiClient, AuthService};
use crate::error::{display_message, Result};
use crate::models::{LoginRequest, RegisterRequest, User};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const REFRESH_FAILED: &str = "Session expired, please log in again";

/// Observable session state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Identity, when known. Login alone does not populate it.
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Coarse lifecycle of a session.
///
/// The error message is orthogonal and may accompany any phase but
/// `Authenticating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Authenticating,
    Authenticated,
}

/// Session store over a shared [`ApiClient`].
#[derive(Debug)]
pub struct SessionStore {
    client: Arc<ApiClient>,
    auth: AuthService,
    state: SessionState,
}

impl SessionStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            auth: AuthService::new(Arc::clone(&client)),
            client,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.state.is_loading {
            SessionPhase::Authenticating
        } else if self.state.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Idle
        }
    }

    /// Authenticates with email and password and stores the issued token.
    ///
    /// The identity is not fetched; `user` stays empty until [`set_user`]
    /// is called.
    ///
    /// # Errors
    ///
    /// Returns the backend failure, or a credential store failure when the
    /// token cannot be persisted. `error` is set in both cases.
    ///
    /// [`set_user`]: SessionStore::set_user
    pub async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        self.begin();
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        match self.exchange_credentials(&request).await {
            Ok(()) => {
                tracing::info!("Logged in");
                self.state.user = None;
                self.state.is_authenticated = true;
                self.state.is_loading = false;
                Ok(())
            }
            Err(e) => Err(self.fail(e, LOGIN_FAILED)),
        }
    }

    async fn exchange_credentials(&self, request: &LoginRequest) -> Result<()> {
        let token = self.auth.login(request).await?;
        self.client.set_auth_token(&token.access_token)?;
        Ok(())
    }

    /// Creates an account and signs in as it.
    ///
    /// # Errors
    ///
    /// Returns the backend failure; `error` is set.
    pub async fn register(
        &mut self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User> {
        self.begin();
        let request = RegisterRequest {
            display_name: display_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        match self.auth.register(&request).await {
            Ok(user) => {
                tracing::info!("Registered account {}", user.id);
                self.state.user = Some(user.clone());
                self.state.is_authenticated = true;
                self.state.is_loading = false;
                Ok(user)
            }
            Err(e) => Err(self.fail(e.into(), REGISTRATION_FAILED)),
        }
    }

    /// Forgets the local session without contacting the backend.
    ///
    /// State is reset even when clearing the stored credentials fails.
    ///
    /// # Errors
    ///
    /// Returns the credential store failure, if any.
    pub fn logout(&mut self) -> Result<()> {
        self.state.user = None;
        self.state.is_authenticated = false;
        self.state.error = None;
        self.client.clear_auth_token()
    }

    /// Asks the backend to end the session, then logs out locally.
    ///
    /// A backend failure is logged and otherwise ignored.
    pub async fn logout_remote(&mut self) -> Result<()> {
        if self.client.has_auth_token() {
            match self.auth.logout().await {
                Ok(response) => tracing::debug!(
                    "Backend logout: {}",
                    response.message.as_deref().unwrap_or("ok")
                ),
                Err(e) => tracing::warn!("Backend logout failed: {}", e),
            }
        }
        self.logout()
    }

    /// Mints a new access token from the refresh cookie.
    ///
    /// # Errors
    ///
    /// On failure the session is logged out, `error` is set and the refresh
    /// failure is returned.
    pub async fn refresh_token(&mut self) -> Result<()> {
        self.begin();
        match self.auth.refresh_token().await {
            Ok(_) => {
                self.state.is_authenticated = true;
                self.state.is_loading = false;
                Ok(())
            }
            Err(e) => {
                if let Err(clear_err) = self.logout() {
                    tracing::warn!("Could not clear credentials after refresh failure: {}", clear_err);
                }
                Err(self.fail(e.into(), REFRESH_FAILED))
            }
        }
    }

    /// Restores a session left by an earlier run.
    ///
    /// Refreshes only when a token is stored. Failure is silent: the
    /// session simply stays unauthenticated.
    pub async fn on_visit(&mut self) -> bool {
        if !self.client.has_auth_token() {
            return false;
        }
        match self.refresh_token().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Stored session could not be restored: {}", e);
                self.state.error = None;
                false
            }
        }
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    /// Records the identity and marks the session authenticated.
    pub fn set_user(&mut self, user: User) {
        self.state.user = Some(user);
        self.state.is_authenticated = true;
    }

    fn begin(&mut self) {
        self.state.is_loading = true;
        self.state.error = None;
    }

    fn fail(&mut self, err: anyhow::Error, fallback: &str) -> anyhow::Error {
        let message = display_message(&err, fallback);
        tracing::warn!("{}: {}", fallback, err);
        self.state.error = Some(message);
        self.state.is_loading = false;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::credentials::{MemoryStore, MockCredentialStore, ACCESS_TOKEN_KEY};
    use crate::api::CredentialStore;
    use crate::config::ApiConfig;
    use crate::error::{ApiError, CmdStashError};
    use crate::models::Role;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, store: Arc<dyn CredentialStore>) -> Arc<ApiClient> {
        let config = ApiConfig {
            base_url: format!("{}/api/", server.uri()),
            ..Default::default()
        };
        Arc::new(ApiClient::new(&config, store).unwrap())
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "t1"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::default());
        let mut session = SessionStore::new(client_for(&server, store.clone()));
        session.login("ada@example.com", "Abcdef1!").await.unwrap();

        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert!(session.user().is_none());
        assert_eq!(session.phase(), SessionPhase::Authenticated);
        assert_eq!(store.load(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_login_failure_records_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "x"})))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = SessionStore::new(client_for(&server, Arc::new(MemoryStore::default())));
        let err = session.login("ada@example.com", "wrong").await.unwrap_err();

        assert_eq!(err.downcast_ref::<ApiError>().map(|e| e.status), Some(401));
        assert_eq!(session.error(), Some("Invalid credentials"));
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_login_fails_when_token_cannot_be_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "t1"})))
            .mount(&server)
            .await;

        let mut mock = MockCredentialStore::new();
        mock.expect_load().returning(|_| Ok(None));
        mock.expect_save()
            .returning(|_, _| Err(CmdStashError::CredentialStorage("disk full".into()).into()));

        let mut session = SessionStore::new(client_for(&server, Arc::new(mock)));
        let err = session.login("ada@example.com", "Abcdef1!").await.unwrap_err();

        assert!(err.downcast_ref::<CmdStashError>().is_some());
        assert_eq!(session.error(), Some(LOGIN_FAILED));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_sets_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 5,
                "displayName": "ada_l",
                "email": "ada@example.com",
                "role": "owner"
            })))
            .mount(&server)
            .await;

        let mut session = SessionStore::new(client_for(&server, Arc::new(MemoryStore::default())));
        let user = session
            .register("ada_l", "ada@example.com", "Abcdef1!")
            .await
            .unwrap();

        assert_eq!(user.role, Role::Owner);
        assert_eq!(session.user().map(|u| u.id), Some(5));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_failure_without_message_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut session = SessionStore::new(client_for(&server, Arc::new(MemoryStore::default())));
        assert!(session
            .register("ada_l", "ada@example.com", "Abcdef1!")
            .await
            .is_err());
        assert_eq!(session.error(), Some(REGISTRATION_FAILED));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_refresh_failure_logs_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "expired"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::default());
        store.save(ACCESS_TOKEN_KEY, "stale").unwrap();
        let mut session = SessionStore::new(client_for(&server, store.clone()));
        session.set_user(User {
            id: 1,
            display_name: "ada_l".into(),
            email: "ada@example.com".into(),
            role: Role::Viewer,
        });

        assert!(session.refresh_token().await.is_err());
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert_eq!(session.error(), Some("expired"));
        assert!(store.load(ACCESS_TOKEN_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_on_visit_without_token_does_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "x"})))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = SessionStore::new(client_for(&server, Arc::new(MemoryStore::default())));
        assert!(!session.on_visit().await);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_on_visit_failure_is_silent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::default());
        store.save(ACCESS_TOKEN_KEY, "stale").unwrap();
        let mut session = SessionStore::new(client_for(&server, store));

        assert!(!session.on_visit().await);
        assert!(session.error().is_none());
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::default());
        store.save(ACCESS_TOKEN_KEY, "t1").unwrap();
        let mut session = SessionStore::new(client_for(&server, store.clone()));
        session.set_user(User {
            id: 1,
            display_name: "ada_l".into(),
            email: "ada@example.com".into(),
            role: Role::Helper,
        });
        session.state.error = Some("old".into());

        session.logout().unwrap();
        assert_eq!(session.state(), &SessionState::default());
        assert!(store.load(ACCESS_TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_clear_error_only_touches_error() {
        let config = ApiConfig::default();
        let client = Arc::new(ApiClient::new(&config, Arc::new(MemoryStore::default())).unwrap());
        let mut session = SessionStore::new(client);
        session.state.is_authenticated = true;
        session.state.error = Some("boom".into());
        session.clear_error();
        assert!(session.error().is_none());
        assert!(session.is_authenticated());
    }
}
