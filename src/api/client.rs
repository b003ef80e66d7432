//! HTTP transport for the command-snippet backend
//!
//! [`ApiClient`] is the single chokepoint for outbound calls. It owns three
//! concerns:
//!
//! - **Credential attachment.** Before every request the stored access
//!   token is read and sent as `Authorization: Bearer <token>`. Cookies
//!   captured from earlier responses (the refresh credential) are sent back
//!   as a `Cookie` header.
//! - **401 recovery.** A `401` from any route other than the
//!   token-bootstrapping ones (`login`, `register`, `refresh-token`, matched
//!   on the final path segment) triggers one refresh-token call. On success
//!   the new token is persisted and the original request is replayed once;
//!   on failure the stored token is cleared and the refresh failure is
//!   returned. The replay budget belongs to the call, not to the request,
//!   so a second `401` after the replay is terminal.
//! - **Error normalization.** Every failure becomes an
//!   [`ApiError`](crate::error::ApiError): non-2xx responses carry their
//!   decoded body, and requests that never got a response become
//!   `500 service unreachable` with an empty body.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::api::credentials::{CredentialStore, ACCESS_TOKEN_KEY, REFRESH_COOKIE_KEY};
use crate::config::{ApiConfig, Routes};
use crate::error::{ApiError, CmdStashError, ErrorData, Result};
use crate::models::TokenResponse;

/// Final path segments that never trigger a token refresh.
pub const TOKEN_BOOTSTRAP_SEGMENTS: [&str; 3] = ["login", "register", "refresh-token"];

/// Result of a single backend call.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// A decoded successful response.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// HTTP status of the (possibly replayed) response.
    pub status: u16,
    /// Decoded body.
    pub data: T,
}

/// A request as it will be sent, kept whole so it can be replayed verbatim.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    /// Creates a request for `path` relative to the base URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Appends query parameters; repeated names are sent repeatedly.
    pub fn query<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Request path as configured.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether a `401` on this request may be recovered by refreshing.
    pub fn is_refreshable(&self) -> bool {
        is_refreshable_route(&self.path)
    }
}

/// True unless the last path segment is one of [`TOKEN_BOOTSTRAP_SEGMENTS`].
///
/// # Examples
///
/// ```
/// use cmdstash::api::client::is_refreshable_route;
///
/// assert!(is_refreshable_route("usercommand/search"));
/// assert!(!is_refreshable_route("auth/login"));
/// assert!(!is_refreshable_route("/api/auth/refresh-token"));
/// ```
pub fn is_refreshable_route(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or("");
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(segment) if !segment.is_empty() => !TOKEN_BOOTSTRAP_SEGMENTS.contains(&segment),
        _ => false,
    }
}

/// Replays left for one logical call.
#[derive(Debug, Clone, Copy)]
struct RetryBudget {
    remaining: u8,
}

impl RetryBudget {
    /// At most one replay after a successful refresh.
    const AUTH_REPLAYS: u8 = 1;

    fn new() -> Self {
        Self {
            remaining: Self::AUTH_REPLAYS,
        }
    }

    fn try_consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Client for the backend API.
///
/// Cheap to share: wrap it in an [`Arc`] and hand clones to every store.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use cmdstash::api::client::ApiClient;
/// use cmdstash::api::credentials::MemoryStore;
/// use cmdstash::config::ApiConfig;
///
/// # async fn example() -> cmdstash::error::Result<()> {
/// let client = ApiClient::new(&ApiConfig::default(), Arc::new(MemoryStore::default()))?;
/// let hits: cmdstash::api::client::ApiResponse<serde_json::Value> =
///     client.get("command/search", [("command", "git")]).await?;
/// println!("{}", hits.data);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    routes: Routes,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    /// Builds a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`CmdStashError::Config`] for an unparsable base URL and
    /// [`CmdStashError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            CmdStashError::Config(format!("Invalid api.base_url '{}': {}", config.base_url, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(CmdStashError::Http)?;

        Ok(Self {
            http,
            base_url,
            routes: config.routes.clone(),
            credentials,
        })
    }

    /// Configured route paths.
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Base URL with a guaranteed trailing slash.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Verbs
    // -----------------------------------------------------------------------

    /// `GET path?query`.
    pub async fn get<T, K, V>(
        &self,
        path: &str,
        query: impl IntoIterator<Item = (K, V)>,
    ) -> ApiResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        self.send(ApiRequest::new(Method::GET, path).query(query))
            .await
    }

    /// `POST path` with an optional JSON body.
    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> ApiResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = ApiRequest::new(Method::POST, path);
        if let Some(body) = body {
            request = request.json(encode_body(body)?);
        }
        self.send(request).await
    }

    /// `PUT path?query` with a JSON body.
    pub async fn put<T, B, K, V>(
        &self,
        path: &str,
        body: &B,
        query: impl IntoIterator<Item = (K, V)>,
    ) -> ApiResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
        K: Into<String>,
        V: Into<String>,
    {
        let request = ApiRequest::new(Method::PUT, path)
            .query(query)
            .json(encode_body(body)?);
        self.send(request).await
    }

    /// `DELETE path?query`.
    pub async fn delete<T, K, V>(
        &self,
        path: &str,
        query: impl IntoIterator<Item = (K, V)>,
    ) -> ApiResult<ApiResponse<T>>
    where
        T: DeserializeOwned,
        K: Into<String>,
        V: Into<String>,
    {
        self.send(ApiRequest::new(Method::DELETE, path).query(query))
            .await
    }

    /// Sends `request`, recovering once from an expired access token.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<ApiResponse<T>> {
        let mut budget = RetryBudget::new();
        let mut refreshed: Option<String> = None;
        loop {
            let response = self.dispatch(&request, refreshed.as_deref()).await?;
            let status = response.status();

            if status == reqwest::StatusCode::UNAUTHORIZED
                && request.is_refreshable()
                && budget.try_consume()
            {
                tracing::debug!(
                    "{} {} returned 401, refreshing access token",
                    request.method,
                    request.path
                );
                match self.refresh_access_token().await {
                    Ok(token) => {
                        refreshed = Some(token);
                        continue;
                    }
                    Err(refresh_error) => {
                        tracing::warn!(
                            "Token refresh failed with status {}, clearing stored token",
                            refresh_error.status
                        );
                        self.forget_access_token();
                        return Err(refresh_error);
                    }
                }
            }

            return decode_response(response).await;
        }
    }

    /// Calls the refresh route once and persists the issued token.
    ///
    /// Never retried and never itself triggers a refresh. A token that
    /// cannot be persisted is still returned so the caller can use it.
    pub async fn refresh_access_token(&self) -> ApiResult<String> {
        let request =
            ApiRequest::new(Method::POST, self.routes.refresh_token.as_str()).json(Value::Object(
                serde_json::Map::new(),
            ));
        let response = self.dispatch(&request, None).await?;
        let token: ApiResponse<TokenResponse> = decode_response(response).await?;
        let access_token = token.data.access_token;
        if let Err(e) = self.set_auth_token(&access_token) {
            tracing::warn!("Could not persist refreshed access token: {}", e);
        }
        tracing::info!("Access token refreshed");
        Ok(access_token)
    }

    // -----------------------------------------------------------------------
    // Credentials
    // -----------------------------------------------------------------------

    /// Persists the bearer token attached to subsequent requests.
    ///
    /// # Errors
    ///
    /// Propagates credential store failures.
    pub fn set_auth_token(&self, token: &str) -> Result<()> {
        self.credentials.save(ACCESS_TOKEN_KEY, token)
    }

    /// Removes the persisted bearer token and refresh cookie.
    ///
    /// # Errors
    ///
    /// Propagates credential store failures.
    pub fn clear_auth_token(&self) -> Result<()> {
        self.credentials.delete(ACCESS_TOKEN_KEY)?;
        self.credentials.delete(REFRESH_COOKIE_KEY)
    }

    /// Currently persisted bearer token, if any.
    ///
    /// # Errors
    ///
    /// Propagates credential store failures.
    pub fn auth_token(&self) -> Result<Option<String>> {
        self.credentials.load(ACCESS_TOKEN_KEY)
    }

    /// Whether a token from an earlier session is available.
    pub fn has_auth_token(&self) -> bool {
        matches!(self.auth_token(), Ok(Some(ref token)) if !token.is_empty())
    }

    fn forget_access_token(&self) {
        if let Err(e) = self.credentials.delete(ACCESS_TOKEN_KEY) {
            tracing::warn!("Could not clear stored access token: {}", e);
        }
    }

    fn load_credential(&self, key: &str) -> Option<String> {
        match self.credentials.load(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("Could not read stored credential {}: {}", key, e);
                None
            }
        }
    }

    fn remember_cookies(&self, headers: &HeaderMap) {
        let pairs: Vec<String> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(cookie_pair)
            .collect();
        if pairs.is_empty() {
            return;
        }

        let merged = merge_cookies(
            self.load_credential(REFRESH_COOKIE_KEY).as_deref(),
            &pairs,
        );
        match self.credentials.save(REFRESH_COOKIE_KEY, &merged) {
            Ok(()) => tracing::debug!("Stored {} cookie(s) from response", pairs.len()),
            Err(e) => tracing::warn!("Could not persist response cookies: {}", e),
        }
    }

    // -----------------------------------------------------------------------
    // Wire
    // -----------------------------------------------------------------------

    fn url_for(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                ApiError::new(
                    400,
                    "invalid request path",
                    ErrorData::Unstructured(Value::String(format!("{}: {}", path, e))),
                )
            })
    }

    /// Sends one HTTP exchange with the current credentials attached.
    ///
    /// `bearer` takes precedence over the stored access token.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let url = self.url_for(&request.path)?;
        let mut builder = self.http.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        let token = bearer
            .map(str::to_string)
            .or_else(|| self.load_credential(ACCESS_TOKEN_KEY));
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(cookie) = self.load_credential(REFRESH_COOKIE_KEY) {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!("{} {}", request.method, request.path);
        let response = builder.send().await.map_err(|e| {
            tracing::warn!("{} {} failed: {}", request.method, request.path, e);
            ApiError::unreachable()
        })?;

        self.remember_cookies(response.headers());
        Ok(response)
    }
}

fn encode_body<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| {
        ApiError::new(
            400,
            "invalid request body",
            ErrorData::Unstructured(Value::String(e.to_string())),
        )
    })
}

/// Turns a response into a decoded payload or a normalized error.
async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> ApiResult<ApiResponse<T>> {
    let status = response.status();
    let status_text = status.canonical_reason().unwrap_or("").to_string();
    let body = response.text().await.map_err(|e| {
        tracing::warn!("Failed to read response body: {}", e);
        ApiError::unreachable()
    })?;

    if !status.is_success() {
        return Err(ApiError::new(
            status.as_u16(),
            status_text,
            ErrorData::from_body(&body),
        ));
    }

    let raw = if body.trim().is_empty() { "null" } else { &body };
    match serde_json::from_str::<T>(raw) {
        Ok(data) => Ok(ApiResponse {
            status: status.as_u16(),
            data,
        }),
        Err(e) => {
            tracing::warn!("Response body did not match the expected shape: {}", e);
            Err(ApiError::new(
                status.as_u16(),
                "invalid response body",
                ErrorData::Unstructured(Value::String(body)),
            ))
        }
    }
}

/// Extracts `name=value` from a `Set-Cookie` header value.
fn cookie_pair(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, _) = pair.split_once('=')?;
    if name.trim().is_empty() {
        return None;
    }
    Some(pair.to_string())
}

/// Merges new cookie pairs into a `Cookie` header value, newest wins.
fn merge_cookies(existing: Option<&str>, fresh: &[String]) -> String {
    let mut jar: Vec<(String, String)> = Vec::new();
    let existing_pairs = existing
        .unwrap_or("")
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty());
    for pair in existing_pairs.chain(fresh.iter().map(String::as_str)) {
        if let Some((name, value)) = pair.split_once('=') {
            let name = name.trim().to_string();
            match jar.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => jar.push((name, value.to_string())),
            }
        }
    }
    jar.retain(|(_, value)| !value.is_empty());
    jar.into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::credentials::{MemoryStore, MockCredentialStore};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_client(base: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: base.to_string(),
            ..Default::default()
        };
        ApiClient::new(&config, Arc::new(MemoryStore::default())).unwrap()
    }

    #[test]
    fn test_refreshable_routes() {
        assert!(is_refreshable_route("usercommand"));
        assert!(is_refreshable_route("usercommand/favourite"));
        assert!(is_refreshable_route("auth/logout"));
        assert!(!is_refreshable_route("auth/login"));
        assert!(!is_refreshable_route("auth/register"));
        assert!(!is_refreshable_route("auth/refresh-token"));
        assert!(!is_refreshable_route("auth/refresh-token/"));
        assert!(!is_refreshable_route("auth/login?next=1"));
        assert!(!is_refreshable_route(""));
    }

    #[test]
    fn test_retry_budget_allows_one_replay() {
        let mut budget = RetryBudget::new();
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert!(!budget.try_consume());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = make_client("http://localhost:3000/api");
        assert_eq!(client.base_url().as_str(), "http://localhost:3000/api/");
        assert_eq!(
            client.url_for("/usercommand/search").unwrap().as_str(),
            "http://localhost:3000/api/usercommand/search"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = ApiConfig {
            base_url: "::nope::".to_string(),
            ..Default::default()
        };
        assert!(ApiClient::new(&config, Arc::new(MemoryStore::default())).is_err());
    }

    #[test]
    fn test_token_setters() {
        let client = make_client("http://localhost:3000/api/");
        assert!(!client.has_auth_token());
        client.set_auth_token("abc").unwrap();
        assert!(client.has_auth_token());
        assert_eq!(client.auth_token().unwrap().as_deref(), Some("abc"));
        client.clear_auth_token().unwrap();
        assert!(client.auth_token().unwrap().is_none());
    }

    #[test]
    fn test_cookie_pair_strips_attributes() {
        assert_eq!(
            cookie_pair("refreshToken=abc; Path=/; HttpOnly; Secure").as_deref(),
            Some("refreshToken=abc")
        );
        assert!(cookie_pair("; Path=/").is_none());
        assert!(cookie_pair("garbage").is_none());
    }

    #[test]
    fn test_merge_cookies_newest_wins() {
        let merged = merge_cookies(
            Some("refreshToken=old; theme=dark"),
            &["refreshToken=new".to_string()],
        );
        assert_eq!(merged, "refreshToken=new; theme=dark");
    }

    #[test]
    fn test_merge_cookies_drops_cleared_values() {
        let merged = merge_cookies(Some("refreshToken=old"), &["refreshToken=".to_string()]);
        assert_eq!(merged, "");
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::new(Method::GET, "usercommand/search/tags")
            .query([("tags", "git"), ("tags", "vcs")]);
        assert_eq!(request.path(), "usercommand/search/tags");
        assert_eq!(request.query.len(), 2);
        assert!(request.is_refreshable());
    }

    #[tokio::test]
    async fn test_replay_uses_refreshed_token_when_it_cannot_be_saved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/usercommand"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/usercommand"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "fresh"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut store = MockCredentialStore::new();
        store
            .expect_load()
            .returning(|key| Ok((key == ACCESS_TOKEN_KEY).then(|| "stale".to_string())));
        store.expect_save().returning(|_, _| {
            Err(CmdStashError::CredentialStorage("read-only keyring".into()).into())
        });

        let config = ApiConfig {
            base_url: format!("{}/api/", server.uri()),
            ..Default::default()
        };
        let client = ApiClient::new(&config, Arc::new(store)).unwrap();

        let response = client
            .get::<Value, _, _>("usercommand", [("page", "1")])
            .await
            .expect("replay should carry the refreshed token");
        assert_eq!(response.data, json!({"ok": true}));
    }
}
