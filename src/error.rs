//! Error types for CmdStash
//!
//! This module defines the crate-wide error enum and the canonical
//! [`ApiError`] produced by the HTTP transport. Every failure coming back
//! from the backend (network, non-2xx status, failed token refresh) is
//! normalized into an [`ApiError`] before it reaches a store.

use serde_json::Value;
use thiserror::Error;

/// Status text used when a request never produced a response.
pub const UNREACHABLE_STATUS_TEXT: &str = "service unreachable";

/// Status code reported for failures that carry no HTTP response.
pub const UNREACHABLE_STATUS: u16 = 500;

/// Main error type for CmdStash operations
///
/// Covers everything that can go wrong outside of a backend call:
/// configuration loading, local validation, credential persistence
/// and client construction.
#[derive(Error, Debug)]
pub enum CmdStashError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected by a local validation rule before any request was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credential persistence errors (file store, unknown backend, ...)
    #[error("Credential storage error: {0}")]
    CredentialStorage(String),

    /// A referenced saved command is not present in the loaded view
    #[error("Command not found: {0}")]
    CommandNotFound(i64),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Payload of a failed backend call.
///
/// The backend is expected to answer failures with a JSON body carrying a
/// `message` field, which may be a single string or a list of strings.
/// Anything else is kept verbatim as [`ErrorData::Unstructured`].
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorData {
    /// Body carried a usable `message` field.
    Structured {
        /// Message lines, in the order the server sent them.
        messages: Vec<String>,
        /// Optional short error name (e.g. `"Bad Request"`).
        error: Option<String>,
        /// Optional status code echoed inside the body.
        status_code: Option<u16>,
    },
    /// Body was present but had no usable `message`.
    Unstructured(Value),
    /// No body at all.
    Empty,
}

impl ErrorData {
    /// Classifies a decoded JSON error body.
    pub fn from_value(value: Value) -> Self {
        let messages = match value.get("message") {
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        if messages.is_empty() {
            return match value {
                Value::Null => ErrorData::Empty,
                Value::Object(ref map) if map.is_empty() => ErrorData::Empty,
                other => ErrorData::Unstructured(other),
            };
        }

        ErrorData::Structured {
            messages,
            error: value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string),
            status_code: value
                .get("statusCode")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok()),
        }
    }

    /// Classifies a raw response body, JSON or not.
    pub fn from_body(body: &str) -> Self {
        if body.trim().is_empty() {
            return ErrorData::Empty;
        }
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(_) => ErrorData::Unstructured(Value::String(body.to_string())),
        }
    }

    /// Returns the body as a JSON value (`{}` when empty).
    pub fn to_value(&self) -> Value {
        match self {
            ErrorData::Structured {
                messages,
                error,
                status_code,
            } => {
                let message = if messages.len() == 1 {
                    Value::String(messages[0].clone())
                } else {
                    Value::from(messages.clone())
                };
                let mut map = serde_json::Map::new();
                map.insert("message".to_string(), message);
                if let Some(error) = error {
                    map.insert("error".to_string(), Value::String(error.clone()));
                }
                if let Some(code) = status_code {
                    map.insert("statusCode".to_string(), Value::from(*code));
                }
                Value::Object(map)
            }
            ErrorData::Unstructured(value) => value.clone(),
            ErrorData::Empty => Value::Object(serde_json::Map::new()),
        }
    }
}

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The backend could not be reached at all.
    Network,
    /// 401 that survived (or was not eligible for) a token refresh.
    Unauthorized,
    /// Any other 4xx.
    Client,
    /// 5xx returned by the backend.
    Server,
}

/// Canonical failure of a backend call.
///
/// # Examples
///
/// ```
/// use cmdstash::error::{ApiError, ErrorData};
///
/// let err = ApiError::new(
///     400,
///     "Bad Request",
///     ErrorData::from_body(r#"{"message":["email must be an email","password too weak"]}"#),
/// );
/// assert_eq!(
///     err.message().as_deref(),
///     Some("email must be an email\npassword too weak")
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[error("API error {status} ({status_text})")]
pub struct ApiError {
    /// HTTP status, or 500 when no response was received.
    pub status: u16,
    /// Reason phrase of the response, or a fixed text for local failures.
    pub status_text: String,
    /// Decoded error body.
    pub data: ErrorData,
}

impl ApiError {
    /// Builds an error from its parts.
    pub fn new(status: u16, status_text: impl Into<String>, data: ErrorData) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            data,
        }
    }

    /// Error for a request that produced no response.
    pub fn unreachable() -> Self {
        Self::new(UNREACHABLE_STATUS, UNREACHABLE_STATUS_TEXT, ErrorData::Empty)
    }

    /// Display-ready message from the body, lines joined with `\n`.
    pub fn message(&self) -> Option<String> {
        match &self.data {
            ErrorData::Structured { messages, .. } => Some(messages.join("\n")),
            _ => None,
        }
    }

    /// Display-ready message, falling back to `fallback` when the body had none.
    pub fn message_or(&self, fallback: &str) -> String {
        self.message().unwrap_or_else(|| fallback.to_string())
    }

    /// Classifies the failure.
    pub fn kind(&self) -> ApiErrorKind {
        match self.status {
            401 => ApiErrorKind::Unauthorized,
            _ if self.status_text == UNREACHABLE_STATUS_TEXT && self.data == ErrorData::Empty => {
                ApiErrorKind::Network
            }
            400..=499 => ApiErrorKind::Client,
            _ => ApiErrorKind::Server,
        }
    }
}

/// Extracts the display message for a failed store operation.
///
/// Uses the backend message when the failure is an [`ApiError`] carrying
/// one, otherwise `fallback`.
pub fn display_message(err: &anyhow::Error, fallback: &str) -> String {
    err.downcast_ref::<ApiError>()
        .and_then(ApiError::message)
        .unwrap_or_else(|| fallback.to_string())
}

/// Result type alias for CmdStash operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Backend
/// failures can be recovered with `err.downcast_ref::<ApiError>()`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_error_display() {
        let error = CmdStashError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_validation_error_display() {
        let error = CmdStashError::Validation("bad tag".to_string());
        assert_eq!(error.to_string(), "Validation error: bad tag");
    }

    #[test]
    fn test_command_not_found_display() {
        let error = CmdStashError::CommandNotFound(42);
        assert_eq!(error.to_string(), "Command not found: 42");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: CmdStashError = io_error.into();
        assert!(matches!(error, CmdStashError::Io(_)));
    }

    #[test]
    fn test_error_data_string_message() {
        let data = ErrorData::from_value(json!({"message": "Invalid credentials"}));
        assert_eq!(
            data,
            ErrorData::Structured {
                messages: vec!["Invalid credentials".to_string()],
                error: None,
                status_code: None,
            }
        );
    }

    #[test]
    fn test_error_data_array_message_joined() {
        let err = ApiError::new(
            400,
            "Bad Request",
            ErrorData::from_value(json!({
                "statusCode": 400,
                "message": ["a", "b"],
                "error": "Bad Request"
            })),
        );
        assert_eq!(err.message().as_deref(), Some("a\nb"));
        assert_eq!(err.kind(), ApiErrorKind::Client);
    }

    #[test]
    fn test_error_data_without_message_is_unstructured() {
        let data = ErrorData::from_value(json!({"detail": "nope"}));
        assert!(matches!(data, ErrorData::Unstructured(_)));
    }

    #[test]
    fn test_error_data_non_json_body() {
        let data = ErrorData::from_body("<html>Bad Gateway</html>");
        assert_eq!(
            data,
            ErrorData::Unstructured(Value::String("<html>Bad Gateway</html>".to_string()))
        );
    }

    #[test]
    fn test_error_data_empty_body() {
        assert_eq!(ErrorData::from_body("  "), ErrorData::Empty);
        assert_eq!(ErrorData::from_body("{}"), ErrorData::Empty);
        assert_eq!(ErrorData::Empty.to_value(), json!({}));
    }

    #[test]
    fn test_unreachable_defaults() {
        let err = ApiError::unreachable();
        assert_eq!(err.status, 500);
        assert_eq!(err.status_text, "service unreachable");
        assert_eq!(err.kind(), ApiErrorKind::Network);
        assert_eq!(err.message_or("Login failed"), "Login failed");
    }

    #[test]
    fn test_unauthorized_kind() {
        let err = ApiError::new(401, "Unauthorized", ErrorData::Empty);
        assert_eq!(err.kind(), ApiErrorKind::Unauthorized);
    }

    #[test]
    fn test_display_message_downcasts_api_error() {
        let err: anyhow::Error = ApiError::new(
            409,
            "Conflict",
            ErrorData::from_value(json!({"message": "already exists"})),
        )
        .into();
        assert_eq!(display_message(&err, "fallback"), "already exists");

        let other = anyhow::anyhow!(CmdStashError::Config("x".into()));
        assert_eq!(display_message(&other, "fallback"), "fallback");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CmdStashError>();
        assert_send_sync::<ApiError>();
    }
}
