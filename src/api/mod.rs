//! Backend API access
//!
//! [`client::ApiClient`] is the transport every call goes through. The
//! services in [`auth`] and [`commands`] map each backend route to one typed
//! method, and [`credentials`] persists the access token and refresh cookie
//! between runs.

pub mod auth;
pub mod client;
pub mod commands;
pub mod credentials;

pub use auth::AuthService;
pub use client::{ApiClient, ApiRequest, ApiResponse, ApiResult};
pub use commands::CommandsService;
pub use credentials::{CredentialStore, FileStore, KeyringStore, MemoryStore};
