//! cmdstash - personal command-snippet manager client library
//!
//! This library talks to a cmdstash backend and keeps client-side state for
//! the signed-in user and their saved commands.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: HTTP transport with token refresh, credential persistence and
//!   typed route services
//! - `store`: session and saved-command state holders
//! - `models`: wire and domain types
//! - `validation`: pure input validation rules
//! - `forms`: create and edit drafts
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cmdstash::api::{credentials, ApiClient};
//! use cmdstash::models::ListParams;
//! use cmdstash::store::{CommandStore, SessionStore};
//! use cmdstash::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let store = credentials::from_config(&config.credentials)?;
//!     let client = Arc::new(ApiClient::new(&config.api, store)?);
//!
//!     let mut session = SessionStore::new(client.clone());
//!     session.login("ada@example.com", "Abcdef1!").await?;
//!
//!     let mut commands = CommandStore::new(client);
//!     commands.get_user_commands(ListParams::page(1)).await?;
//!     println!("{} saved commands on page 1", commands.user_commands().len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use api::ApiClient;
pub use config::Config;
pub use error::{ApiError, CmdStashError, ErrorData, Result};
pub use models::{CommandPage, PaginationMeta, User, UserCommand};
pub use store::{CommandStore, SessionStore};
