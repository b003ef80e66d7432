//! Configuration management for CmdStash
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CmdStashError, Result};
use crate::models::{SortOrder, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for CmdStash
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Where credentials are persisted between runs
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Defaults for the saved-command list
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every route is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Route paths, relative to `base_url`
    #[serde(default)]
    pub routes: Routes,
}

fn default_base_url() -> String {
    "http://localhost:3000/api/".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            routes: Routes::default(),
        }
    }
}

/// Backend route paths
///
/// Paths vary by deployment; the contract behind each one does not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Routes {
    pub register: String,
    pub login: String,
    pub logout: String,
    pub refresh_token: String,
    pub command_search: String,
    pub user_commands: String,
    pub user_command_search: String,
    pub user_command_tag_search: String,
    pub user_command_favourite: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            register: "auth/register".to_string(),
            login: "auth/login".to_string(),
            logout: "auth/logout".to_string(),
            refresh_token: "auth/refresh-token".to_string(),
            command_search: "command/search".to_string(),
            user_commands: "usercommand".to_string(),
            user_command_search: "usercommand/search".to_string(),
            user_command_tag_search: "usercommand/search/tags".to_string(),
            user_command_favourite: "usercommand/favourite".to_string(),
        }
    }
}

impl Routes {
    fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("register", &self.register),
            ("login", &self.login),
            ("logout", &self.logout),
            ("refresh_token", &self.refresh_token),
            ("command_search", &self.command_search),
            ("user_commands", &self.user_commands),
            ("user_command_search", &self.user_command_search),
            ("user_command_tag_search", &self.user_command_tag_search),
            ("user_command_favourite", &self.user_command_favourite),
        ]
    }
}

/// Credential persistence backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS native keyring
    #[default]
    Keyring,
    /// JSON file in the platform data directory
    File,
    /// Process memory only; nothing survives the process
    Memory,
}

impl std::str::FromStr for CredentialBackend {
    type Err = CmdStashError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyring" => Ok(CredentialBackend::Keyring),
            "file" => Ok(CredentialBackend::File),
            "memory" => Ok(CredentialBackend::Memory),
            other => Err(CmdStashError::Config(format!(
                "Invalid credentials backend: {}. Must be one of: keyring, file, memory",
                other
            ))),
        }
    }
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: CredentialBackend,

    /// Keyring service name
    #[serde(default = "default_service")]
    pub service: String,

    /// Credential file path for the file backend (defaults to the data dir)
    #[serde(default)]
    pub path: Option<String>,
}

fn default_service() -> String {
    "cmdstash".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::default(),
            service: default_service(),
            path: None,
        }
    }
}

/// Saved-command list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Creation-time ordering used when none is given
    #[serde(default)]
    pub order: SortOrder,

    /// Page size assumed when the server omits pagination metadata
    #[serde(default = "default_page_size_hint")]
    pub page_size_hint: u32,
}

fn default_page_size_hint() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            order: SortOrder::default(),
            page_size_hint: default_page_size_hint(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed, or if
    /// an environment override carries an invalid value
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars()?;
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CmdStashError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CmdStashError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) -> Result<()> {
        if let Ok(base_url) = std::env::var("CMDSTASH_API_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("CMDSTASH_TIMEOUT_SECONDS") {
            self.api.timeout_seconds = timeout.parse().map_err(|_| {
                CmdStashError::Config(format!(
                    "CMDSTASH_TIMEOUT_SECONDS must be a positive integer, got '{}'",
                    timeout
                ))
            })?;
        }

        if let Ok(backend) = std::env::var("CMDSTASH_CREDENTIALS_BACKEND") {
            self.credentials.backend = backend.parse()?;
        }

        if let Ok(path) = std::env::var("CMDSTASH_CREDENTIALS_PATH") {
            self.credentials.path = Some(path);
        }

        Ok(())
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            tracing::debug!("Using API URL override from CLI: {}", api_url);
            self.api.base_url = api_url.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            CmdStashError::Config(format!("Invalid api.base_url '{}': {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CmdStashError::Config(format!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(CmdStashError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, route) in self.api.routes.entries() {
            if route.trim().is_empty() {
                return Err(
                    CmdStashError::Config(format!("api.routes.{} cannot be empty", name)).into(),
                );
            }
        }

        if self.listing.page_size_hint == 0 {
            return Err(CmdStashError::Config(
                "listing.page_size_hint must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
