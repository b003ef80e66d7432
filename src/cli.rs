//! Command-line interface definition for cmdstash
//!
//! This module defines the CLI structure using clap's derive API. Each
//! subcommand maps onto one or two store operations; see
//! [`crate::commands`] for the handlers.

use clap::{Parser, Subcommand};

use crate::models::SortOrder;

/// cmdstash - personal command-line snippet manager
///
/// Save, tag, search and recall shell commands stored on a cmdstash backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "cmdstash")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (default: config/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the backend base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create an account and sign in
    Register {
        /// Public display name (letters, digits, underscore)
        #[arg(long)]
        display_name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "CMDSTASH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign in and store the access token
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "CMDSTASH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the session and forget stored credentials
    Logout,

    /// Check whether a stored session is still valid
    Status,

    /// List saved commands, one page at a time
    List {
        /// Page to show (1-based)
        #[arg(short, long)]
        page: Option<u32>,

        /// Creation-time order: ASC or DESC
        #[arg(short, long)]
        order: Option<SortOrder>,

        /// Only show entries whose command, arguments or tags contain this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Free-text search over saved commands
    Search {
        /// Text to search for
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        query: Vec<String>,
    },

    /// Find saved commands by tag
    Tags {
        /// Tag names
        #[arg(required = true, num_args = 1..)]
        tags: Vec<String>,
    },

    /// Search the catalog of known base commands
    Catalog {
        /// Text to search for
        query: String,
    },

    /// Save a new command
    Add {
        /// Base command, e.g. git
        #[arg(long)]
        command: String,

        /// Arguments or the full invocation
        #[arg(short, long, allow_hyphen_values = true)]
        args: String,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Change a saved command; only the given fields are sent
    Edit {
        /// Saved command id
        id: i64,

        /// Page the command is on
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// New arguments or full invocation
        #[arg(short, long, allow_hyphen_values = true)]
        args: Option<String>,

        /// New note text
        #[arg(short, long)]
        note: Option<String>,

        /// Replacement tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Delete a saved command
    Delete {
        /// Saved command id
        id: i64,
    },

    /// Toggle the favourite flag of a saved command
    Fav {
        /// Saved command id
        id: i64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            api_url: None,
            command: Commands::Status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_cli_parse_login() {
        let cli = Cli::try_parse_from([
            "cmdstash",
            "login",
            "--email",
            "ada@example.com",
            "--password",
            "Abcdef1!",
        ])
        .unwrap();
        if let Commands::Login { email, password } = cli.command {
            assert_eq!(email, "ada@example.com");
            assert_eq!(password, "Abcdef1!");
        } else {
            panic!("Expected Login command");
        }
    }

    #[test]
    fn test_cli_parse_list_with_order() {
        let cli =
            Cli::try_parse_from(["cmdstash", "list", "--page", "3", "--order", "asc"]).unwrap();
        if let Commands::List {
            page,
            order,
            filter,
        } = cli.command
        {
            assert_eq!(page, Some(3));
            assert_eq!(order, Some(SortOrder::Asc));
            assert_eq!(filter, None);
        } else {
            panic!("Expected List command");
        }
    }

    #[test]
    fn test_cli_rejects_bad_order() {
        assert!(Cli::try_parse_from(["cmdstash", "list", "--order", "sideways"]).is_err());
    }

    #[test]
    fn test_cli_parse_add_with_tags() {
        let cli = Cli::try_parse_from([
            "cmdstash",
            "add",
            "--command",
            "git",
            "--args",
            "log --oneline",
            "--tag",
            "git",
            "--tag",
            "history",
        ])
        .unwrap();
        if let Commands::Add {
            command,
            args,
            note,
            tags,
        } = cli.command
        {
            assert_eq!(command, "git");
            assert_eq!(args, "log --oneline");
            assert!(note.is_none());
            assert_eq!(tags, vec!["git".to_string(), "history".to_string()]);
        } else {
            panic!("Expected Add command");
        }
    }

    #[test]
    fn test_cli_parse_search_collects_words() {
        let cli = Cli::try_parse_from(["cmdstash", "search", "docker", "prune"]).unwrap();
        if let Commands::Search { query } = cli.command {
            assert_eq!(query, vec!["docker".to_string(), "prune".to_string()]);
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_cli_parse_edit_defaults_to_first_page() {
        let cli = Cli::try_parse_from(["cmdstash", "edit", "12", "--note", "prune"]).unwrap();
        if let Commands::Edit {
            id,
            page,
            args,
            note,
            tags,
        } = cli.command
        {
            assert_eq!(id, 12);
            assert_eq!(page, 1);
            assert!(args.is_none());
            assert_eq!(note.as_deref(), Some("prune"));
            assert!(tags.is_empty());
        } else {
            panic!("Expected Edit command");
        }
    }

    #[test]
    fn test_cli_tags_requires_one() {
        assert!(Cli::try_parse_from(["cmdstash", "tags"]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cmdstash",
            "status",
            "--verbose",
            "--api-url",
            "https://stash.example.com/api/",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(
            cli.api_url.as_deref(),
            Some("https://stash.example.com/api/")
        );
    }
}
