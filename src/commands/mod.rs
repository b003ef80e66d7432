//! Command handlers for the cmdstash CLI
//!
//! Each handler drives one or two store operations and renders the result.
//! Failures are printed from the store's `error` field, which already holds
//! the display-ready backend message, and then returned so the process
//! exits non-zero.

pub mod auth;
pub mod snippets;

use std::sync::Arc;

use colored::Colorize;

use crate::api::{credentials, ApiClient};
use crate::cli::Commands;
use crate::config::Config;
use crate::error::Result;
use crate::store::{CommandStore, SessionStore};

/// Stores for one CLI invocation, sharing a single transport.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub session: SessionStore,
    pub commands: CommandStore,
}

impl Context {
    /// Builds the credential store, transport and both stores from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error when the credential backend or HTTP client cannot be
    /// created.
    pub fn new(config: Config) -> Result<Self> {
        let credentials = credentials::from_config(&config.credentials)?;
        let client = Arc::new(ApiClient::new(&config.api, credentials)?);
        Ok(Self::with_client(config, client))
    }

    /// Builds both stores over an existing transport.
    pub fn with_client(config: Config, client: Arc<ApiClient>) -> Self {
        let commands = CommandStore::new(Arc::clone(&client))
            .with_page_size_hint(config.listing.page_size_hint);
        Self {
            session: SessionStore::new(client),
            commands,
            config,
        }
    }
}

/// Runs `command` against the configured backend.
pub async fn run(config: Config, command: Commands) -> Result<()> {
    let mut ctx = Context::new(config)?;
    execute(&mut ctx, command).await
}

/// Runs `command` with an existing context.
pub async fn execute(ctx: &mut Context, command: Commands) -> Result<()> {
    match command {
        Commands::Register {
            display_name,
            email,
            password,
        } => auth::register(&mut ctx.session, &display_name, &email, &password).await,
        Commands::Login { email, password } => {
            auth::login(&mut ctx.session, &email, &password).await
        }
        Commands::Logout => auth::logout(&mut ctx.session).await,
        Commands::Status => auth::status(&mut ctx.session).await,
        Commands::List {
            page,
            order,
            filter,
        } => {
            let order = order.unwrap_or(ctx.config.listing.order);
            snippets::list(&mut ctx.commands, page, order, filter.as_deref()).await
        }
        Commands::Search { query } => snippets::search(&mut ctx.commands, &query.join(" ")).await,
        Commands::Tags { tags } => snippets::search_tags(&mut ctx.commands, &tags).await,
        Commands::Catalog { query } => snippets::catalog(&mut ctx.commands, &query).await,
        Commands::Add {
            command,
            args,
            note,
            tags,
        } => {
            let draft = crate::forms::CommandDraft {
                command,
                arguments: args,
                note: note.unwrap_or_default(),
                tags,
            };
            snippets::add(&mut ctx.commands, &draft).await
        }
        Commands::Edit {
            id,
            page,
            args,
            note,
            tags,
        } => {
            let changes = snippets::EditRequest { args, note, tags };
            snippets::edit(&mut ctx.commands, id, page, changes).await
        }
        Commands::Delete { id } => snippets::delete(&mut ctx.commands, id).await,
        Commands::Fav { id } => snippets::favourite(&mut ctx.commands, id).await,
    }
}

/// Prints a failure message to stderr and hands the error back.
pub(crate) fn report(message: Option<&str>, err: anyhow::Error) -> anyhow::Error {
    let message = message.map(str::to_string).unwrap_or_else(|| err.to_string());
    eprintln!("{}", message.red());
    err
}
