//! Saved-command state
//!
//! [`CommandStore`] keeps four independent views of command data:
//!
//! - `system_commands`: the latest catalog search
//! - `user_commands` with `pagination_meta`: one page of the user's list
//! - `search_results`: the latest search over the user's commands, kept
//!   apart from the paged list so switching search modes keeps the page
//! - `current_page`: the page the list view is on
//!
//! Create, edit and delete are followed by a refetch of the current page so
//! the list stays whatever the server says it is. The favourite toggle is
//! the one exception: it never changes membership or order, so the
//! confirmed flag is patched in place in both the list and search results.

use std::sync::Arc;

use crate::api::{ApiClient, CommandsService};
use crate::error::{display_message, Result};
use crate::models::{
    CatalogCommand, FavouriteAction, ListParams, NewUserCommand, PaginationMeta, SortOrder,
    UserCommand, UserCommandPatch, DEFAULT_PAGE_SIZE,
};

const SEARCH_COMMANDS_FAILED: &str = "Failed to search commands";
const GET_USER_COMMANDS_FAILED: &str = "Failed to get user commands";
const SEARCH_USER_COMMANDS_FAILED: &str = "Failed to search user commands";
const SEARCH_BY_TAGS_FAILED: &str = "Failed to search user commands by tags";
const CREATE_FAILED: &str = "Failed to create user command";
const UPDATE_FAILED: &str = "Failed to update user command";
const DELETE_FAILED: &str = "Failed to delete user command";
const TOGGLE_FAVOURITE_FAILED: &str = "Failed to toggle favourite";

/// Observable command state.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandState {
    pub system_commands: Vec<CatalogCommand>,
    pub user_commands: Vec<UserCommand>,
    pub search_results: Vec<UserCommand>,
    pub pagination_meta: Option<PaginationMeta>,
    /// One-based page of `user_commands`.
    pub current_page: u32,
    /// Catalog lookups, list fetches and mutations.
    pub is_loading: bool,
    /// Searches over the user's commands.
    pub is_searching: bool,
    pub error: Option<String>,
}

impl Default for CommandState {
    fn default() -> Self {
        Self {
            system_commands: Vec::new(),
            user_commands: Vec::new(),
            search_results: Vec::new(),
            pagination_meta: None,
            current_page: 1,
            is_loading: false,
            is_searching: false,
            error: None,
        }
    }
}

/// Which busy flag an operation drives.
#[derive(Debug, Clone, Copy)]
enum Busy {
    Loading,
    Searching,
}

/// Command store over a shared [`ApiClient`].
///
/// Operations take `&mut self`: one store instance has one writer at a time.
#[derive(Debug)]
pub struct CommandStore {
    service: CommandsService,
    state: CommandState,
    /// Order of the last list fetch, reused by refetches.
    order: Option<SortOrder>,
    page_size_hint: u32,
}

impl CommandStore {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            service: CommandsService::new(client),
            state: CommandState::default(),
            order: None,
            page_size_hint: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size assumed when the server sends no pagination metadata.
    pub fn with_page_size_hint(mut self, page_size: u32) -> Self {
        self.page_size_hint = page_size.max(1);
        self
    }

    pub fn state(&self) -> &CommandState {
        &self.state
    }

    pub fn system_commands(&self) -> &[CatalogCommand] {
        &self.state.system_commands
    }

    pub fn user_commands(&self) -> &[UserCommand] {
        &self.state.user_commands
    }

    pub fn search_results(&self) -> &[UserCommand] {
        &self.state.search_results
    }

    pub fn pagination_meta(&self) -> Option<&PaginationMeta> {
        self.state.pagination_meta.as_ref()
    }

    pub fn current_page(&self) -> u32 {
        self.state.current_page
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    /// A loaded command by id, looked up in the list first, then in search results.
    pub fn find(&self, id: i64) -> Option<&UserCommand> {
        self.state
            .user_commands
            .iter()
            .chain(self.state.search_results.iter())
            .find(|cmd| cmd.id == id)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Searches the catalog.
    ///
    /// With `persist` the results replace `system_commands`; without it the
    /// state is left alone and the results are only returned. Failures are
    /// recorded in `error` either way.
    pub async fn search_system_commands(
        &mut self,
        query: &str,
        persist: bool,
    ) -> Result<Vec<CatalogCommand>> {
        if persist {
            self.begin(Busy::Loading);
        }
        match self.service.search_system_commands(query).await {
            Ok(commands) => {
                if persist {
                    self.state.system_commands = commands.clone();
                    self.end(Busy::Loading);
                }
                Ok(commands)
            }
            Err(e) => Err(self.fail(e.into(), SEARCH_COMMANDS_FAILED, persist.then_some(Busy::Loading))),
        }
    }

    /// Fetches one page of saved commands.
    ///
    /// Replaces `user_commands` and `pagination_meta` and records the page
    /// as `current_page` (page 1 when none was requested).
    pub async fn get_user_commands(&mut self, params: ListParams) -> Result<()> {
        self.begin(Busy::Loading);
        match self.service.get_user_commands(params).await {
            Ok(page) => {
                tracing::debug!(
                    "Loaded {} saved command(s) for page {:?}",
                    page.commands.len(),
                    params.page
                );
                self.state.user_commands = page.commands;
                self.state.pagination_meta = page.meta;
                self.state.current_page = params.page.filter(|p| *p > 0).unwrap_or(1);
                self.order = params.order;
                self.end(Busy::Loading);
                Ok(())
            }
            Err(e) => Err(self.fail(e.into(), GET_USER_COMMANDS_FAILED, Some(Busy::Loading))),
        }
    }

    /// Free-text search over saved commands, written to `search_results`
    /// when `persist` is set.
    pub async fn search_user_commands(
        &mut self,
        args: &str,
        persist: bool,
    ) -> Result<Vec<UserCommand>> {
        if persist {
            self.begin(Busy::Searching);
        }
        let outcome = self.service.search_user_commands(args).await;
        self.finish_search(outcome.map_err(Into::into), persist, SEARCH_USER_COMMANDS_FAILED)
    }

    /// Tag search over saved commands, written to `search_results` when
    /// `persist` is set.
    ///
    /// Whether several tags combine as AND or OR is decided by the backend.
    pub async fn search_user_commands_by_tags(
        &mut self,
        tags: &[String],
        persist: bool,
    ) -> Result<Vec<UserCommand>> {
        if persist {
            self.begin(Busy::Searching);
        }
        let outcome = self.service.search_user_commands_by_tags(tags).await;
        self.finish_search(outcome.map_err(Into::into), persist, SEARCH_BY_TAGS_FAILED)
    }

    fn finish_search(
        &mut self,
        outcome: Result<Vec<UserCommand>>,
        persist: bool,
        fallback: &str,
    ) -> Result<Vec<UserCommand>> {
        match outcome {
            Ok(commands) => {
                if persist {
                    self.state.search_results = commands.clone();
                    self.end(Busy::Searching);
                }
                Ok(commands)
            }
            Err(e) => Err(self.fail(e, fallback, persist.then_some(Busy::Searching))),
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Creates a saved command, then refetches the current page.
    pub async fn create_user_command(&mut self, payload: &NewUserCommand) -> Result<UserCommand> {
        self.begin(Busy::Loading);
        let created = match self.service.create_user_command(payload).await {
            Ok(created) => created,
            Err(e) => return Err(self.fail(e.into(), CREATE_FAILED, Some(Busy::Loading))),
        };
        tracing::info!("Created saved command {}", created.id);
        self.refetch_after_mutation(CREATE_FAILED).await?;
        Ok(created)
    }

    /// Sends the changed fields of a saved command, then refetches the
    /// current page.
    ///
    /// An empty patch sends nothing and returns `Ok(None)`.
    pub async fn edit_user_command(
        &mut self,
        id: i64,
        patch: &UserCommandPatch,
    ) -> Result<Option<UserCommand>> {
        if patch.is_empty() {
            tracing::debug!("No changes for saved command {}, skipping update", id);
            return Ok(None);
        }
        self.begin(Busy::Loading);
        let updated = match self.service.edit_user_command(id, patch).await {
            Ok(updated) => updated,
            Err(e) => return Err(self.fail(e.into(), UPDATE_FAILED, Some(Busy::Loading))),
        };
        tracing::info!("Updated saved command {}", id);
        self.refetch_after_mutation(UPDATE_FAILED).await?;
        Ok(Some(updated))
    }

    /// Deletes a saved command, then refetches the current page.
    pub async fn delete_user_command(&mut self, id: i64) -> Result<()> {
        self.begin(Busy::Loading);
        if let Err(e) = self.service.delete_user_command(id).await {
            return Err(self.fail(e.into(), DELETE_FAILED, Some(Busy::Loading)));
        }
        tracing::info!("Deleted saved command {}", id);
        self.refetch_after_mutation(DELETE_FAILED).await
    }

    /// Flips the favourite flag and patches the confirmed state into both
    /// `user_commands` and `search_results`.
    pub async fn toggle_user_command_favourite(&mut self, id: i64) -> Result<FavouriteAction> {
        let action = match self.service.toggle_user_command_favourite(id).await {
            Ok(action) => action,
            Err(e) => return Err(self.fail(e.into(), TOGGLE_FAVOURITE_FAILED, None)),
        };
        let is_favourite = action.is_favourite();
        for cmd in self
            .state
            .user_commands
            .iter_mut()
            .chain(self.state.search_results.iter_mut())
            .filter(|cmd| cmd.id == id)
        {
            cmd.is_favourite = is_favourite;
        }
        tracing::debug!("Saved command {} favourite: {}", id, is_favourite);
        Ok(action)
    }

    async fn refetch_after_mutation(&mut self, fallback: &str) -> Result<()> {
        let params = ListParams {
            page: Some(self.state.current_page),
            order: self.order,
        };
        if let Err(e) = self.get_user_commands(params).await {
            return Err(self.fail(e, fallback, Some(Busy::Loading)));
        }
        self.end(Busy::Loading);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Local state
    // -----------------------------------------------------------------------

    pub fn clear_search_results(&mut self) {
        self.state.search_results.clear();
    }

    /// Sets the page without fetching it.
    pub fn set_current_page(&mut self, page: u32) {
        self.state.current_page = page;
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    /// Whether a next page may exist.
    ///
    /// Needs the server's `hasNextPage` (or, without metadata, a full page)
    /// and at least a page's worth of fetched items.
    pub fn can_go_next(&self) -> bool {
        let fetched = self.state.user_commands.len();
        match &self.state.pagination_meta {
            Some(meta) => meta.allows_next(fetched),
            None => fetched >= self.page_size_hint as usize,
        }
    }

    /// Whether a previous page exists.
    pub fn can_go_prev(&self) -> bool {
        let current = self.state.current_page;
        let has_prev = self
            .state
            .pagination_meta
            .as_ref()
            .map_or(current > 1, |meta| meta.has_prev_page);
        has_prev && current > 1
    }

    /// Advances `current_page` when allowed; does not fetch.
    pub fn next_page(&mut self) -> bool {
        if self.state.is_loading || !self.can_go_next() {
            return false;
        }
        self.state.current_page += 1;
        true
    }

    /// Steps `current_page` back when allowed; does not fetch.
    pub fn prev_page(&mut self) -> bool {
        if self.state.is_loading || !self.can_go_prev() {
            return false;
        }
        self.state.current_page -= 1;
        true
    }

    fn begin(&mut self, busy: Busy) {
        self.set_busy(busy, true);
        self.state.error = None;
    }

    fn end(&mut self, busy: Busy) {
        self.set_busy(busy, false);
    }

    fn set_busy(&mut self, busy: Busy, value: bool) {
        match busy {
            Busy::Loading => self.state.is_loading = value,
            Busy::Searching => self.state.is_searching = value,
        }
    }

    fn fail(&mut self, err: anyhow::Error, fallback: &str, busy: Option<Busy>) -> anyhow::Error {
        tracing::warn!("{}: {}", fallback, err);
        self.state.error = Some(display_message(&err, fallback));
        if let Some(busy) = busy {
            self.end(busy);
        }
        err
    }
}
