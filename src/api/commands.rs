//! Catalog and saved-command routes
//!
//! Every method is a single request; list payloads are normalized here so
//! that callers always get plain vectors, whichever envelope the backend
//! chose.

use std::sync::Arc;

use serde::de::IgnoredAny;

use crate::api::client::{ApiClient, ApiResult};
use crate::models::{
    CatalogCommand, CommandPage, FavouriteAction, FavouriteRequest, FavouriteResponse,
    ListEnvelope, ListParams, NewUserCommand, PagedEnvelope, UserCommand, UserCommandPatch,
};

/// Typed access to `command/*` and `usercommand/*`.
#[derive(Debug, Clone)]
pub struct CommandsService {
    client: Arc<ApiClient>,
}

impl CommandsService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Searches the catalog of known base commands.
    pub async fn search_system_commands(&self, query: &str) -> ApiResult<Vec<CatalogCommand>> {
        let route = self.client.routes().command_search.clone();
        let response = self
            .client
            .get::<ListEnvelope<CatalogCommand>, _, _>(&route, [("command", query)])
            .await?;
        Ok(response.data.into_vec())
    }

    /// Fetches one page of the caller's saved commands.
    pub async fn get_user_commands(&self, params: ListParams) -> ApiResult<CommandPage> {
        let route = self.client.routes().user_commands.clone();
        let response = self
            .client
            .get::<PagedEnvelope, _, _>(&route, params.to_query())
            .await?;
        Ok(response.data.into())
    }

    /// Free-text search over the caller's saved commands.
    pub async fn search_user_commands(&self, args: &str) -> ApiResult<Vec<UserCommand>> {
        let route = self.client.routes().user_command_search.clone();
        let response = self
            .client
            .get::<ListEnvelope<UserCommand>, _, _>(&route, [("args", args)])
            .await?;
        Ok(response.data.into_vec())
    }

    /// Searches saved commands by tag; each tag is sent as its own `tags` parameter.
    pub async fn search_user_commands_by_tags(
        &self,
        tags: &[String],
    ) -> ApiResult<Vec<UserCommand>> {
        let route = self.client.routes().user_command_tag_search.clone();
        let query = tags.iter().map(|tag| ("tags", tag.as_str()));
        let response = self
            .client
            .get::<ListEnvelope<UserCommand>, _, _>(&route, query)
            .await?;
        Ok(response.data.into_vec())
    }

    pub async fn create_user_command(&self, payload: &NewUserCommand) -> ApiResult<UserCommand> {
        let route = self.client.routes().user_commands.clone();
        Ok(self.client.post(&route, Some(payload)).await?.data)
    }

    /// Sends only the fields present in `patch`.
    pub async fn edit_user_command(
        &self,
        id: i64,
        patch: &UserCommandPatch,
    ) -> ApiResult<UserCommand> {
        let route = self.client.routes().user_commands.clone();
        let response = self
            .client
            .put(&route, patch, [("id", id.to_string())])
            .await?;
        Ok(response.data)
    }

    pub async fn delete_user_command(&self, id: i64) -> ApiResult<()> {
        let route = self.client.routes().user_commands.clone();
        self.client
            .delete::<IgnoredAny, _, _>(&route, [("id", id.to_string())])
            .await?;
        Ok(())
    }

    /// Flips the favourite flag and reports the resulting state.
    pub async fn toggle_user_command_favourite(&self, id: i64) -> ApiResult<FavouriteAction> {
        let route = self.client.routes().user_command_favourite.clone();
        let body = FavouriteRequest {
            user_command_id: id,
        };
        let response = self
            .client
            .post::<FavouriteResponse, _>(&route, Some(&body))
            .await?;
        Ok(response.data.action())
    }
}
