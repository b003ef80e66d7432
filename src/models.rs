//! Domain and wire types for the command-snippet backend
//!
//! All types serialize with the backend's camelCase field names. Decoding is
//! tolerant where the backend is known to be loose: a saved command's `note`
//! may arrive as a JSON object or as a JSON-encoded string, and list
//! endpoints may answer with a bare array or a `{ "commands": [...] }`
//! envelope. Both are normalized here, on ingress, so nothing downstream
//! has to care.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Free-form note fields attached to a saved command.
pub type Note = BTreeMap<String, String>;

/// Page size assumed when the server omits it.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Account role, a closed set defined by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control over the account.
    Owner,
    /// May edit on behalf of an owner.
    Helper,
    /// Read-only access.
    Viewer,
}

/// Authenticated identity as returned by `auth/register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

/// Canonical base command from the backend catalog.
///
/// Read-only foreign data: the client never creates or edits these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCommand {
    /// Catalog identifier. Search results do not always carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// The base command text, e.g. `git`.
    pub command: String,
    /// Match score reported by catalog search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

/// Tag attached to a saved command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A user's saved snippet: base command, full invocation, notes and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCommand {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub command: Option<CatalogCommand>,
    /// Full invocation text as typed; may or may not start with the base command.
    #[serde(default)]
    pub arguments: String,
    #[serde(default, deserialize_with = "deserialize_note")]
    pub note: Note,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub is_favourite: bool,
    /// ISO-8601 creation timestamp as sent by the backend.
    #[serde(default)]
    pub created_at: String,
}

impl UserCommand {
    /// Base command text, or an empty string when the catalog reference is missing.
    pub fn base_command(&self) -> &str {
        self.command
            .as_ref()
            .map(|c| c.command.as_str())
            .unwrap_or("")
    }

    /// The arguments with the base command prefix removed.
    ///
    /// See [`argument_tail`].
    pub fn argument_tail(&self) -> String {
        argument_tail(self.base_command(), &self.arguments)
    }

    /// Tag names in their stored order.
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }

    /// Parsed creation time, when the backend sent a valid RFC 3339 value.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Strips a leading, case-insensitive `base` plus trailing whitespace from `full`.
///
/// `base` is escaped before it is compiled, so base commands containing
/// regex metacharacters (`c++`, `[`, `.`) match literally.
///
/// # Examples
///
/// ```
/// use cmdstash::models::argument_tail;
///
/// assert_eq!(argument_tail("git", "git commit -m x"), "commit -m x");
/// assert_eq!(argument_tail("git", "GIT status"), "status");
/// assert_eq!(argument_tail("c++", "c++ -o a.out"), "-o a.out");
/// assert_eq!(argument_tail("", "ls -la"), "ls -la");
/// ```
pub fn argument_tail(base: &str, full: &str) -> String {
    if base.is_empty() {
        return full.to_string();
    }
    let pattern = format!(r"^{}\s*", regex::escape(base));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace(full, "").into_owned(),
        Err(e) => {
            tracing::warn!("Could not compile argument prefix for {:?}: {}", base, e);
            full.to_string()
        }
    }
}

/// Normalizes a wire `note` value into a string mapping.
///
/// Objects are taken as-is (non-string values are rendered as JSON text),
/// strings are parsed as JSON, and anything that fails to parse or is not
/// an object becomes an empty mapping.
pub fn normalize_note(value: Option<Value>) -> Note {
    match value {
        Some(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                Value::Null => None,
                other => Some((key, other.to_string())),
            })
            .collect(),
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(&encoded) {
            Ok(parsed @ Value::Object(_)) => normalize_note(Some(parsed)),
            Ok(_) => Note::new(),
            Err(e) => {
                tracing::debug!("Discarding unparsable note field: {}", e);
                Note::new()
            }
        },
        _ => Note::new(),
    }
}

fn deserialize_note<'de, D>(deserializer: D) -> std::result::Result<Note, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(normalize_note(value))
}

fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(items @ Value::Array(_)) => serde_json::from_value(items).unwrap_or_default(),
        _ => Vec::new(),
    })
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Pagination metadata of a served page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_prev_page: bool,
}

impl PaginationMeta {
    /// Whether forward navigation is allowed after fetching `fetched` items.
    ///
    /// Requires both the server flag and a full page: a short page is an
    /// end-of-data signal even when the server claims otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdstash::models::PaginationMeta;
    ///
    /// let meta = PaginationMeta {
    ///     page: 1,
    ///     page_size: 50,
    ///     total: 120,
    ///     total_pages: 3,
    ///     has_next_page: true,
    ///     has_prev_page: false,
    /// };
    /// assert!(meta.allows_next(50));
    /// assert!(!meta.allows_next(12));
    /// ```
    pub fn allows_next(&self, fetched: usize) -> bool {
        self.has_next_page && fetched >= self.page_size as usize
    }
}

/// Ordering of the saved-command list by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortOrder {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    #[default]
    Desc,
}

impl SortOrder {
    /// Query-string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            other => Err(format!("invalid order '{}': expected ASC or DESC", other)),
        }
    }
}

/// Parameters of a saved-command page request.
///
/// The page size is fixed by the backend and cannot be requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<u32>,
    pub order: Option<SortOrder>,
}

impl ListParams {
    /// Request for `page` with the server's default order.
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            order: None,
        }
    }

    /// Adds an explicit order.
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub(crate) fn to_query(self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(order) = self.order {
            query.push(("order", order.as_str().to_string()));
        }
        query
    }
}

/// Body of `auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub display_name: String,
    pub email: String,
    pub password: String,
}

/// Response of `auth/login` and `auth/refresh-token`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

/// Response of `auth/logout`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of a saved-command creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUserCommand {
    /// Base command text, e.g. `git`.
    pub command: String,
    /// Full invocation text.
    pub arguments: String,
    pub note: Note,
    /// Tag names; the backend resolves or creates the tags.
    pub tags: Vec<String>,
}

/// Partial update of a saved command. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserCommandPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UserCommandPatch {
    /// True when no field would be sent.
    pub fn is_empty(&self) -> bool {
        self.command.is_none()
            && self.arguments.is_none()
            && self.note.is_none()
            && self.tags.is_none()
    }
}

/// Body of `usercommand/favourite`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavouriteRequest {
    pub user_command_id: i64,
}

/// Outcome of a favourite toggle as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavouriteAction {
    /// The command is now a favourite.
    Added,
    /// The command is no longer a favourite.
    Removed,
}

impl FavouriteAction {
    /// Favourite state after the toggle.
    pub fn is_favourite(self) -> bool {
        matches!(self, FavouriteAction::Added)
    }
}

/// Response of `usercommand/favourite`: `"ADD"` or its complement.
#[derive(Debug, Clone, Deserialize)]
pub struct FavouriteResponse {
    pub action: String,
}

impl FavouriteResponse {
    pub fn action(&self) -> FavouriteAction {
        if self.action == "ADD" {
            FavouriteAction::Added
        } else {
            FavouriteAction::Removed
        }
    }
}

/// One page of saved commands together with its metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandPage {
    pub commands: Vec<UserCommand>,
    /// Absent when the server answered without a page envelope.
    pub meta: Option<PaginationMeta>,
}

/// Wire envelope of `GET usercommand`.
#[derive(Debug, Deserialize)]
pub(crate) struct PagedEnvelope {
    #[serde(default)]
    pub commands: Option<PagedCommands>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PagedCommands {
    #[serde(default)]
    pub data: Option<Vec<UserCommand>>,
    #[serde(flatten)]
    pub meta: PaginationMeta,
}

impl From<PagedEnvelope> for CommandPage {
    fn from(envelope: PagedEnvelope) -> Self {
        match envelope.commands {
            Some(PagedCommands {
                data: Some(commands),
                meta,
            }) => CommandPage {
                commands,
                meta: Some(meta),
            },
            _ => CommandPage::default(),
        }
    }
}

/// List responses that may be a bare array or a `{ "commands": [...] }` object.
///
/// Any other shape, or an element that does not decode, fails
/// deserialization as a whole.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { commands: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) | ListEnvelope::Wrapped { commands: items } => items,
        }
    }
}
