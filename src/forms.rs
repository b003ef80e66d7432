//! Create and edit drafts for saved commands
//!
//! A draft holds raw user input. [`CommandDraft`] turns it into a
//! [`NewUserCommand`] after trimming and validation; [`EditDraft`] snapshots
//! the values a command was loaded with so that only fields the user
//! actually changed are sent back.

use crate::error::{CmdStashError, Result};
use crate::models::{Note, NewUserCommand, UserCommand, UserCommandPatch};
use crate::validation;

/// Key under which the free-text note is stored.
pub const NOTE_DESCRIPTION_KEY: &str = "description";

/// Builds the note mapping from free text; blank text yields an empty note.
pub fn note_from_text(text: &str) -> Note {
    let mut note = Note::new();
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        note.insert(NOTE_DESCRIPTION_KEY.to_string(), trimmed.to_string());
    }
    note
}

/// Trims tag names and drops blanks and duplicates, keeping first occurrences.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Joins base command and tail into the stored argument text.
///
/// A tail that already is the full invocation (the base alone, or the base
/// followed by whitespace, ignoring case) is kept as-is.
pub fn compose_arguments(base: &str, tail: &str) -> String {
    let tail = tail.trim();
    if base.is_empty() {
        return tail.to_string();
    }
    if tail.is_empty() {
        return base.to_string();
    }
    if starts_with_base(base, tail) {
        return tail.to_string();
    }
    format!("{} {}", base, tail)
}

fn starts_with_base(base: &str, text: &str) -> bool {
    let Some(head) = text.get(..base.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(base)
        && text[base.len()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace)
}

/// Raw input for a new saved command.
#[derive(Debug, Clone, Default)]
pub struct CommandDraft {
    pub command: String,
    pub arguments: String,
    pub note: String,
    pub tags: Vec<String>,
}

impl CommandDraft {
    /// Lists every rule the draft breaks; empty when it is submittable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let command = self.command.trim();
        if command.is_empty() {
            problems.push("command is required".to_string());
        } else if !validation::is_valid_command(command) {
            problems.push(format!(
                "invalid command '{}': {}",
                command,
                validation::command_requirements().join(", ")
            ));
        }

        let arguments = compose_arguments(command, &self.arguments);
        if !validation::is_valid_arguments(&arguments) {
            problems.push("arguments must be between 1 and 1000 characters".to_string());
        }

        for tag in normalize_tags(&self.tags) {
            if !validation::is_valid_tag(&tag) {
                problems.push(format!(
                    "invalid tag '{}': {}",
                    tag,
                    validation::tag_requirements().join(", ")
                ));
            }
        }
        problems
    }

    /// Validates and converts the draft into a creation payload.
    ///
    /// # Errors
    ///
    /// Returns [`CmdStashError::Validation`] listing every broken rule.
    pub fn build(&self) -> Result<NewUserCommand> {
        let problems = self.problems();
        if !problems.is_empty() {
            return Err(CmdStashError::Validation(problems.join("; ")).into());
        }
        let command = self.command.trim().to_string();
        Ok(NewUserCommand {
            arguments: compose_arguments(&command, &self.arguments),
            command,
            note: note_from_text(&self.note),
            tags: normalize_tags(&self.tags),
        })
    }
}

/// Editable fields of a saved command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditableFields {
    pub command: String,
    pub arguments: String,
    pub note: Note,
    pub tags: Vec<String>,
}

impl From<&UserCommand> for EditableFields {
    fn from(cmd: &UserCommand) -> Self {
        Self {
            command: cmd.base_command().to_string(),
            arguments: cmd.arguments.clone(),
            note: cmd.note.clone(),
            tags: cmd.tag_names(),
        }
    }
}

/// Edit session over a loaded command.
///
/// # Examples
///
/// ```
/// use cmdstash::forms::EditDraft;
/// use cmdstash::models::UserCommand;
///
/// let loaded: UserCommand = serde_json::from_value(serde_json::json!({
///     "id": 4,
///     "arguments": "git log",
///     "command": {"command": "git"},
///     "tags": [{"id": 1, "name": "git"}]
/// })).unwrap();
///
/// let mut draft = EditDraft::new(&loaded);
/// draft.current.arguments = "git log --stat".to_string();
///
/// let patch = draft.changes();
/// assert_eq!(patch.arguments.as_deref(), Some("git log --stat"));
/// assert!(patch.tags.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct EditDraft {
    pub id: i64,
    initial: EditableFields,
    /// Values as currently edited.
    pub current: EditableFields,
}

impl EditDraft {
    /// Starts an edit with the command's loaded values.
    pub fn new(cmd: &UserCommand) -> Self {
        let initial = EditableFields::from(cmd);
        Self {
            id: cmd.id,
            current: initial.clone(),
            initial,
        }
    }

    /// Values the command was loaded with.
    pub fn initial(&self) -> &EditableFields {
        &self.initial
    }

    /// Fields whose value differs from the loaded one.
    pub fn changes(&self) -> UserCommandPatch {
        let current = &self.current;
        let initial = &self.initial;
        let tags = normalize_tags(&current.tags);
        UserCommandPatch {
            command: (current.command.trim() != initial.command)
                .then(|| current.command.trim().to_string()),
            arguments: (current.arguments.trim() != initial.arguments)
                .then(|| current.arguments.trim().to_string()),
            note: (current.note != initial.note).then(|| current.note.clone()),
            tags: (tags != initial.tags).then_some(tags),
        }
    }

    /// Validates the changed fields only.
    ///
    /// # Errors
    ///
    /// Returns [`CmdStashError::Validation`] when a changed field breaks a rule.
    pub fn validated_changes(&self) -> Result<UserCommandPatch> {
        let patch = self.changes();
        let mut problems = Vec::new();
        if let Some(command) = &patch.command {
            if !validation::is_valid_command(command) {
                problems.push(format!("invalid command '{}'", command));
            }
        }
        if let Some(arguments) = &patch.arguments {
            if !validation::is_valid_arguments(arguments) {
                problems.push("arguments must be between 1 and 1000 characters".to_string());
            }
        }
        if let Some(tags) = &patch.tags {
            for tag in tags.iter().filter(|t| !validation::is_valid_tag(t)) {
                problems.push(format!("invalid tag '{}'", tag));
            }
        }
        if problems.is_empty() {
            Ok(patch)
        } else {
            Err(CmdStashError::Validation(problems.join("; ")).into())
        }
    }
}

/// Keeps commands whose base, argument tail or a tag contains `query`.
///
/// Matching is case-insensitive; a blank query keeps everything.
pub fn filter_commands<'a>(commands: &'a [UserCommand], query: &str) -> Vec<&'a UserCommand> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return commands.iter().collect();
    }
    commands
        .iter()
        .filter(|cmd| {
            cmd.base_command().to_lowercase().contains(&query)
                || cmd.argument_tail().to_lowercase().contains(&query)
                || cmd
                    .tags
                    .iter()
                    .any(|tag| tag.name.to_lowercase().contains(&query))
        })
        .collect()
}
