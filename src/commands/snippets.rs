//! Saved-command commands: list, search, add, edit, delete, favourite

use colored::Colorize;
use prettytable::{format, Table};

use crate::commands::report;
use crate::error::{CmdStashError, Result};
use crate::forms::{self, CommandDraft, EditDraft};
use crate::models::{CatalogCommand, ListParams, SortOrder, UserCommand};
use crate::store::CommandStore;
use crate::validation;

/// Fields given to `cmdstash edit`; `None`/empty means unchanged.
#[derive(Debug, Clone, Default)]
pub struct EditRequest {
    pub args: Option<String>,
    pub note: Option<String>,
    pub tags: Vec<String>,
}

/// Fetches one page and prints it, optionally narrowed by a local filter.
pub async fn list(
    store: &mut CommandStore,
    page: Option<u32>,
    order: SortOrder,
    filter: Option<&str>,
) -> Result<()> {
    let params = ListParams {
        page,
        order: Some(order),
    };
    if let Err(e) = store.get_user_commands(params).await {
        return Err(report(store.error(), e));
    }

    let shown = forms::filter_commands(store.user_commands(), filter.unwrap_or(""));
    if shown.is_empty() {
        println!("{}", "No saved commands found.".yellow());
    } else {
        print_commands(&shown);
    }

    let current = store.current_page();
    match store.pagination_meta() {
        Some(meta) if meta.total_pages > 0 => println!(
            "Page {} of {} ({} saved)",
            current, meta.total_pages, meta.total
        ),
        _ => println!("Page {}", current),
    }
    if store.can_go_prev() {
        println!(
            "Previous: {}",
            format!("cmdstash list --page {}", current - 1).cyan()
        );
    }
    if store.can_go_next() {
        println!(
            "Next: {}",
            format!("cmdstash list --page {}", current + 1).cyan()
        );
    }
    Ok(())
}

/// Free-text search over saved commands.
pub async fn search(store: &mut CommandStore, query: &str) -> Result<()> {
    match store.search_user_commands(query, true).await {
        Ok(_) => {
            print_results(store.search_results());
            Ok(())
        }
        Err(e) => Err(report(store.error(), e)),
    }
}

/// Tag search over saved commands.
pub async fn search_tags(store: &mut CommandStore, tags: &[String]) -> Result<()> {
    let tags = forms::normalize_tags(tags);
    if let Some(bad) = tags.iter().find(|t| !validation::is_valid_tag(t)) {
        let err = CmdStashError::Validation(format!(
            "invalid tag '{}': {}",
            bad,
            validation::tag_requirements().join(", ")
        ));
        return Err(report(None, err.into()));
    }

    match store.search_user_commands_by_tags(&tags, true).await {
        Ok(_) => {
            print_results(store.search_results());
            Ok(())
        }
        Err(e) => Err(report(store.error(), e)),
    }
}

/// Searches the base-command catalog.
pub async fn catalog(store: &mut CommandStore, query: &str) -> Result<()> {
    if let Err(e) = store.search_system_commands(query, true).await {
        return Err(report(store.error(), e));
    }
    let commands = store.system_commands();
    if commands.is_empty() {
        println!("{}", "No catalog commands match.".yellow());
    } else {
        print_catalog(commands);
    }
    Ok(())
}

/// Validates the draft and saves it.
pub async fn add(store: &mut CommandStore, draft: &CommandDraft) -> Result<()> {
    let payload = match draft.build() {
        Ok(payload) => payload,
        Err(e) => return Err(report(None, e)),
    };
    match store.create_user_command(&payload).await {
        Ok(created) => {
            println!("{}", format!("Saved command {}", created.id).green());
            Ok(())
        }
        Err(e) => Err(report(store.error(), e)),
    }
}

/// Loads the command from `page`, diffs the requested changes and sends them.
pub async fn edit(store: &mut CommandStore, id: i64, page: u32, request: EditRequest) -> Result<()> {
    if let Err(e) = store.get_user_commands(ListParams::page(page)).await {
        return Err(report(store.error(), e));
    }
    let loaded = match store.find(id) {
        Some(cmd) => cmd,
        None => {
            let err = CmdStashError::CommandNotFound(id);
            return Err(report(
                Some(&format!("No saved command {} on page {}", id, page)),
                err.into(),
            ));
        }
    };

    let mut draft = EditDraft::new(loaded);
    if let Some(args) = &request.args {
        draft.current.arguments = forms::compose_arguments(&draft.current.command, args);
    }
    if let Some(note) = &request.note {
        draft.current.note = forms::note_from_text(note);
    }
    if !request.tags.is_empty() {
        draft.current.tags = request.tags.clone();
    }

    let patch = match draft.validated_changes() {
        Ok(patch) => patch,
        Err(e) => return Err(report(None, e)),
    };
    match store.edit_user_command(id, &patch).await {
        Ok(Some(_)) => {
            println!("{}", format!("Updated command {}", id).green());
            Ok(())
        }
        Ok(None) => {
            println!("{}", "Nothing to change.".yellow());
            Ok(())
        }
        Err(e) => Err(report(store.error(), e)),
    }
}

pub async fn delete(store: &mut CommandStore, id: i64) -> Result<()> {
    match store.delete_user_command(id).await {
        Ok(()) => {
            println!("{}", format!("Deleted command {}", id).green());
            Ok(())
        }
        Err(e) => Err(report(store.error(), e)),
    }
}

pub async fn favourite(store: &mut CommandStore, id: i64) -> Result<()> {
    match store.toggle_user_command_favourite(id).await {
        Ok(action) if action.is_favourite() => {
            println!("{}", format!("Command {} added to favourites", id).green());
            Ok(())
        }
        Ok(_) => {
            println!("Command {} removed from favourites", id);
            Ok(())
        }
        Err(e) => Err(report(store.error(), e)),
    }
}

fn print_results(results: &[UserCommand]) {
    if results.is_empty() {
        println!("{}", "No matching commands.".yellow());
        return;
    }
    let refs: Vec<&UserCommand> = results.iter().collect();
    print_commands(&refs);
}

fn print_commands(commands: &[&UserCommand]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row![
        "ID".bold(),
        "".bold(),
        "Command".bold(),
        "Arguments".bold(),
        "Tags".bold(),
        "Note".bold(),
        "Created".bold()
    ]);

    for cmd in commands {
        let star = if cmd.is_favourite { "*" } else { "" };
        let created = cmd
            .created_at_utc()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(prettytable::row![
            cmd.id.to_string().cyan(),
            star.yellow(),
            cmd.base_command().bold(),
            cmd.argument_tail(),
            cmd.tag_names().join(", "),
            note_summary(cmd),
            created
        ]);
    }

    println!();
    table.printstd();
    println!();
}

fn print_catalog(commands: &[CatalogCommand]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(prettytable::row!["Command".bold(), "Match".bold()]);
    for cmd in commands {
        let similarity = cmd
            .similarity
            .map(|s| format!("{:.0}%", s * 100.0))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(prettytable::row![cmd.command.cyan(), similarity]);
    }
    println!();
    table.printstd();
    println!();
}

fn note_summary(cmd: &UserCommand) -> String {
    if let Some(description) = cmd.note.get(forms::NOTE_DESCRIPTION_KEY) {
        return description.clone();
    }
    cmd.note
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("; ")
}
