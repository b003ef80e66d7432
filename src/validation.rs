//! Input validation rules
//!
//! Pure predicates over user input. They perform no I/O and hold no state,
//! so forms can run them on every keystroke and the CLI can run them before
//! sending anything to the backend.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Characters accepted as the "special" class of a password.
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const DISPLAY_NAME_PATTERN: &str = r"^[a-zA-Z0-9_]+$";
const COMMAND_PATTERN: &str = r"^[a-z]+\d*[a-z0-9]*$";
const TAG_PATTERN: &str = r"^[a-z]+(?:-[a-z0-9]+)*$";
const PASSWORD_CHARSET_PATTERN: &str = r"^[A-Za-z\d@$!%*?&]{8,16}$";

const MAX_ARGUMENTS_LEN: usize = 1000;

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid validation pattern {}: {}", pattern, e);
            None
        }
    })
    .as_ref()
}

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, input: &str) -> bool {
    compiled(cell, pattern).is_some_and(|re| re.is_match(input))
}

/// `local@domain.tld` shape, 6 to 32 characters.
pub fn is_valid_email(email: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let len = email.chars().count();
    (6..=32).contains(&len) && matches(&RE, EMAIL_PATTERN, email)
}

/// 8 to 16 characters from letters, digits and `@$!%*?&`, with at least one
/// lowercase, one uppercase, one digit and one special character.
///
/// # Examples
///
/// ```
/// use cmdstash::validation::is_valid_password;
///
/// assert!(is_valid_password("Abcdef1!"));
/// assert!(!is_valid_password("abcdef1!"));
/// assert!(!is_valid_password("Abcdefgh1!extra00"));
/// ```
pub fn is_valid_password(password: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, PASSWORD_CHARSET_PATTERN, password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// Letters, digits and underscore only, 3 to 32 characters.
pub fn is_valid_display_name(display_name: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let len = display_name.chars().count();
    (3..=32).contains(&len) && matches(&RE, DISPLAY_NAME_PATTERN, display_name)
}

/// Base command token: lowercase letters, then optional digits and
/// lowercase alphanumerics.
pub fn is_valid_command(command: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, COMMAND_PATTERN, command)
}

/// Lowercase words joined by single hyphens; digits only after a hyphen.
///
/// # Examples
///
/// ```
/// use cmdstash::validation::is_valid_tag;
///
/// assert!(is_valid_tag("git-commit2"));
/// assert!(!is_valid_tag("Git"));
/// assert!(!is_valid_tag("-git"));
/// assert!(!is_valid_tag("git--commit"));
/// ```
pub fn is_valid_tag(tag: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, TAG_PATTERN, tag)
}

/// Non-empty, at most 1000 characters.
pub fn is_valid_arguments(arguments: &str) -> bool {
    let len = arguments.chars().count();
    len > 0 && len <= MAX_ARGUMENTS_LEN
}

/// A note must be a JSON object.
pub fn is_valid_note(note: &Value) -> bool {
    note.is_object()
}

/// Human-readable password rules.
pub fn password_requirements() -> &'static [&'static str] {
    &[
        "At least 8 characters long",
        "At most 16 characters long",
        "Contains at least one lowercase letter",
        "Contains at least one uppercase letter",
        "Contains at least one digit",
        "Contains at least one special character (@$!%*?&)",
    ]
}

/// Human-readable display name rules.
pub fn display_name_requirements() -> &'static [&'static str] {
    &[
        "3-32 characters long",
        "Only letters, numbers, and underscores allowed",
    ]
}

/// Human-readable base command rules.
pub fn command_requirements() -> &'static [&'static str] {
    &[
        "Lowercase letters only",
        "Can include numbers",
        "No special characters except letters and numbers",
    ]
}

/// Human-readable tag rules.
pub fn tag_requirements() -> &'static [&'static str] {
    &[
        "Lowercase letters only",
        "Can include hyphens and numbers",
        "Must start with a letter",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("spa ce@example.com"));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(30))));
    }

    #[test]
    fn test_password_rules() {
        assert!(is_valid_password("Abcdef1!"));
        assert!(is_valid_password("Zz9&Zz9&Zz9&Zz9&"));
        assert!(!is_valid_password("abcdef1!"));
        assert!(!is_valid_password("ABCDEF1!"));
        assert!(!is_valid_password("Abcdefg!"));
        assert!(!is_valid_password("Abcdefg1"));
        assert!(!is_valid_password("Abc1!"));
        assert!(!is_valid_password("Abcdefgh1!extra00"));
        assert!(!is_valid_password("Abcdef1!#"));
        assert!(!is_valid_password("Abcdef1! "));
    }

    #[test]
    fn test_display_name_rules() {
        assert!(is_valid_display_name("ada_l"));
        assert!(is_valid_display_name("abc"));
        assert!(!is_valid_display_name("ab"));
        assert!(!is_valid_display_name("ada-l"));
        assert!(!is_valid_display_name(&"x".repeat(33)));
    }

    #[test]
    fn test_command_rules() {
        assert!(is_valid_command("git"));
        assert!(is_valid_command("python3"));
        assert!(is_valid_command("s3cmd"));
        assert!(!is_valid_command("3ds"));
        assert!(!is_valid_command("Git"));
        assert!(!is_valid_command("apt-get"));
        assert!(!is_valid_command(""));
    }

    #[test]
    fn test_tag_rules() {
        assert!(is_valid_tag("git"));
        assert!(is_valid_tag("git-commit2"));
        assert!(is_valid_tag("node-v18"));
        assert!(!is_valid_tag("Git"));
        assert!(!is_valid_tag("-git"));
        assert!(!is_valid_tag("git-"));
        assert!(!is_valid_tag("git--commit"));
        assert!(!is_valid_tag("git2"));
    }

    #[test]
    fn test_arguments_rules() {
        assert!(is_valid_arguments("git log"));
        assert!(!is_valid_arguments(""));
        assert!(is_valid_arguments(&"a".repeat(1000)));
        assert!(!is_valid_arguments(&"a".repeat(1001)));
    }

    #[test]
    fn test_note_rules() {
        assert!(is_valid_note(&json!({})));
        assert!(is_valid_note(&json!({"description": "x"})));
        assert!(!is_valid_note(&Value::Null));
        assert!(!is_valid_note(&json!("text")));
    }

    #[test]
    fn test_requirement_lists_are_populated() {
        assert_eq!(password_requirements().len(), 6);
        assert_eq!(display_name_requirements().len(), 2);
        assert!(!command_requirements().is_empty());
        assert!(!tag_requirements().is_empty());
    }
}
