//! Session commands: register, login, logout, status

use colored::Colorize;

use crate::commands::report;
use crate::error::{CmdStashError, Result};
use crate::store::SessionStore;
use crate::validation;

/// Validates the sign-up fields, then registers.
pub async fn register(
    session: &mut SessionStore,
    display_name: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    let mut problems = Vec::new();
    if !validation::is_valid_display_name(display_name) {
        problems.push(requirement_problem(
            "display name",
            validation::display_name_requirements(),
        ));
    }
    if !validation::is_valid_email(email) {
        problems.push("email must look like name@domain.tld (6-32 characters)".to_string());
    }
    if !validation::is_valid_password(password) {
        problems.push(requirement_problem(
            "password",
            validation::password_requirements(),
        ));
    }
    if !problems.is_empty() {
        let err = CmdStashError::Validation(problems.join("\n"));
        return Err(report(None, err.into()));
    }

    match session.register(display_name, email, password).await {
        Ok(user) => {
            println!(
                "{} {} ({})",
                "Registered".green(),
                user.display_name.bold(),
                user.email
            );
            Ok(())
        }
        Err(e) => Err(report(session.error(), e)),
    }
}

/// Signs in and stores the access token.
pub async fn login(session: &mut SessionStore, email: &str, password: &str) -> Result<()> {
    if !validation::is_valid_email(email) {
        let err = CmdStashError::Validation(format!("invalid email '{}'", email));
        return Err(report(None, err.into()));
    }

    match session.login(email, password).await {
        Ok(()) => {
            println!("{} as {}", "Logged in".green(), email.bold());
            Ok(())
        }
        Err(e) => Err(report(session.error(), e)),
    }
}

/// Ends the session on the backend (best effort) and locally.
pub async fn logout(session: &mut SessionStore) -> Result<()> {
    session.logout_remote().await?;
    println!("{}", "Logged out".green());
    Ok(())
}

/// Restores a stored session and reports whether it is valid.
pub async fn status(session: &mut SessionStore) -> Result<()> {
    if session.on_visit().await {
        println!("{}", "Signed in".green());
    } else {
        println!("{}", "Not signed in".yellow());
        println!("Use {} to sign in.", "cmdstash login".cyan());
    }
    Ok(())
}

fn requirement_problem(field: &str, requirements: &[&str]) -> String {
    format!("{} must satisfy:\n  - {}", field, requirements.join("\n  - "))
}
