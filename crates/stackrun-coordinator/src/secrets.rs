//! Resolution of the deploy secrets: alarm email and database password
//!
//! Order: command line, environment (handled by clap's `env`), then an
//! interactive prompt. The password prompt never echoes.

use anyhow::{Context, Result, bail};
use stackrun_common::Redacted;
use std::io::{self, BufRead, Write};
use tracing::error;

/// Prompt attempts per secret
const MAX_ATTEMPTS: usize = 3;

/// RDS master password rules
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 41;
const FORBIDDEN_PASSWORD_CHARS: &[char] = &['/', '@', '"', ' '];

/// Source of interactive answers
pub trait Prompt {
    /// Read a visible line
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    /// Read a line without echoing it
    fn read_hidden(&mut self, prompt: &str) -> Result<String>;
}

/// Prompts on the controlling terminal
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim().to_string())
    }

    fn read_hidden(&mut self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        rpassword::read_password().context("Failed to read password")
    }
}

/// Check the RDS master password rules
pub fn validate_db_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(format!("password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(format!("password must be at most {MAX_PASSWORD_LEN} characters"));
    }
    if password
        .chars()
        .any(|c| FORBIDDEN_PASSWORD_CHARS.contains(&c) || !c.is_ascii_graphic())
    {
        return Err(
            "password may only contain printable ASCII other than '/', '@', '\"' and space"
                .to_string(),
        );
    }
    Ok(())
}

/// Loose sanity check; SNS does the real validation when subscribing
pub fn validate_email(email: &str) -> Result<(), String> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(format!("{email:?} is not an email address")),
    }
}

/// Use the given email or ask for one
pub fn resolve_email(given: Option<String>, prompt: &mut impl Prompt) -> Result<String> {
    if let Some(email) = given {
        validate_email(&email).map_err(anyhow::Error::msg)?;
        return Ok(email);
    }
    for _ in 0..MAX_ATTEMPTS {
        let email = prompt.read_line("Email address for alarm notifications: ")?;
        match validate_email(&email) {
            Ok(()) => return Ok(email),
            Err(reason) => error!("{reason}"),
        }
    }
    bail!("no valid email address after {MAX_ATTEMPTS} attempts")
}

/// Use the given password or ask for one (twice, without echo)
pub fn resolve_db_password(given: Option<String>, prompt: &mut impl Prompt) -> Result<Redacted> {
    if let Some(password) = given {
        validate_db_password(&password).map_err(anyhow::Error::msg)?;
        return Ok(Redacted::new(password));
    }
    for _ in 0..MAX_ATTEMPTS {
        let password = prompt.read_hidden("Database master password: ")?;
        if let Err(reason) = validate_db_password(&password) {
            error!("{reason}");
            continue;
        }
        let confirmation = prompt.read_hidden("Confirm password: ")?;
        if password != confirmation {
            error!("Passwords do not match, please try again");
            continue;
        }
        return Ok(Redacted::new(password));
    }
    bail!("no valid database password after {MAX_ATTEMPTS} attempts")
}
