//! Error handling and display for the CLI.

use colored::Colorize;
use fixture_api::{ApiError, ReapFailed};
use fixture_pool::PoolError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("No API token. Pass --token or set FIXTURE_TOKEN.")]
    NoToken,

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Reap(#[from] ReapFailed),

    #[error("Cleanup finished with {failed} failure(s)")]
    CleanupIncomplete { failed: usize },
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let Some(cli_err) = err.downcast_ref::<CliError>() else {
        return;
    };

    let hint = match cli_err {
        CliError::NoToken => Some("Hint: Check out a pooled account and pass its token."),
        CliError::Pool(PoolError::Io { .. }) => {
            Some("Hint: Run `fixturectl pool generate` to create the pool file.")
        }
        CliError::Pool(PoolError::Parse { .. }) => {
            Some("Hint: The pool file is corrupt. Regenerate it with `fixturectl pool generate`.")
        }
        CliError::Pool(PoolError::Exhausted { .. }) => {
            Some("Hint: Every account is checked out. Use `fixturectl pool release-all` after crashed runs.")
        }
        CliError::Pool(PoolError::MissingVariable(_)) => {
            Some("Hint: Export MANAGER_USER/MANAGER_PASS (and _2, _3, ... for more accounts).")
        }
        CliError::Api(err) if err.status() == Some(401) => {
            Some("Hint: The token was rejected. It may have expired.")
        }
        CliError::Api(ApiError::Transport(_)) => {
            Some("Hint: Check your network connection and API endpoint.")
        }
        CliError::CleanupIncomplete { .. } => {
            Some("Hint: Re-run with --format json to see every failed delete.")
        }
        _ => None,
    };

    if let Some(hint) = hint {
        eprintln!("\n{}", hint.yellow());
    }
}
