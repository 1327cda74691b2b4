//! Credential pool commands.
//!
//! Test runners call `checkout` when a test file starts and `checkin` when it
//! finishes; the pool file is shared by every runner on the host.

use anyhow::Result;
use clap::{Args, Subcommand};
use fixture_pool::{CredentialRecord, EnvSource, TokenUpdate};
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_info, print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Pool commands.
#[derive(Debug, Args)]
pub struct PoolCommand {
    #[command(subcommand)]
    command: PoolSubcommand,
}

#[derive(Debug, Subcommand)]
enum PoolSubcommand {
    /// Build the pool from MANAGER_USER/MANAGER_PASS[/MANAGER_OAUTH] variables.
    Generate(GenerateArgs),

    /// List pooled accounts (tokens are never shown in table output).
    List,

    /// Claim a free account for a test file.
    Checkout(SpecArgs),

    /// Release the account held by a test file.
    Checkin(SpecArgs),

    /// Save a token captured at login (preset tokens are kept).
    StoreToken(StoreTokenArgs),

    /// Print the stored token for an account.
    ReadToken(UsernameArgs),

    /// Release every checked-out account.
    ReleaseAll,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Number of accounts to read (1 uses the unsuffixed variables).
    #[arg(long, default_value = "1")]
    count: usize,
}

#[derive(Debug, Args)]
struct SpecArgs {
    /// Test file identifier.
    spec: String,
}

#[derive(Debug, Args)]
struct StoreTokenArgs {
    /// Account username.
    username: String,

    /// Token to store.
    #[arg(value_name = "TOKEN")]
    captured: String,
}

#[derive(Debug, Args)]
struct UsernameArgs {
    /// Account username.
    username: String,
}

/// Pool listing row.
#[derive(Debug, Serialize, Tabled)]
struct PoolRow {
    #[tabled(rename = "USERNAME")]
    username: String,

    #[tabled(rename = "IN USE")]
    in_use: bool,

    #[tabled(rename = "SPEC")]
    spec: String,

    #[tabled(rename = "TOKEN")]
    token: &'static str,

    #[tabled(rename = "SINCE")]
    since: String,
}

impl From<&CredentialRecord> for PoolRow {
    fn from(record: &CredentialRecord) -> Self {
        let token = match (record.is_preset_token, record.token.is_empty()) {
            (true, _) => "preset",
            (false, false) => "captured",
            (false, true) => "-",
        };
        Self {
            username: record.username.clone(),
            in_use: record.in_use,
            spec: if record.spec.is_empty() {
                "-".to_string()
            } else {
                record.spec.clone()
            },
            token,
            since: record
                .checked_out_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

impl PoolCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let pool = ctx.pool();

        match self.command {
            PoolSubcommand::Generate(args) => {
                let records = fixture_pool::generate(pool.store(), &EnvSource, args.count)
                    .map_err(CliError::from)?;
                print_success(&format!(
                    "Generated {} account(s) in {}",
                    records.len(),
                    ctx.config.pool_file.display()
                ));
            }
            PoolSubcommand::List => {
                let records = pool.records().map_err(CliError::from)?;
                match ctx.format {
                    OutputFormat::Json => print_single(&records),
                    OutputFormat::Table => {
                        let rows: Vec<PoolRow> = records.iter().map(PoolRow::from).collect();
                        print_output(&rows, ctx.format);
                    }
                }
            }
            PoolSubcommand::Checkout(args) => {
                let record = pool.checkout(&args.spec).map_err(CliError::from)?;
                match ctx.format {
                    OutputFormat::Json => print_single(&record),
                    OutputFormat::Table => {
                        print_success(&format!(
                            "{} checked out {}",
                            args.spec, record.username
                        ));
                    }
                }
            }
            PoolSubcommand::Checkin(args) => {
                match pool.checkin(&args.spec).map_err(CliError::from)? {
                    Some(record) => print_success(&format!(
                        "{} checked in {}",
                        args.spec, record.username
                    )),
                    None => print_info(&format!("{} held no account", args.spec)),
                }
            }
            PoolSubcommand::StoreToken(args) => {
                match pool
                    .store_token(&args.username, &args.captured)
                    .map_err(CliError::from)?
                {
                    TokenUpdate::Stored => {
                        print_success(&format!("Stored token for {}", args.username))
                    }
                    TokenUpdate::PresetKept => print_info(&format!(
                        "{} has a preset token; left unchanged",
                        args.username
                    )),
                }
            }
            PoolSubcommand::ReadToken(args) => {
                let token = pool.read_token(&args.username).map_err(CliError::from)?;
                println!("{token}");
            }
            PoolSubcommand::ReleaseAll => {
                let released = pool.release_all().map_err(CliError::from)?;
                print_success(&format!("Released {released} account(s)"));
            }
        }

        Ok(())
    }
}
