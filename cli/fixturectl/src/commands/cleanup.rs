//! Cleanup commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use fixture_api::{cleanup_accounts, AccountOutcome, ReapReport, Reaper};
use tracing::info;

use crate::error::CliError;
use crate::output::{
    print_info, print_reap_report, print_single, print_success, print_warning, OutputFormat,
};

use super::CommandContext;

/// Cleanup commands.
#[derive(Debug, Args)]
pub struct CleanupCommand {
    #[command(subcommand)]
    command: CleanupSubcommand,
}

#[derive(Debug, Subcommand)]
enum CleanupSubcommand {
    /// Delete domains, node balancers, private images and secondary users.
    Account(AccountArgs),

    /// Run `account` cleanup for every pooled account that has a token.
    All,

    /// Delete every compute instance.
    Linodes,

    /// Delete every volume; fails on the first failed delete.
    Volumes,
}

#[derive(Debug, Args)]
struct AccountArgs {
    /// Username that must survive cleanup (normally the account owner).
    #[arg(long)]
    exclude_user: Option<String>,
}

impl CleanupCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            CleanupSubcommand::Account(args) => {
                let reaper = Reaper::new(ctx.client()?);
                let report = reaper.delete_all(args.exclude_user.as_deref()).await;
                finish(&report, ctx.format)
            }
            CleanupSubcommand::All => cleanup_all(ctx).await,
            CleanupSubcommand::Linodes => {
                let report = Reaper::new(ctx.client()?).remove_all_linodes().await;
                finish(&report, ctx.format)
            }
            CleanupSubcommand::Volumes => {
                match Reaper::new(ctx.client()?).remove_all_volumes().await {
                    Ok(report) => finish(&report, ctx.format),
                    Err(failed) => {
                        print_reap_report(&failed.report, ctx.format);
                        Err(CliError::from(failed).into())
                    }
                }
            }
        }
    }
}

/// Print the report and turn leftover failures into a non-zero exit.
fn finish(report: &ReapReport, format: OutputFormat) -> Result<()> {
    print_reap_report(report, format);

    if report.is_clean() {
        if format == OutputFormat::Table {
            print_success(&format!("Deleted {} resource(s)", report.total_deleted()));
        }
        Ok(())
    } else {
        Err(CliError::CleanupIncomplete {
            failed: report.total_failed(),
        }
        .into())
    }
}

async fn cleanup_all(ctx: CommandContext) -> Result<()> {
    let records = ctx.pool().records().map_err(CliError::from)?;
    let results = cleanup_accounts(&ctx.api_config(""), &records).await;
    info!(accounts = results.len(), "Account cleanup finished");

    let mut failed = 0;
    let mut skipped = 0;
    let mut summary = Vec::new();

    for result in results {
        match result.outcome {
            AccountOutcome::Reaped(report) => {
                failed += report.total_failed();
                if ctx.format == OutputFormat::Table {
                    print_info(&format!("Account {}", result.username));
                    print_reap_report(&report, ctx.format);
                }
                summary.push(serde_json::json!({
                    "username": result.username,
                    "report": report,
                }));
            }
            AccountOutcome::SkippedNoToken => {
                skipped += 1;
                if ctx.format == OutputFormat::Table {
                    print_warning(&format!("Account {}: skipped, no token", result.username));
                }
                summary.push(serde_json::json!({
                    "username": result.username,
                    "skipped": "no token",
                }));
            }
            AccountOutcome::Failed(err) => {
                failed += 1;
                if ctx.format == OutputFormat::Table {
                    print_info(&format!("Account {}: {}", result.username, err));
                }
                summary.push(serde_json::json!({
                    "username": result.username,
                    "error": err.to_string(),
                }));
            }
        }
    }

    if ctx.format == OutputFormat::Json {
        print_single(&summary);
    }

    if failed > 0 {
        return Err(CliError::CleanupIncomplete { failed }.into());
    }
    if ctx.format == OutputFormat::Table {
        print_success(&format!(
            "Cleaned {} account(s), skipped {skipped} without a token",
            summary.len() - skipped
        ));
    }
    Ok(())
}
