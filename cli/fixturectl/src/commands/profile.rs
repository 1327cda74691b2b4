//! Profile commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::error::CliError;
use crate::output::print_single;

use super::CommandContext;

/// Profile commands.
#[derive(Debug, Args)]
pub struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProfileSubcommand {
    /// Show the profile of the token's account.
    Get,

    /// Apply a partial update, e.g. --json '{"timezone":"UTC"}'.
    Update(UpdateArgs),
}

#[derive(Debug, Args)]
struct UpdateArgs {
    /// JSON object with the fields to change.
    #[arg(long)]
    json: String,
}

impl ProfileCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client()?;

        let profile = match self.command {
            ProfileSubcommand::Get => client.get_profile().await.map_err(CliError::from)?,
            ProfileSubcommand::Update(args) => {
                let changes: serde_json::Value =
                    serde_json::from_str(&args.json).context("--json is not valid JSON")?;
                if !changes.is_object() {
                    anyhow::bail!("--json must be a JSON object");
                }
                client
                    .update_profile(&changes)
                    .await
                    .map_err(CliError::from)?
            }
        };

        print_single(&profile);
        Ok(())
    }
}
