//! Config commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::output::{print_info, print_single, print_success};

use super::CommandContext;

/// Config commands.
#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommand {
    /// Show the effective configuration.
    Show,

    /// Save defaults for later invocations.
    Set(SetArgs),
}

#[derive(Debug, Args)]
struct SetArgs {
    /// Default API root URL.
    #[arg(long)]
    default_api_url: Option<String>,

    /// Default credential pool file.
    #[arg(long)]
    default_pool_file: Option<PathBuf>,
}

impl ConfigCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ConfigSubcommand::Show => print_single(&ctx.config),
            ConfigSubcommand::Set(args) => {
                if args.default_api_url.is_none() && args.default_pool_file.is_none() {
                    print_info("Nothing to change.");
                    return Ok(());
                }

                let mut config = crate::config::Config::load()?;
                if let Some(api_url) = args.default_api_url {
                    config.api_url = api_url;
                }
                if let Some(pool_file) = args.default_pool_file {
                    config.pool_file = pool_file;
                }

                let path = config.save()?;
                print_success(&format!("Saved configuration to {}", path.display()));
            }
        }

        Ok(())
    }
}
