//! CLI commands.

mod cleanup;
mod config;
mod linodes;
mod pool;
mod profile;
mod resources;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fixture_api::{ApiClient, ApiConfig};
use fixture_pool::{CredentialPool, FilePoolStore};

use crate::config::Config;
use crate::error::CliError;
use crate::output::OutputFormat;

/// fixturectl - Manage e2e test accounts and the cloud resources they create.
#[derive(Debug, Parser)]
#[command(name = "fixturectl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Credential pool file.
    #[arg(long, global = true, env = "FIXTURE_POOL_FILE")]
    pool_file: Option<PathBuf>,

    /// API root URL.
    #[arg(long, global = true, env = "FIXTURE_API_ROOT")]
    api_url: Option<String>,

    /// Bearer token for API commands.
    #[arg(long, global = true, env = "FIXTURE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "FIXTURE_TIMEOUT_SECS", default_value = "10")]
    timeout_secs: u64,

    /// Emit logs as JSON (logs go to stderr; filter with RUST_LOG).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage the credential pool.
    Pool(pool::PoolCommand),

    /// Delete cloud resources owned by test accounts.
    Cleanup(cleanup::CleanupCommand),

    /// Create compute instances for fixtures.
    Linodes(linodes::LinodesCommand),

    /// List or remove individual resources.
    Resources(resources::ResourcesCommand),

    /// Read or update the account profile.
    Profile(profile::ProfileCommand),

    /// Show or change saved CLI configuration.
    Config(config::ConfigCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    pub fn log_json(&self) -> bool {
        self.log_json
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let format = match self.format.as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        };

        let mut config = Config::load()?;
        if let Some(pool_file) = self.pool_file {
            config.pool_file = pool_file;
        }
        if let Some(api_url) = self.api_url {
            config.api_url = api_url;
        }

        let ctx = CommandContext {
            config,
            token: self.token,
            timeout: Duration::from_secs(self.timeout_secs),
            format,
        };

        match self.command {
            Commands::Pool(cmd) => cmd.run(ctx).await,
            Commands::Cleanup(cmd) => cmd.run(ctx).await,
            Commands::Linodes(cmd) => cmd.run(ctx).await,
            Commands::Resources(cmd) => cmd.run(ctx).await,
            Commands::Profile(cmd) => cmd.run(ctx).await,
            Commands::Config(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("fixturectl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub token: Option<String>,
    pub timeout: Duration,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Open the credential pool.
    pub fn pool(&self) -> CredentialPool<FilePoolStore> {
        CredentialPool::new(FilePoolStore::new(&self.config.pool_file))
    }

    /// API settings for `token`.
    pub fn api_config(&self, token: &str) -> ApiConfig {
        ApiConfig::new(&self.config.api_url, token).with_timeout(self.timeout)
    }

    /// Require a token to be specified.
    pub fn require_token(&self) -> Result<&str, CliError> {
        self.token.as_deref().ok_or(CliError::NoToken)
    }

    /// Get an authenticated API client.
    pub fn client(&self) -> Result<ApiClient, CliError> {
        let config = self.api_config(self.require_token()?);
        Ok(ApiClient::new(&config)?)
    }
}
