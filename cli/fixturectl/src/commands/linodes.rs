//! Compute instance commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use fixture_api::CreateLinode;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Linode commands.
#[derive(Debug, Args)]
pub struct LinodesCommand {
    #[command(subcommand)]
    command: LinodesSubcommand,
}

#[derive(Debug, Subcommand)]
enum LinodesSubcommand {
    /// List compute instances.
    List,

    /// Create a booted Debian instance.
    Create(CreateArgs),

    /// Allocate a private IPv4 address to an instance.
    AllocatePrivateIp(AllocateArgs),
}

#[derive(Debug, Args)]
struct CreateArgs {
    /// Root password for the instance.
    #[arg(long, env = "FIXTURE_ROOT_PASS", hide_env_values = true)]
    password: String,

    /// Instance label (the API generates one if omitted).
    #[arg(long)]
    label: Option<String>,

    /// Tag to apply (repeatable).
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Debug, Args)]
struct AllocateArgs {
    /// Instance ID.
    linode_id: u64,
}

/// Instance listing row.
#[derive(Debug, Serialize, Tabled)]
struct LinodeRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "LABEL")]
    label: String,

    #[tabled(rename = "STATUS")]
    status: String,

    #[tabled(rename = "REGION")]
    region: String,
}

fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

impl From<&Value> for LinodeRow {
    fn from(linode: &Value) -> Self {
        Self {
            id: field(linode, "id"),
            label: field(linode, "label"),
            status: field(linode, "status"),
            region: field(linode, "region"),
        }
    }
}

impl LinodesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client()?;

        match self.command {
            LinodesSubcommand::List => {
                let page = client.list_linodes().await.map_err(CliError::from)?;
                match ctx.format {
                    OutputFormat::Json => print_single(&page),
                    OutputFormat::Table => {
                        let rows: Vec<LinodeRow> = page.data.iter().map(LinodeRow::from).collect();
                        print_output(&rows, ctx.format);
                    }
                }
            }
            LinodesSubcommand::Create(args) => {
                let mut request = CreateLinode::new(args.password).tags(args.tags);
                if let Some(label) = args.label {
                    request = request.label(label);
                }

                let linode = client.create_linode(&request).await.map_err(CliError::from)?;
                match ctx.format {
                    OutputFormat::Json => print_single(&linode),
                    OutputFormat::Table => print_success(&format!(
                        "Created linode {} ({})",
                        field(&linode, "label"),
                        field(&linode, "id")
                    )),
                }
            }
            LinodesSubcommand::AllocatePrivateIp(args) => {
                let ip = client
                    .allocate_private_ip(args.linode_id)
                    .await
                    .map_err(CliError::from)?;
                match ctx.format {
                    OutputFormat::Json => print_single(&ip),
                    OutputFormat::Table => print_success(&format!(
                        "Allocated {} to linode {}",
                        field(&ip, "address"),
                        args.linode_id
                    )),
                }
            }
        }

        Ok(())
    }
}
