//! Single-resource commands.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use fixture_api::{ApiClient, ApiError, Page};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

/// Resource commands.
#[derive(Debug, Args)]
pub struct ResourcesCommand {
    #[command(subcommand)]
    command: ResourcesSubcommand,
}

#[derive(Debug, Subcommand)]
enum ResourcesSubcommand {
    /// List resources of a kind.
    List(ListArgs),

    /// Remove one resource.
    Remove(RemoveArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ResourceKind {
    Domains,
    Nodebalancers,
    /// Private images only.
    Images,
    SshKeys,
    /// Stack scripts authored by --owner.
    Stackscripts,
    Users,
    /// Listing only; use `cleanup volumes` to remove.
    Volumes,
}

#[derive(Debug, Args)]
struct ListArgs {
    kind: ResourceKind,

    /// Author whose stack scripts to list.
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Debug, Args)]
struct RemoveArgs {
    kind: ResourceKind,

    /// Resource ID (username for users).
    id: String,
}

/// Resource listing row.
#[derive(Debug, Serialize, Tabled)]
struct ResourceRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "NAME")]
    name: String,
}

/// Best human-readable name a resource carries.
fn display_name(item: &Value) -> String {
    ["label", "domain", "username", "email"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .unwrap_or("-")
        .to_string()
}

impl From<&Value> for ResourceRow {
    fn from(item: &Value) -> Self {
        Self {
            id: fixture_api::reaper::resource_key(item).unwrap_or_else(|| "-".to_string()),
            name: display_name(item),
        }
    }
}

async fn list(
    client: &ApiClient,
    kind: ResourceKind,
    owner: Option<&str>,
) -> Result<Page<Value>, CliError> {
    let page = match kind {
        ResourceKind::Domains => client.list_domains().await?,
        ResourceKind::Nodebalancers => client.list_nodebalancers().await?,
        ResourceKind::Images => client.list_private_images().await?,
        ResourceKind::SshKeys => client.list_ssh_keys().await?,
        ResourceKind::Stackscripts => {
            let owner = owner.ok_or_else(|| {
                ApiError::Config("--owner is required for stack scripts".to_string())
            })?;
            client.list_stackscripts(owner).await?
        }
        ResourceKind::Users => client.list_users().await?,
        ResourceKind::Volumes => client.list_volumes().await?,
    };
    Ok(page)
}

async fn remove(client: &ApiClient, kind: ResourceKind, id: &str) -> Result<(), CliError> {
    match kind {
        ResourceKind::Domains => client.remove_domain(id).await?,
        ResourceKind::Nodebalancers => client.remove_nodebalancer(id).await?,
        ResourceKind::Images => client.remove_image(id).await?,
        ResourceKind::SshKeys => client.remove_ssh_key(id).await?,
        ResourceKind::Stackscripts => client.remove_stackscript(id).await?,
        ResourceKind::Users => client.remove_user(id).await?,
        ResourceKind::Volumes => {
            return Err(ApiError::Config(
                "volumes are removed with `fixturectl cleanup volumes`".to_string(),
            )
            .into())
        }
    }
    Ok(())
}

impl ResourcesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client()?;

        match self.command {
            ResourcesSubcommand::List(args) => {
                let page = list(&client, args.kind, args.owner.as_deref()).await?;
                match ctx.format {
                    OutputFormat::Json => print_single(&page),
                    OutputFormat::Table => {
                        let rows: Vec<ResourceRow> =
                            page.data.iter().map(ResourceRow::from).collect();
                        print_output(&rows, ctx.format);
                    }
                }
            }
            ResourcesSubcommand::Remove(args) => {
                remove(&client, args.kind, &args.id).await?;
                print_success(&format!("Removed {:?} {}", args.kind, args.id));
            }
        }

        Ok(())
    }
}
