use anyhow::bail;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_collection, output_success};
use crate::cli::{connect, OutputFormat};
use crate::database::models::role::normalize_role_name;
use crate::database::{PgStore, Store};

#[derive(Subcommand)]
pub enum RoleCommands {
    #[command(about = "Create a role; the name is stored as ROLE_<NAME>")]
    Create {
        #[arg(help = "Role name")]
        name: String,
    },

    #[command(about = "List roles")]
    List,
}

pub async fn handle(cmd: RoleCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    let result = run(&store, cmd, &output_format).await;
    store.pool().close().await;
    result
}

async fn run(store: &PgStore, cmd: RoleCommands, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        RoleCommands::Create { name } => {
            let Some(normalized) = normalize_role_name(&name) else {
                bail!("invalid role name '{}'", name);
            };
            if store.find_role_by_name(&normalized).await?.is_some() {
                bail!("role '{}' already exists", normalized);
            }
            let role = store.create_role(&normalized).await?;
            output_success(
                output_format,
                &format!("Created role {} (id {})", role.name, role.id),
                Some(json!({ "role": role })),
            )
        }
        RoleCommands::List => {
            let roles = store.list_roles().await?;
            output_collection(output_format, "roles", &roles, "No roles", |r| {
                format!("{:>5}  {}", r.id, r.name)
            })
        }
    }
}
