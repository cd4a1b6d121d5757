use clap::Subcommand;
use serde_json::json;

use crate::api::UserView;
use crate::cli::utils::{output_collection, output_success};
use crate::cli::{connect, OutputFormat};
use crate::database::{PgStore, Store};
use crate::services::{register_user, NewAccount};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user (default role ROLE_USER)")]
    Create {
        #[arg(help = "Username")]
        username: String,

        #[arg(help = "Password")]
        password: String,

        #[arg(help = "Role names, e.g. ROLE_ADMIN or admin")]
        roles: Vec<String>,
    },

    #[command(about = "List users with their roles")]
    List,
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    let result = run(&store, cmd, &output_format).await;
    store.pool().close().await;
    result
}

async fn run(store: &PgStore, cmd: UserCommands, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Create { username, password, roles } => {
            let account = NewAccount {
                username,
                password,
                roles: if roles.is_empty() { None } else { Some(roles) },
            };
            let user = register_user(store, account).await?;
            output_success(
                output_format,
                &format!("Created user '{}' with roles {}", user.username, user.roles.join(", ")),
                Some(json!({ "user": UserView::from(&user) })),
            )
        }
        UserCommands::List => {
            let users = store.list_users().await?;
            let views: Vec<UserView> = users.iter().map(UserView::from).collect();
            output_collection(output_format, "users", &views, "No users", |u| {
                format!("{:>5}  {:<24} {}", u.id, u.username, u.roles.join(", "))
            })
        }
    }
}
