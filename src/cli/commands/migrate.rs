use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect().await?;
    DatabaseManager::migrate(store.pool()).await?;
    store.pool().close().await;

    output_success(&output_format, "Migrations applied", None)
}
