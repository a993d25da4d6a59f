use std::path::Path;

use crate::commands::common::{load_settings, open_database, sync_manager};
use crate::error::CliError;

pub async fn run_sync(
    as_json: bool,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let settings = load_settings(profile)?;
    let database = open_database(db_path, &settings).await?;
    let manager = sync_manager(&database, &settings)?;
    let outcome = manager.sync().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome.actions)?);
    } else {
        for action in &outcome.actions {
            println!("{}  {}", action.document_id, action.action);
        }
        println!(
            "Sync completed ({} action(s), log {})",
            outcome.actions.len(),
            outcome.log_id
        );
    }

    database.close().await?;
    Ok(())
}
