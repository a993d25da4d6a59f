use std::path::Path;

use crate::commands::common::{format_update_lines, load_settings, open_database, sync_manager};
use crate::error::CliError;

pub async fn run_check(
    as_json: bool,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let settings = load_settings(profile)?;
    let database = open_database(db_path, &settings).await?;
    let manager = sync_manager(&database, &settings)?;
    let updates = manager.check().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&updates)?);
    } else if updates.is_empty() {
        println!("Everything is in sync.");
    } else {
        for line in format_update_lines(&updates) {
            println!("{line}");
        }
    }

    database.close().await?;
    Ok(())
}
