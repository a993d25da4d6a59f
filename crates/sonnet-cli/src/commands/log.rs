use std::path::Path;

use sonnet_core::store::SyncLogStore;
use sonnet_core::SyncLogId;

use crate::commands::common::{
    format_log_lines, format_sync_timestamp, load_settings, open_database, owner_session,
    sync_log_to_item, SyncLogItem,
};
use crate::error::CliError;

pub async fn run_log(
    id: Option<&str>,
    limit: usize,
    as_json: bool,
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let settings = load_settings(profile)?;
    let owner = owner_session(&settings)?.require_owner().await?;
    let database = open_database(db_path, &settings).await?;
    let logs = database.logs();

    if let Some(id) = id {
        let log_id = id
            .trim()
            .parse::<SyncLogId>()
            .map_err(|_| CliError::InvalidLogId(id.trim().to_string()))?;
        let log = logs
            .get(&log_id)
            .await?
            .filter(|log| log.owner_id == owner)
            .ok_or_else(|| CliError::LogNotFound(log_id.to_string()))?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&log)?);
        } else {
            println!(
                "{}  started {}  took {}ms",
                log.id,
                format_sync_timestamp(log.started_at),
                log.duration
            );
            for action in &log.actions {
                println!("  {}  {}", action.document_id, action.action);
            }
        }
    } else {
        let recent = logs.list_recent(&owner, limit).await?;
        if as_json {
            let items = recent.iter().map(sync_log_to_item).collect::<Vec<SyncLogItem>>();
            println!("{}", serde_json::to_string_pretty(&items)?);
        } else if recent.is_empty() {
            println!("No sync runs recorded.");
        } else {
            for line in format_log_lines(&recent) {
                println!("{line}");
            }
        }
    }

    database.close().await?;
    Ok(())
}
