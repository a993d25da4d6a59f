use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sonnet_core::db::{LibSqlDocumentStore, LibSqlSyncLogStore};
use sonnet_core::{
    Document, DocumentId, DocumentService, LocalDatabase, RestRemoteStore, Session, SyncLog,
    SyncManager, Update,
};

use crate::config_profiles::{CliProfilesConfig, ResolvedSettings};
use crate::error::CliError;

pub type CliSyncManager = SyncManager<LibSqlDocumentStore, RestRemoteStore, LibSqlSyncLogStore>;

#[derive(Debug, Serialize)]
pub struct DocumentListItem {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub slug: String,
    pub published: bool,
    pub pinned: bool,
    pub locked: bool,
    pub read_time: u32,
    pub updated_at: i64,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct SyncLogItem {
    pub id: String,
    pub started_at: i64,
    pub started_at_iso: String,
    pub duration_ms: i64,
    pub action_count: usize,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("SONNET_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sonnet")
        .join("sonnet.db")
}

/// Open the local database with the log housekeeping schedule from `settings`
pub async fn open_database(
    path: &Path,
    settings: &ResolvedSettings,
) -> Result<LocalDatabase, CliError> {
    let housekeeping = settings.housekeeping.validate()?;
    tracing::debug!(
        retention_days = housekeeping.retention_days,
        interval_secs = housekeeping.interval_secs,
        "Sync log housekeeping"
    );
    Ok(LocalDatabase::open_path(path, housekeeping).await?)
}

/// Active profile merged with environment overrides
pub fn load_settings(profile: Option<&str>) -> Result<ResolvedSettings, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    Ok(profile.resolve_with(|key| env::var(key).ok()))
}

pub fn owner_session(settings: &ResolvedSettings) -> Result<Session, CliError> {
    settings
        .owner_id
        .as_deref()
        .map(Session::signed_in)
        .ok_or(CliError::OwnerNotConfigured)
}

pub fn document_service(
    database: &LocalDatabase,
    settings: &ResolvedSettings,
) -> Result<DocumentService<LibSqlDocumentStore>, CliError> {
    Ok(DocumentService::new(
        database.documents(),
        owner_session(settings)?,
    ))
}

pub fn sync_manager(
    database: &LocalDatabase,
    settings: &ResolvedSettings,
) -> Result<CliSyncManager, CliError> {
    let session = owner_session(settings)?;
    let config = settings.engine_config()?;
    let (Some(remote_config), Some(access_token)) =
        (config.remote, settings.access_token.as_deref())
    else {
        return Err(CliError::SyncNotConfigured);
    };

    let remote = RestRemoteStore::new(remote_config, access_token)?;
    Ok(SyncManager::new(
        database.documents(),
        remote,
        database.logs(),
        session,
    ))
}

pub fn parse_document_id(id: &str) -> Result<DocumentId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyDocumentId);
    }
    trimmed
        .parse::<DocumentId>()
        .map_err(|_| CliError::InvalidDocumentId(trimmed.to_string()))
}

pub fn document_title(document: &Document, max_chars: usize) -> String {
    let collapsed = document
        .title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.is_empty() {
        return "Untitled".to_string();
    }

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_document_lines(documents: &[Document]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    documents
        .iter()
        .map(|document| {
            let id = document.id.to_string();
            let indent = if document.parent_id.is_some() { "  " } else { "" };
            let title = format!("{indent}{}", document_title(document, 40));
            let relative_time = format_relative_time(document.updated_at, now_ms);
            let flags = render_flags(document);

            if flags.is_empty() {
                format!("{id}  {title:<42}  {relative_time}")
            } else {
                format!("{id}  {title:<42}  {relative_time:<10}  {flags}")
            }
        })
        .collect()
}

pub fn document_to_list_item(document: &Document) -> DocumentListItem {
    let now_ms = Utc::now().timestamp_millis();
    DocumentListItem {
        id: document.id.to_string(),
        parent_id: document.parent_id.map(|id| id.to_string()),
        title: document.title.clone(),
        slug: document.slug.clone(),
        published: document.published,
        pinned: document.pinned,
        locked: document.locked,
        read_time: document.read_time,
        updated_at: document.updated_at,
        relative_time: format_relative_time(document.updated_at, now_ms),
    }
}

pub fn render_flags(document: &Document) -> String {
    [
        (document.pinned, "[pinned]"),
        (!document.published, "[draft]"),
        (document.locked, "[locked]"),
    ]
    .into_iter()
    .filter_map(|(set, label)| set.then_some(label))
    .collect::<Vec<_>>()
    .join(" ")
}

pub fn format_update_lines(updates: &[Update]) -> Vec<String> {
    updates
        .iter()
        .map(|update| format!("{}  {}", update.document_id, update.description()))
        .collect()
}

pub fn format_log_lines(logs: &[SyncLog]) -> Vec<String> {
    logs.iter()
        .map(|log| {
            format!(
                "{}  {}  {:>6}ms  {} action(s)",
                log.id,
                format_sync_timestamp(log.started_at),
                log.duration,
                log.actions.len()
            )
        })
        .collect()
}

pub fn sync_log_to_item(log: &SyncLog) -> SyncLogItem {
    SyncLogItem {
        id: log.id.to_string(),
        started_at: log.started_at,
        started_at_iso: format_sync_timestamp(log.started_at),
        duration_ms: log.duration,
        action_count: log.actions.len(),
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
