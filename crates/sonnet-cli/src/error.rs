use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] sonnet_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Document ID cannot be empty")]
    EmptyDocumentId,
    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),
    #[error("Invalid sync log ID: {0}")]
    InvalidLogId(String),
    #[error("Sync log not found: {0}")]
    LogNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "No owner configured. Run `sonnet config init --owner-id <ID>` or set SONNET_OWNER_ID."
    )]
    OwnerNotConfigured,
    #[error(
        "Sync is not configured. Run `sonnet config init` and set SONNET_ACCESS_TOKEN, or set SONNET_SUPABASE_URL and SONNET_SUPABASE_ANON_KEY."
    )]
    SyncNotConfigured,
}
