//! Sync audit log model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::document::DocumentId;

/// A unique identifier for a sync log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncLogId(Uuid);

impl SyncLogId {
    /// Create a new unique log ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SyncLogId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// One completed per-document step of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAction {
    pub document_id: DocumentId,
    pub action: String,
}

impl SyncAction {
    #[must_use]
    pub fn new(document_id: DocumentId, action: impl Into<String>) -> Self {
        Self {
            document_id,
            action: action.into(),
        }
    }

    #[must_use]
    pub fn uploaded(document_id: DocumentId) -> Self {
        Self::new(document_id, "uploaded")
    }

    #[must_use]
    pub fn downloaded(document_id: DocumentId) -> Self {
        Self::new(document_id, "downloaded")
    }

    #[must_use]
    pub fn conflict_resolved(document_id: DocumentId, description: &str) -> Self {
        Self::new(document_id, format!("conflict resolved: {description}"))
    }

    #[must_use]
    pub fn deleted_remotely(document_id: DocumentId) -> Self {
        Self::new(document_id, "deleted remotely")
    }

    #[must_use]
    pub fn deleted_locally(document_id: DocumentId) -> Self {
        Self::new(document_id, "deleted locally")
    }
}

/// Append-only record of one `sync()` run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: SyncLogId,
    pub owner_id: String,
    /// Run start (Unix ms)
    pub started_at: i64,
    /// Elapsed run time in milliseconds
    pub duration: i64,
    pub actions: Vec<SyncAction>,
}

impl SyncLog {
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        started_at: i64,
        duration: i64,
        actions: Vec<SyncAction>,
    ) -> Self {
        Self {
            id: SyncLogId::new(),
            owner_id: owner_id.into(),
            started_at,
            duration,
            actions,
        }
    }
}
