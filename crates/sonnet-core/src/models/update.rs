//! Classification results produced by a sync check

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::document::DocumentId;

/// The store that needs to change for the two sides to agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSource {
    Local,
    Remote,
}

/// Kind of divergence between the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// The document exists only on the other side
    Missing,
    /// Both sides have the document but `source` is behind (or tied)
    Outdated,
}

/// One field's value on each side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDifference {
    pub local: serde_json::Value,
    pub remote: serde_json::Value,
}

/// Per-field differences keyed by field name
pub type Difference = BTreeMap<String, FieldDifference>;

/// A pending change found by [`SyncManager::check`](crate::sync::SyncManager::check)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub document_id: DocumentId,
    pub source: UpdateSource,
    pub status: UpdateStatus,
    /// `updated_at` of the newer (or only) version
    pub observed_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<Difference>,
}

impl Update {
    /// Short human-readable summary used by clients
    #[must_use]
    pub fn description(&self) -> String {
        match (self.status, self.source) {
            (UpdateStatus::Missing, UpdateSource::Remote) => "not yet uploaded".to_string(),
            (UpdateStatus::Missing, UpdateSource::Local) => "not yet downloaded".to_string(),
            (UpdateStatus::Outdated, source) => {
                let fields = self
                    .difference
                    .as_ref()
                    .map(|difference| difference.keys().cloned().collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                if fields.is_empty() {
                    format!("{} copy is outdated", source_name(source))
                } else {
                    format!("{} copy is outdated ({fields})", source_name(source))
                }
            }
        }
    }
}

const fn source_name(source: UpdateSource) -> &'static str {
    match source {
        UpdateSource::Local => "local",
        UpdateSource::Remote => "remote",
    }
}
