//! Storage contracts consumed by the sync engine
//!
//! The engine only talks to stores through these traits. The libSQL
//! implementations live in [`crate::db`], the REST remote in
//! [`crate::remote`], and [`memory`] provides in-process stores for tests and
//! offline tooling.

pub mod memory;

use crate::error::Result;
use crate::models::{Document, DocumentId, SyncLog, SyncLogId};

/// The embedded, per-device document store
#[allow(async_fn_in_trait)]
pub trait LocalStore {
    /// Every document of `owner_id`, including archived and soft-deleted ones
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Document>>;

    /// Get a document by ID, soft-deleted or not
    async fn get(&self, id: &DocumentId) -> Result<Option<Document>>;

    /// Insert or replace a document
    async fn put(&self, document: &Document) -> Result<()>;

    /// Physically remove a document
    async fn delete(&self, id: &DocumentId) -> Result<()>;

    /// Physically remove many documents
    async fn bulk_delete(&self, ids: &[DocumentId]) -> Result<()>;

    /// Direct children of `parent_id`, including soft-deleted ones
    async fn children(&self, parent_id: &DocumentId) -> Result<Vec<Document>>;
}

/// The network store of record
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Every document of `owner_id`
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Document>>;

    /// Insert or update a document keyed by its ID
    async fn upsert(&self, document: &Document) -> Result<()>;

    /// Remove many documents
    async fn delete_many(&self, ids: &[DocumentId]) -> Result<()>;
}

/// Append-only sink for sync run records
#[allow(async_fn_in_trait)]
pub trait SyncLogStore {
    /// Persist a new log entry
    async fn append(&self, log: &SyncLog) -> Result<()>;

    /// Get a log entry by ID
    async fn get(&self, id: &SyncLogId) -> Result<Option<SyncLog>>;

    /// Most recent log entry of `owner_id`
    async fn latest(&self, owner_id: &str) -> Result<Option<SyncLog>>;

    /// Delete entries that started before `cutoff` (Unix ms); returns how many
    async fn prune_older_than(&self, cutoff: i64) -> Result<u64>;
}
