//! In-process stores (useful for testing)

use std::collections::BTreeMap;

use tokio::sync::Mutex;

use super::{LocalStore, RemoteStore, SyncLogStore};
use crate::error::Result;
use crate::models::{Document, DocumentId, SyncLog, SyncLogId};

/// `LocalStore` backed by an ordered map
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    documents: Mutex<BTreeMap<DocumentId, Document>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            documents: Mutex::new(documents.into_iter().map(|doc| (doc.id, doc)).collect()),
        }
    }

    /// All stored documents in ID order
    pub async fn snapshot(&self) -> Vec<Document> {
        self.documents.lock().await.values().cloned().collect()
    }
}

impl LocalStore for MemoryLocalStore {
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Document>> {
        let documents = self.documents.lock().await;
        Ok(documents
            .values()
            .filter(|doc| doc.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &DocumentId) -> Result<Option<Document>> {
        Ok(self.documents.lock().await.get(id).cloned())
    }

    async fn put(&self, document: &Document) -> Result<()> {
        self.documents
            .lock()
            .await
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn delete(&self, id: &DocumentId) -> Result<()> {
        self.documents.lock().await.remove(id);
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[DocumentId]) -> Result<()> {
        let mut documents = self.documents.lock().await;
        for id in ids {
            documents.remove(id);
        }
        Ok(())
    }

    async fn children(&self, parent_id: &DocumentId) -> Result<Vec<Document>> {
        let documents = self.documents.lock().await;
        Ok(documents
            .values()
            .filter(|doc| doc.parent_id.as_ref() == Some(parent_id))
            .cloned()
            .collect())
    }
}

/// `RemoteStore` backed by an ordered map
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<BTreeMap<DocumentId, Document>>,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            documents: Mutex::new(documents.into_iter().map(|doc| (doc.id, doc)).collect()),
        }
    }

    pub async fn get(&self, id: &DocumentId) -> Option<Document> {
        self.documents.lock().await.get(id).cloned()
    }

    /// All stored documents in ID order
    pub async fn snapshot(&self) -> Vec<Document> {
        self.documents.lock().await.values().cloned().collect()
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Document>> {
        let documents = self.documents.lock().await;
        Ok(documents
            .values()
            .filter(|doc| doc.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, document: &Document) -> Result<()> {
        self.documents
            .lock()
            .await
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn delete_many(&self, ids: &[DocumentId]) -> Result<()> {
        let mut documents = self.documents.lock().await;
        for id in ids {
            documents.remove(id);
        }
        Ok(())
    }
}

/// `SyncLogStore` backed by a vector in append order
#[derive(Debug, Default)]
pub struct MemorySyncLogStore {
    logs: Mutex<Vec<SyncLog>>,
}

impl MemorySyncLogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.logs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.logs.lock().await.is_empty()
    }
}

impl SyncLogStore for MemorySyncLogStore {
    async fn append(&self, log: &SyncLog) -> Result<()> {
        self.logs.lock().await.push(log.clone());
        Ok(())
    }

    async fn get(&self, id: &SyncLogId) -> Result<Option<SyncLog>> {
        let logs = self.logs.lock().await;
        Ok(logs.iter().find(|log| log.id == *id).cloned())
    }

    async fn latest(&self, owner_id: &str) -> Result<Option<SyncLog>> {
        let logs = self.logs.lock().await;
        Ok(logs
            .iter()
            .filter(|log| log.owner_id == owner_id)
            .max_by_key(|log| log.started_at)
            .cloned())
    }

    async fn prune_older_than(&self, cutoff: i64) -> Result<u64> {
        let mut logs = self.logs.lock().await;
        let before = logs.len();
        logs.retain(|log| log.started_at >= cutoff);
        Ok((before - logs.len()) as u64)
    }
}
