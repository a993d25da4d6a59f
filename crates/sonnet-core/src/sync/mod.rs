//! Reconciliation between the local store and the remote store of record
//!
//! [`SyncManager::check`] reports divergences without touching either store.
//! [`SyncManager::sync`] takes one snapshot of each side, then walks the
//! documents once: uploads, downloads, conflict resolution and finally a
//! batched purge of soft-deleted subtrees. Every run ends with one
//! [`SyncLog`] entry listing the steps that succeeded.

pub mod cascade;
pub mod housekeeping;
pub mod merge;
pub mod resolver;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::error::{Error, Result, StoreKind};
use crate::models::{
    Document, DocumentId, SyncAction, SyncLog, SyncLogId, Update, UpdateSource, UpdateStatus,
};
use crate::store::{LocalStore, RemoteStore, SyncLogStore};
use crate::util::now_millis;

pub use cascade::{plan_deletions, CascadeEngine, CascadeReport};
pub use housekeeping::Housekeeping;
pub use resolver::{resolve, Outcome, Resolution};

/// Maximum ids per batched delete request
const DELETE_BATCH: usize = 100;

/// The signed-in owner, shared between the sync manager and its callers
#[derive(Debug, Clone, Default)]
pub struct Session {
    owner: Arc<RwLock<Option<String>>>,
}

impl Session {
    /// A session with nobody signed in
    pub fn new() -> Self {
        Self::default()
    }

    /// A session already signed in as `owner_id`
    pub fn signed_in(owner_id: impl Into<String>) -> Self {
        Self {
            owner: Arc::new(RwLock::new(Some(owner_id.into()))),
        }
    }

    pub async fn sign_in(&self, owner_id: impl Into<String>) {
        *self.owner.write().await = Some(owner_id.into());
    }

    pub async fn sign_out(&self) {
        *self.owner.write().await = None;
    }

    pub async fn owner(&self) -> Option<String> {
        self.owner.read().await.clone()
    }

    /// The current owner, or `NotAuthenticated`
    pub async fn require_owner(&self) -> Result<String> {
        self.owner().await.ok_or(Error::NotAuthenticated)
    }
}

/// Result of a completed [`SyncManager::sync`] run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub log_id: SyncLogId,
    /// Steps that succeeded, in the order they were applied
    pub actions: Vec<SyncAction>,
}

/// Compares and reconciles one owner's documents across two stores
pub struct SyncManager<L, R, S> {
    local: L,
    remote: R,
    logs: S,
    session: Session,
}

impl<L, R, S> SyncManager<L, R, S>
where
    L: LocalStore,
    R: RemoteStore,
    S: SyncLogStore,
{
    pub const fn new(local: L, remote: R, logs: S, session: Session) -> Self {
        Self {
            local,
            remote,
            logs,
            session,
        }
    }

    pub const fn local(&self) -> &L {
        &self.local
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn logs(&self) -> &S {
        &self.logs
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// List pending changes without writing anything
    pub async fn check(&self) -> Result<Vec<Update>> {
        let owner = self.session.require_owner().await?;
        let (local, remote) = self.fetch_snapshots(&owner).await?;
        let updates = classify(&local, &remote);
        tracing::debug!(owner = %owner, updates = updates.len(), "Sync check finished");
        Ok(updates)
    }

    /// Reconcile both stores and record the run
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let owner = self.session.require_owner().await?;
        let started_at = now_millis();
        let clock = Instant::now();

        let (local, remote) = self.fetch_snapshots(&owner).await?;
        let deletions = plan_deletions(&local, &remote);

        let local_ids: BTreeSet<DocumentId> = local.iter().map(|doc| doc.id).collect();
        let remote_by_id: BTreeMap<DocumentId, &Document> =
            remote.iter().map(|doc| (doc.id, doc)).collect();

        let mut actions = Vec::new();

        for document in parents_first(&local) {
            if deletions.contains(&document.id) {
                continue;
            }
            let step = match remote_by_id.get(&document.id) {
                None => self.upload(document, started_at).await.map(Some),
                Some(remote_copy) => self.reconcile(document, remote_copy, started_at).await,
            };
            record(&mut actions, document.id, step);
        }

        let remote_only: Vec<Document> = remote
            .iter()
            .filter(|doc| !local_ids.contains(&doc.id) && !deletions.contains(&doc.id))
            .cloned()
            .collect();
        for document in parents_first(&remote_only) {
            let step = self.download(document, started_at).await.map(Some);
            record(&mut actions, document.id, step);
        }

        self.purge(&deletions, &local_ids, &remote_by_id, &mut actions)
            .await;

        let duration = i64::try_from(clock.elapsed().as_millis()).unwrap_or(i64::MAX);
        let log = SyncLog::new(owner, started_at, duration, actions);
        self.logs.append(&log).await?;

        tracing::info!(
            log_id = %log.id,
            actions = log.actions.len(),
            duration_ms = duration,
            "Sync finished"
        );
        Ok(SyncOutcome {
            log_id: log.id,
            actions: log.actions,
        })
    }

    /// A log entry by id
    pub async fn get_log(&self, id: &SyncLogId) -> Result<Option<SyncLog>> {
        self.logs.get(id).await
    }

    /// The most recent run of the signed-in owner
    pub async fn latest_log(&self) -> Result<Option<SyncLog>> {
        let owner = self.session.require_owner().await?;
        self.logs.latest(&owner).await
    }

    async fn fetch_snapshots(&self, owner: &str) -> Result<(Vec<Document>, Vec<Document>)> {
        tokio::try_join!(
            async {
                self.local
                    .list_all(owner)
                    .await
                    .map_err(|error| Error::fetch(StoreKind::Local, &error))
            },
            async {
                self.remote
                    .list_all(owner)
                    .await
                    .map_err(|error| Error::fetch(StoreKind::Remote, &error))
            },
        )
    }

    /// Push a local-only document, then stamp the local copy
    async fn upload(&self, document: &Document, started_at: i64) -> Result<SyncAction> {
        let mut copy = document.clone();
        copy.synced_at = started_at;
        self.remote.upsert(&copy).await?;
        self.local.put(&copy).await?;
        tracing::debug!(document_id = %copy.id, "Uploaded");
        Ok(SyncAction::uploaded(copy.id))
    }

    async fn download(&self, document: &Document, started_at: i64) -> Result<SyncAction> {
        let mut copy = document.clone();
        copy.synced_at = started_at;
        self.local.put(&copy).await?;
        tracing::debug!(document_id = %copy.id, "Downloaded");
        Ok(SyncAction::downloaded(copy.id))
    }

    /// Apply the resolver's decision for a document present on both sides
    async fn reconcile(
        &self,
        local: &Document,
        remote: &Document,
        started_at: i64,
    ) -> Result<Option<SyncAction>> {
        let Resolution {
            outcome,
            mut document,
        } = resolve(local, remote, now_millis());
        document.synced_at = started_at;
        tracing::debug!(document_id = %document.id, ?outcome, "Resolved");

        match outcome {
            Outcome::Identical => Ok(None),
            Outcome::LocalNewer => {
                self.remote.upsert(&document).await?;
                self.local.put(&document).await?;
                Ok(Some(SyncAction::uploaded(document.id)))
            }
            Outcome::RemoteNewer => {
                self.local.put(&document).await?;
                Ok(Some(SyncAction::conflict_resolved(
                    document.id,
                    outcome.description(),
                )))
            }
            Outcome::Merged => {
                self.remote.upsert(&document).await?;
                self.local.put(&document).await?;
                Ok(Some(SyncAction::conflict_resolved(
                    document.id,
                    outcome.description(),
                )))
            }
        }
    }

    /// Physically remove planned deletions from both stores
    ///
    /// Ids whose remote delete failed stay in the local store, so the
    /// soft-deleted copy is still there to retry from on the next run.
    async fn purge(
        &self,
        deletions: &BTreeSet<DocumentId>,
        local_ids: &BTreeSet<DocumentId>,
        remote_by_id: &BTreeMap<DocumentId, &Document>,
        actions: &mut Vec<SyncAction>,
    ) {
        let remote_targets: Vec<DocumentId> = deletions
            .iter()
            .filter(|id| remote_by_id.contains_key(id))
            .copied()
            .collect();
        let mut remote_failed = BTreeSet::new();
        for chunk in remote_targets.chunks(DELETE_BATCH) {
            match self.remote.delete_many(chunk).await {
                Ok(()) => actions.extend(chunk.iter().copied().map(SyncAction::deleted_remotely)),
                Err(error) => {
                    tracing::warn!(%error, count = chunk.len(), "Remote delete batch failed");
                    remote_failed.extend(chunk.iter().copied());
                }
            }
        }

        let local_targets: Vec<DocumentId> = deletions
            .iter()
            .filter(|id| local_ids.contains(id) && !remote_failed.contains(id))
            .copied()
            .collect();
        for chunk in local_targets.chunks(DELETE_BATCH) {
            match self.local.bulk_delete(chunk).await {
                Ok(()) => actions.extend(chunk.iter().copied().map(SyncAction::deleted_locally)),
                Err(error) => {
                    tracing::warn!(%error, count = chunk.len(), "Local delete batch failed");
                }
            }
        }
    }
}

/// Keep successful steps, log and drop failed ones
fn record(actions: &mut Vec<SyncAction>, id: DocumentId, step: Result<Option<SyncAction>>) {
    match step {
        Ok(Some(action)) => actions.push(action),
        Ok(None) => {}
        Err(error) => {
            let error = Error::write(id, &error);
            tracing::warn!(%error, "Skipping document for this run");
        }
    }
}

/// Classify every divergence between two snapshots
fn classify(local: &[Document], remote: &[Document]) -> Vec<Update> {
    let mut remote_by_id: BTreeMap<DocumentId, &Document> =
        remote.iter().map(|doc| (doc.id, doc)).collect();
    let mut updates = Vec::new();

    for local_doc in local {
        let Some(remote_doc) = remote_by_id.remove(&local_doc.id) else {
            if !local_doc.is_deleted() {
                updates.push(Update {
                    document_id: local_doc.id,
                    source: UpdateSource::Remote,
                    status: UpdateStatus::Missing,
                    observed_at: local_doc.updated_at,
                    difference: None,
                });
            }
            continue;
        };

        let difference = resolver::difference(local_doc, remote_doc);
        if difference.is_empty() {
            continue;
        }

        // Ties count against the local copy
        let (source, observed_at) = if local_doc.updated_at > remote_doc.updated_at {
            (UpdateSource::Remote, local_doc.updated_at)
        } else {
            (UpdateSource::Local, remote_doc.updated_at)
        };
        updates.push(Update {
            document_id: local_doc.id,
            source,
            status: UpdateStatus::Outdated,
            observed_at,
            difference: Some(difference),
        });
    }

    updates.extend(
        remote_by_id
            .into_values()
            .filter(|doc| !doc.is_deleted())
            .map(|doc| Update {
                document_id: doc.id,
                source: UpdateSource::Local,
                status: UpdateStatus::Missing,
                observed_at: doc.updated_at,
                difference: None,
            }),
    );

    updates
}

/// Order a snapshot so every parent comes before its children
///
/// Depth is measured inside the snapshot; ties break on id.
fn parents_first(documents: &[Document]) -> Vec<&Document> {
    let parents: BTreeMap<DocumentId, Option<DocumentId>> = documents
        .iter()
        .map(|doc| (doc.id, doc.parent_id))
        .collect();

    let depth_of = |document: &Document| {
        let mut depth = 0_usize;
        let mut cursor = document.parent_id;
        while let Some(parent) = cursor {
            if depth >= documents.len() {
                break;
            }
            match parents.get(&parent) {
                Some(next) => {
                    depth += 1;
                    cursor = *next;
                }
                None => break,
            }
        }
        depth
    };

    let mut ordered: Vec<(usize, &Document)> =
        documents.iter().map(|doc| (depth_of(doc), doc)).collect();
    ordered.sort_by(|(a_depth, a), (b_depth, b)| a_depth.cmp(b_depth).then(a.id.cmp(&b.id)));
    ordered.into_iter().map(|(_, doc)| doc).collect()
}
