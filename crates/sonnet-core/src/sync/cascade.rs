//! Subtree state changes: archive, restore and soft delete
//!
//! Every node is written on its own, with no transaction spanning the tree. A
//! node that already has the target state is left alone but still walked, so
//! re-running an interrupted cascade finishes the remaining nodes.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::{Error, Result};
use crate::models::{Document, DocumentId};
use crate::store::LocalStore;

/// What a cascade touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Nodes reached, including ones already in the target state
    pub visited: usize,
    /// Nodes actually written
    pub updated: usize,
}

/// Applies a state change to a document and all of its descendants
pub struct CascadeEngine<'a, L> {
    store: &'a L,
}

impl<'a, L: LocalStore> CascadeEngine<'a, L> {
    pub const fn new(store: &'a L) -> Self {
        Self { store }
    }

    /// Move a document and its pages to the trash
    pub async fn archive(&self, id: &DocumentId, now: i64) -> Result<CascadeReport> {
        self.cascade(id, now, |document, now| {
            if document.archived {
                return false;
            }
            document.archived = true;
            document.archived_at = now;
            true
        })
        .await
    }

    /// Take a document and its pages out of the trash
    pub async fn restore(&self, id: &DocumentId, now: i64) -> Result<CascadeReport> {
        self.cascade(id, now, |document, _| {
            if !document.archived && document.archived_at == 0 {
                return false;
            }
            document.archived = false;
            document.archived_at = 0;
            true
        })
        .await
    }

    /// Stamp `deleted_at` on a document and its pages
    ///
    /// The documents disappear from listings right away; the next sync purges
    /// them from both stores.
    pub async fn soft_delete(&self, id: &DocumentId, now: i64) -> Result<CascadeReport> {
        self.cascade(id, now, |document, now| {
            if document.is_deleted() {
                return false;
            }
            document.deleted_at = now;
            true
        })
        .await
    }

    /// Pre-order walk with an explicit stack
    async fn cascade<F>(&self, root: &DocumentId, now: i64, apply: F) -> Result<CascadeReport>
    where
        F: Fn(&mut Document, i64) -> bool,
    {
        let root = self
            .store
            .get(root)
            .await?
            .ok_or_else(|| Error::NotFound(format!("document {root}")))?;

        let mut report = CascadeReport::default();
        let mut seen = HashSet::new();
        let mut stack = vec![root];

        while let Some(mut document) = stack.pop() {
            if !seen.insert(document.id) {
                tracing::warn!(document_id = %document.id, "Cycle in document tree, skipping");
                continue;
            }
            report.visited += 1;

            if apply(&mut document, now) {
                document.touch(now);
                self.store.put(&document).await?;
                report.updated += 1;
            }

            let children = self.store.children(&document.id).await?;
            stack.extend(children.into_iter().rev());
        }

        tracing::debug!(
            visited = report.visited,
            updated = report.updated,
            "Cascade finished"
        );
        Ok(report)
    }
}

/// Ids a sync run has to purge from both stores
///
/// Starts from every document soft-deleted on either side and adds all of
/// their descendants found in either snapshot.
#[must_use]
pub fn plan_deletions(local: &[Document], remote: &[Document]) -> BTreeSet<DocumentId> {
    let mut children: BTreeMap<DocumentId, BTreeSet<DocumentId>> = BTreeMap::new();
    for document in local.iter().chain(remote) {
        if let Some(parent) = document.parent_id {
            children.entry(parent).or_default().insert(document.id);
        }
    }

    let mut planned = BTreeSet::new();
    let mut stack: Vec<DocumentId> = local
        .iter()
        .chain(remote)
        .filter(|document| document.is_deleted())
        .map(|document| document.id)
        .collect();

    while let Some(id) = stack.pop() {
        if !planned.insert(id) {
            continue;
        }
        if let Some(ids) = children.get(&id) {
            stack.extend(ids.iter().copied());
        }
    }

    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLocalStore;
    use pretty_assertions::assert_eq;

    /// root -> (a -> (a1, a2), b)
    fn tree() -> Vec<Document> {
        let root = Document::new_root("owner-1");
        let a = Document::new_page("owner-1", root.id);
        let a1 = Document::new_page("owner-1", a.id);
        let a2 = Document::new_page("owner-1", a.id);
        let b = Document::new_page("owner-1", root.id);
        vec![root, a, a1, a2, b]
    }

    /// Fails every `put` after the first `allowed` ones
    struct CrashingStore {
        inner: MemoryLocalStore,
        allowed: std::sync::atomic::AtomicUsize,
    }

    impl LocalStore for CrashingStore {
        async fn list_all(&self, owner_id: &str) -> Result<Vec<Document>> {
            self.inner.list_all(owner_id).await
        }

        async fn get(&self, id: &DocumentId) -> Result<Option<Document>> {
            self.inner.get(id).await
        }

        async fn put(&self, document: &Document) -> Result<()> {
            use std::sync::atomic::Ordering;
            let remaining = self.allowed.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(Error::Database("simulated crash".to_string()));
            }
            self.allowed.store(remaining - 1, Ordering::SeqCst);
            self.inner.put(document).await
        }

        async fn delete(&self, id: &DocumentId) -> Result<()> {
            self.inner.delete(id).await
        }

        async fn bulk_delete(&self, ids: &[DocumentId]) -> Result<()> {
            self.inner.bulk_delete(ids).await
        }

        async fn children(&self, parent_id: &DocumentId) -> Result<Vec<Document>> {
            self.inner.children(parent_id).await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn archive_and_restore_whole_subtree() {
        let docs = tree();
        let root = docs[0].id;
        let store = MemoryLocalStore::with_documents(docs);
        let engine = CascadeEngine::new(&store);

        let report = engine.archive(&root, 1_000).await.unwrap();
        assert_eq!(report, CascadeReport { visited: 5, updated: 5 });
        let archived = store.snapshot().await;
        assert!(archived.iter().all(|doc| doc.archived && doc.archived_at == 1_000));

        let report = engine.restore(&root, 2_000).await.unwrap();
        assert_eq!(report.updated, 5);
        let restored = store.snapshot().await;
        assert!(restored.iter().all(|doc| !doc.archived && doc.archived_at == 0));
        assert!(restored.iter().all(|doc| doc.updated_at >= 2_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn archive_of_subtree_leaves_siblings() {
        let docs = tree();
        let (a, b) = (docs[1].id, docs[4].id);
        let store = MemoryLocalStore::with_documents(docs);

        let report = CascadeEngine::new(&store).archive(&a, 10).await.unwrap();
        assert_eq!(report.visited, 3);
        assert!(!store.get(&b).await.unwrap().unwrap().archived);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cascade_is_idempotent() {
        let docs = tree();
        let root = docs[0].id;
        let store = MemoryLocalStore::with_documents(docs);
        let engine = CascadeEngine::new(&store);

        engine.archive(&root, 1_000).await.unwrap();
        let before = store.snapshot().await;
        let report = engine.archive(&root, 5_000).await.unwrap();
        assert_eq!(report, CascadeReport { visited: 5, updated: 0 });
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn soft_delete_resumes_after_crash() {
        let docs = tree();
        let root = docs[0].id;
        let store = CrashingStore {
            inner: MemoryLocalStore::with_documents(docs),
            allowed: std::sync::atomic::AtomicUsize::new(1),
        };

        // Only the root gets stamped before the crash
        let result = CascadeEngine::new(&store).soft_delete(&root, 700).await;
        assert!(result.is_err());
        let partial = store.inner.snapshot().await;
        assert_eq!(partial.iter().filter(|doc| doc.is_deleted()).count(), 1);
        assert!(store.inner.get(&root).await.unwrap().unwrap().is_deleted());

        store
            .allowed
            .store(usize::MAX, std::sync::atomic::Ordering::SeqCst);
        let report = CascadeEngine::new(&store).soft_delete(&root, 900).await.unwrap();
        assert_eq!(report, CascadeReport { visited: 5, updated: 4 });

        let all = store.inner.snapshot().await;
        assert!(all.iter().all(Document::is_deleted));
        assert_eq!(
            store.inner.get(&root).await.unwrap().unwrap().deleted_at,
            700
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cascade_survives_cycles() {
        let mut a = Document::new_root("owner-1");
        let b = Document::new_page("owner-1", a.id);
        a.parent_id = Some(b.id);
        let store = MemoryLocalStore::with_documents([a.clone(), b]);

        let report = CascadeEngine::new(&store).archive(&a.id, 1).await.unwrap();
        assert_eq!(report.visited, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cascade_on_missing_document_is_not_found() {
        let store = MemoryLocalStore::new();
        let result = CascadeEngine::new(&store)
            .archive(&DocumentId::new(), 1)
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn plan_deletions_expands_descendants_across_snapshots() {
        let docs = tree();
        let (root, a, a1, a2, b) = (&docs[0], &docs[1], &docs[2], &docs[3], &docs[4]);

        let mut deleted_a = a.clone();
        deleted_a.deleted_at = 10;
        // a3 only exists remotely
        let a3 = Document::new_page("owner-1", a.id);

        let local = vec![root.clone(), deleted_a, a1.clone(), b.clone()];
        let remote = vec![root.clone(), a.clone(), a2.clone(), a3.clone()];

        let planned = plan_deletions(&local, &remote);
        assert_eq!(planned, BTreeSet::from([a.id, a1.id, a2.id, a3.id]));
    }

    #[test]
    fn plan_deletions_empty_without_deleted_documents() {
        let docs = tree();
        assert!(plan_deletions(&docs, &docs).is_empty());
    }
}
