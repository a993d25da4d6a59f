//! Document commands for the signed-in owner.

use crate::error::{Error, Result};
use crate::models::{
    available_actions, slugify, Block, CoverImage, Document, DocumentAction, DocumentId,
};
use crate::store::LocalStore;
use crate::sync::{CascadeEngine, CascadeReport, Session};
use crate::util::now_millis;

/// Editable fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub content: Option<Vec<Block>>,
    pub category_id: Option<String>,
    pub icon: Option<Option<String>>,
    pub cover_image: Option<Option<CoverImage>>,
    pub tags: Option<Vec<String>>,
}

impl DocumentPatch {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Creates, edits and runs actions on the owner's documents.
pub struct DocumentService<L> {
    store: L,
    session: Session,
}

impl<L: LocalStore> DocumentService<L> {
    pub const fn new(store: L, session: Session) -> Self {
        Self { store, session }
    }

    pub const fn store(&self) -> &L {
        &self.store
    }

    /// Create an empty root document.
    pub async fn create_root(&self) -> Result<Document> {
        let owner = self.session.require_owner().await?;
        let document = Document::new_root(owner);
        self.store.put(&document).await?;
        tracing::debug!(document_id = %document.id, "Created root document");
        Ok(document)
    }

    /// Create an empty page under `parent_id`.
    ///
    /// The parent must exist, must not be deleted, and must belong to the
    /// signed-in owner.
    pub async fn create_page(&self, parent_id: &DocumentId) -> Result<Document> {
        let owner = self.session.require_owner().await?;
        let parent = self
            .store
            .get(parent_id)
            .await?
            .filter(|parent| !parent.is_deleted())
            .ok_or_else(|| Error::InvalidParent(parent_id.to_string()))?;
        if parent.owner_id != owner {
            return Err(Error::NotPermitted);
        }

        let document = Document::new_page(owner, parent.id);
        self.store.put(&document).await?;
        tracing::debug!(document_id = %document.id, parent_id = %parent.id, "Created page");
        Ok(document)
    }

    /// Apply `patch` to a document.
    ///
    /// Locked documents are preview-only and reject edits.
    pub async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<Document> {
        let mut document = self.get(id).await?;
        if patch.is_empty() {
            return Ok(document);
        }
        if document.locked {
            return Err(Error::NotPermitted);
        }

        if let Some(slug) = patch.slug {
            let slug = slugify(&slug);
            if slug.is_empty() {
                return Err(Error::InvalidInput(
                    "slug must contain letters or digits".to_string(),
                ));
            }
            document.slug = slug;
        }
        if let Some(title) = patch.title {
            document.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            document.description = description;
        }
        if let Some(content) = patch.content {
            document.set_content(content);
        }
        if let Some(category_id) = patch.category_id {
            document.category_id = category_id;
        }
        if let Some(icon) = patch.icon {
            document.icon = icon;
        }
        if let Some(cover_image) = patch.cover_image {
            document.cover_image = cover_image;
        }
        if let Some(tags) = patch.tags {
            document.tags = tags;
        }

        document.touch(now_millis());
        self.store.put(&document).await?;
        Ok(document)
    }

    /// Run one of the document's available actions.
    pub async fn execute(&self, id: &DocumentId, action: DocumentAction) -> Result<Document> {
        let mut document = self.get(id).await?;
        // Cascades resume when the root already carries the flag
        let cascading = matches!(action, DocumentAction::Archive | DocumentAction::Restore);
        if !cascading && !available_actions(&document).contains(&action) {
            return Err(Error::InvalidInput(format!(
                "action '{action}' is not available for document {id}"
            )));
        }

        let now = now_millis();
        match action {
            DocumentAction::Archive => {
                CascadeEngine::new(&self.store).archive(id, now).await?;
            }
            DocumentAction::Restore => {
                CascadeEngine::new(&self.store).restore(id, now).await?;
            }
            DocumentAction::Pin | DocumentAction::Unpin => {
                document.pinned = action == DocumentAction::Pin;
                self.save(&mut document, now).await?;
            }
            DocumentAction::Publish => {
                document.published = true;
                document.published_at = now;
                self.save(&mut document, now).await?;
            }
            DocumentAction::Unpublish => {
                document.published = false;
                document.published_at = 0;
                self.save(&mut document, now).await?;
            }
            DocumentAction::Lock | DocumentAction::Unlock => {
                document.locked = action == DocumentAction::Lock;
                self.save(&mut document, now).await?;
            }
        }

        tracing::debug!(document_id = %id, %action, "Executed document action");
        self.get(id).await
    }

    /// Soft-delete a document and its pages; the next sync purges them.
    ///
    /// A root that is already deleted is accepted so an interrupted cascade can
    /// be finished by calling this again.
    pub async fn soft_delete(&self, id: &DocumentId) -> Result<CascadeReport> {
        self.owned_including_deleted(id).await?;
        CascadeEngine::new(&self.store)
            .soft_delete(id, now_millis())
            .await
    }

    async fn save(&self, document: &mut Document, now: i64) -> Result<()> {
        document.touch(now);
        self.store.put(document).await
    }

    /// A non-deleted document of the signed-in owner
    pub async fn get(&self, id: &DocumentId) -> Result<Document> {
        let document = self.owned_including_deleted(id).await?;
        if document.is_deleted() {
            return Err(Error::NotFound(format!("document {id}")));
        }
        Ok(document)
    }

    async fn owned_including_deleted(&self, id: &DocumentId) -> Result<Document> {
        let owner = self.session.require_owner().await?;
        let document = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?;
        if document.owner_id != owner {
            return Err(Error::NotPermitted);
        }
        Ok(document)
    }
}
