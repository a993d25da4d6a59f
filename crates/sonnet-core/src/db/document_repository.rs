//! libSQL implementation of the local document store

use libsql::{params_from_iter, Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{CoverImage, Document, DocumentId};
use crate::store::LocalStore;

const COLUMNS: &str = "id, owner_id, parent_id, title, slug, description, content, category_id,
    cover_image, icon, tags, read_time, likes, views, comments, shares,
    is_pinned, is_featured, is_published, is_archived, is_locked, is_on_explore,
    created_at, updated_at, published_at, archived_at, deleted_at, synced_at";

/// SQLite caps bound parameters per statement; stay well below it
const DELETE_CHUNK: usize = 500;

/// libSQL-backed `LocalStore`
#[derive(Clone)]
pub struct LibSqlDocumentStore {
    conn: Connection,
}

impl LibSqlDocumentStore {
    /// Create a store over the given connection
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Documents shown in normal listings: not deleted, not archived, newest first
    pub async fn list_visible(&self, owner_id: &str) -> Result<Vec<Document>> {
        self.query_documents(
            &format!(
                "SELECT {COLUMNS} FROM documents
                 WHERE owner_id = ? AND deleted_at = 0 AND is_archived = 0
                 ORDER BY updated_at DESC"
            ),
            vec![Value::Text(owner_id.to_string())],
        )
        .await
    }

    /// Archived but not deleted documents, most recently archived first
    pub async fn list_trash(&self, owner_id: &str) -> Result<Vec<Document>> {
        self.query_documents(
            &format!(
                "SELECT {COLUMNS} FROM documents
                 WHERE owner_id = ? AND deleted_at = 0 AND is_archived = 1
                 ORDER BY archived_at DESC"
            ),
            vec![Value::Text(owner_id.to_string())],
        )
        .await
    }

    /// Visible document by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Document>> {
        let documents = self
            .query_documents(
                &format!("SELECT {COLUMNS} FROM documents WHERE slug = ? AND deleted_at = 0 LIMIT 1"),
                vec![Value::Text(slug.to_string())],
            )
            .await?;
        Ok(documents.into_iter().next())
    }

    async fn query_documents(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Document>> {
        let mut rows = self.conn.query(sql, params_from_iter(params)).await?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(Self::parse_document(&row)?);
        }
        Ok(documents)
    }

    /// Parse a document from a database row selected with `COLUMNS`
    fn parse_document(row: &Row) -> Result<Document> {
        let id: String = row.get(0)?;
        let parent: String = row.get(2)?;
        let content: String = row.get(6)?;
        let tags: String = row.get(10)?;
        let cover_image = optional_text(row, 8)?
            .map(|raw| serde_json::from_str::<CoverImage>(&raw))
            .transpose()?;

        Ok(Document {
            id: parse_id(&id)?,
            owner_id: row.get(1)?,
            parent_id: if parent.is_empty() {
                None
            } else {
                Some(parse_id(&parent)?)
            },
            title: row.get(3)?,
            slug: row.get(4)?,
            description: row.get(5)?,
            content: serde_json::from_str(&content)?,
            category_id: row.get(7)?,
            cover_image,
            icon: optional_text(row, 9)?,
            tags: serde_json::from_str(&tags)?,
            read_time: u32::try_from(row.get::<i64>(11)?).unwrap_or(0),
            likes: counter(row, 12)?,
            views: counter(row, 13)?,
            comments: counter(row, 14)?,
            shares: counter(row, 15)?,
            pinned: row.get::<i64>(16)? != 0,
            featured: row.get::<i64>(17)? != 0,
            published: row.get::<i64>(18)? != 0,
            archived: row.get::<i64>(19)? != 0,
            locked: row.get::<i64>(20)? != 0,
            visible_on_explore: row.get::<i64>(21)? != 0,
            created_at: row.get(22)?,
            updated_at: row.get(23)?,
            published_at: row.get(24)?,
            archived_at: row.get(25)?,
            deleted_at: row.get(26)?,
            synced_at: row.get(27)?,
        })
    }

    /// Bind values in `COLUMNS` order
    fn to_values(document: &Document) -> Result<Vec<Value>> {
        let cover_image = match &document.cover_image {
            Some(image) => Value::Text(serde_json::to_string(image)?),
            None => Value::Null,
        };
        let icon = document
            .icon
            .as_ref()
            .map_or(Value::Null, |icon| Value::Text(icon.clone()));

        Ok(vec![
            Value::Text(document.id.as_str()),
            Value::Text(document.owner_id.clone()),
            Value::Text(
                document
                    .parent_id
                    .map(|parent| parent.as_str())
                    .unwrap_or_default(),
            ),
            Value::Text(document.title.clone()),
            Value::Text(document.slug.clone()),
            Value::Text(document.description.clone()),
            Value::Text(serde_json::to_string(&document.content)?),
            Value::Text(document.category_id.clone()),
            cover_image,
            icon,
            Value::Text(serde_json::to_string(&document.tags)?),
            Value::Integer(i64::from(document.read_time)),
            Value::Integer(to_i64(document.likes)),
            Value::Integer(to_i64(document.views)),
            Value::Integer(to_i64(document.comments)),
            Value::Integer(to_i64(document.shares)),
            Value::Integer(i64::from(document.pinned)),
            Value::Integer(i64::from(document.featured)),
            Value::Integer(i64::from(document.published)),
            Value::Integer(i64::from(document.archived)),
            Value::Integer(i64::from(document.locked)),
            Value::Integer(i64::from(document.visible_on_explore)),
            Value::Integer(document.created_at),
            Value::Integer(document.updated_at),
            Value::Integer(document.published_at),
            Value::Integer(document.archived_at),
            Value::Integer(document.deleted_at),
            Value::Integer(document.synced_at),
        ])
    }
}

impl LocalStore for LibSqlDocumentStore {
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Document>> {
        self.query_documents(
            &format!("SELECT {COLUMNS} FROM documents WHERE owner_id = ? ORDER BY created_at ASC"),
            vec![Value::Text(owner_id.to_string())],
        )
        .await
    }

    async fn get(&self, id: &DocumentId) -> Result<Option<Document>> {
        let documents = self
            .query_documents(
                &format!("SELECT {COLUMNS} FROM documents WHERE id = ?"),
                vec![Value::Text(id.as_str())],
            )
            .await?;
        Ok(documents.into_iter().next())
    }

    async fn put(&self, document: &Document) -> Result<()> {
        let placeholders = vec!["?"; 28].join(", ");
        self.conn
            .execute(
                &format!("INSERT OR REPLACE INTO documents ({COLUMNS}) VALUES ({placeholders})"),
                params_from_iter(Self::to_values(document)?),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &DocumentId) -> Result<()> {
        self.conn
            .execute("DELETE FROM documents WHERE id = ?", [id.as_str()])
            .await?;
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[DocumentId]) -> Result<()> {
        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            self.conn
                .execute(
                    &format!("DELETE FROM documents WHERE id IN ({placeholders})"),
                    params_from_iter(chunk.iter().map(DocumentId::as_str)),
                )
                .await?;
        }
        Ok(())
    }

    async fn children(&self, parent_id: &DocumentId) -> Result<Vec<Document>> {
        self.query_documents(
            &format!("SELECT {COLUMNS} FROM documents WHERE parent_id = ? ORDER BY created_at ASC"),
            vec![Value::Text(parent_id.as_str())],
        )
        .await
    }
}

fn parse_id(raw: &str) -> Result<DocumentId> {
    raw.parse()
        .map_err(|_| Error::Database(format!("invalid document id in row: {raw}")))
}

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Text(text) => Ok(Some(text)),
        Value::Null => Ok(None),
        other => Err(Error::Database(format!(
            "expected text in column {idx}, found {other:?}"
        ))),
    }
}

fn counter(row: &Row, idx: i32) -> Result<u64> {
    Ok(u64::try_from(row.get::<i64>(idx)?).unwrap_or(0))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Block;
    use pretty_assertions::assert_eq;

    async fn setup() -> (Database, LibSqlDocumentStore) {
        let db = Database::open_in_memory().await.unwrap();
        let store = LibSqlDocumentStore::new(db.connection().clone());
        (db, store)
    }

    fn sample(owner: &str) -> Document {
        let mut doc = Document::new_root(owner);
        doc.title = "Hello".to_string();
        doc.set_content(vec![
            Block::paragraph("b1", "first paragraph"),
            Block::paragraph("b2", "second paragraph"),
        ]);
        doc.cover_image = Some(CoverImage {
            image_id: "img-1".to_string(),
            url: "https://cdn.example.com/img-1.png".to_string(),
        });
        doc.icon = Some("*".to_string());
        doc.tags = vec!["rust".to_string()];
        doc.pinned = true;
        doc.likes = 7;
        doc
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_and_get_roundtrip() {
        let (_db, store) = setup().await;
        let doc = sample("owner-1");

        store.put(&doc).await.unwrap();
        let fetched = store.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(fetched, doc);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_replaces_existing() {
        let (_db, store) = setup().await;
        let mut doc = sample("owner-1");
        store.put(&doc).await.unwrap();

        doc.title = "Renamed".to_string();
        doc.parent_id = None;
        store.put(&doc).await.unwrap();

        let all = store.list_all("owner-1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Renamed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_children_include_deleted() {
        let (_db, store) = setup().await;
        let root = sample("owner-1");
        let child = Document::new_page("owner-1", root.id);
        let mut deleted_child = Document::new_page("owner-1", root.id);
        deleted_child.deleted_at = 99;

        store.put(&root).await.unwrap();
        store.put(&child).await.unwrap();
        store.put(&deleted_child).await.unwrap();

        let children = store.children(&root.id).await.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|doc| doc.parent_id == Some(root.id)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_listing_hides_deleted_and_archived() {
        let (_db, store) = setup().await;
        let visible = sample("owner-1");
        let mut archived = sample("owner-1");
        archived.id = DocumentId::new();
        archived.archived = true;
        archived.archived_at = 10;
        let mut deleted = sample("owner-1");
        deleted.id = DocumentId::new();
        deleted.deleted_at = 10;

        for doc in [&visible, &archived, &deleted] {
            store.put(doc).await.unwrap();
        }

        let listed = store.list_visible("owner-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, visible.id);

        let trash = store.list_trash("owner-1").await.unwrap();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].id, archived.id);

        assert_eq!(store.list_all("owner-1").await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bulk_delete() {
        let (_db, store) = setup().await;
        let docs = (0..3)
            .map(|_| Document::new_root("owner-1"))
            .collect::<Vec<_>>();
        for doc in &docs {
            store.put(doc).await.unwrap();
        }

        store
            .bulk_delete(&[docs[0].id, docs[2].id])
            .await
            .unwrap();

        let remaining = store.list_all("owner-1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, docs[1].id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_by_slug_skips_deleted() {
        let (_db, store) = setup().await;
        let mut doc = sample("owner-1");
        doc.slug = "hello".to_string();
        store.put(&doc).await.unwrap();
        assert!(store.get_by_slug("hello").await.unwrap().is_some());

        doc.deleted_at = 5;
        store.put(&doc).await.unwrap();
        assert!(store.get_by_slug("hello").await.unwrap().is_none());
    }
}
