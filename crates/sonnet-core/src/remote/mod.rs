//! Remote store of record over the Supabase REST (PostgREST) API.
//!
//! Rows keep the column names of the hosted `blogs` table (`blog_id`,
//! `author_id`, `parent_blog`, `is_preview`, ...) and store flags as JSON
//! booleans. [`RemoteDocumentRow`] is the only place that knows that layout.

use std::fmt;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::models::{flag, Block, CoverImage, Document, DocumentId};
use crate::store::RemoteStore;
use crate::util::compact_text;

const UPSERT_PREFER: &str = "resolution=merge-duplicates,return=minimal";

/// `RemoteStore` backed by a PostgREST table
#[derive(Clone)]
pub struct RestRemoteStore {
    endpoint: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

impl fmt::Debug for RestRemoteStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RestRemoteStore")
            .field("endpoint", &self.endpoint)
            .field("anon_key", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RestRemoteStore {
    /// Build a store for the signed-in user behind `access_token`
    pub fn new(config: RemoteConfig, access_token: impl Into<String>) -> Result<Self> {
        let config = config.validate()?;
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(Error::NotAuthenticated);
        }

        Ok(Self {
            endpoint: format!("{}/rest/v1/{}", config.url, config.table),
            anon_key: config.anon_key,
            access_token,
            client: Client::builder().build()?,
        })
    }

    fn list_url(&self, owner_id: &str) -> String {
        format!(
            "{}?select=*&author_id=eq.{}",
            self.endpoint,
            urlencoding::encode(owner_id)
        )
    }

    fn upsert_url(&self) -> String {
        format!("{}?on_conflict=blog_id", self.endpoint)
    }

    fn delete_url(&self, ids: &[DocumentId]) -> String {
        let list = ids
            .iter()
            .map(DocumentId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}?blog_id=in.({})",
            self.endpoint,
            urlencoding::encode(&list)
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
            .header(header::ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Remote store rejected the access token");
            return Err(Error::NotAuthenticated);
        }
        Err(Error::Remote(parse_api_error(status, &body)))
    }
}

impl RemoteStore for RestRemoteStore {
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Document>> {
        let response = self.send(self.client.get(self.list_url(owner_id))).await?;
        let rows = response.json::<Vec<RemoteDocumentRow>>().await?;
        rows.into_iter().map(Document::try_from).collect()
    }

    async fn upsert(&self, document: &Document) -> Result<()> {
        let rows = [RemoteDocumentRow::from(document)];
        self.send(
            self.client
                .post(self.upsert_url())
                .header("Prefer", UPSERT_PREFER)
                .json(&rows),
        )
        .await?;
        Ok(())
    }

    async fn delete_many(&self, ids: &[DocumentId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.send(self.client.delete(self.delete_url(ids))).await?;
        Ok(())
    }
}

/// Cover image as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RemoteCoverImage {
    uploaded_image_id: String,
    image_url: String,
}

/// One row of the remote `blogs` table
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocumentRow {
    blog_id: DocumentId,
    author_id: String,
    /// Empty string for roots; older rows may hold null
    #[serde(default)]
    parent_blog: Option<String>,
    title: String,
    slug: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    content: Vec<Block>,
    #[serde(default)]
    category_id: String,
    #[serde(default)]
    cover_image: Option<RemoteCoverImage>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    read_time: u32,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    comments: u64,
    #[serde(default)]
    shares: u64,
    #[serde(default, deserialize_with = "flag::deserialize")]
    is_pinned: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    is_featured: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    is_published: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    is_archived: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    is_preview: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    is_on_explore: bool,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
    #[serde(default)]
    published_at: i64,
    #[serde(default)]
    archived_at: i64,
    #[serde(default)]
    deleted_at: i64,
    #[serde(default)]
    synced_at: i64,
}

impl From<&Document> for RemoteDocumentRow {
    fn from(document: &Document) -> Self {
        Self {
            blog_id: document.id,
            author_id: document.owner_id.clone(),
            parent_blog: Some(
                document
                    .parent_id
                    .map(|parent| parent.as_str())
                    .unwrap_or_default(),
            ),
            title: document.title.clone(),
            slug: document.slug.clone(),
            description: document.description.clone(),
            content: document.content.clone(),
            category_id: document.category_id.clone(),
            cover_image: document.cover_image.as_ref().map(|image| RemoteCoverImage {
                uploaded_image_id: image.image_id.clone(),
                image_url: image.url.clone(),
            }),
            icon: document.icon.clone(),
            tags: document.tags.clone(),
            read_time: document.read_time,
            likes: document.likes,
            views: document.views,
            comments: document.comments,
            shares: document.shares,
            is_pinned: document.pinned,
            is_featured: document.featured,
            is_published: document.published,
            is_archived: document.archived,
            is_preview: document.locked,
            is_on_explore: document.visible_on_explore,
            created_at: document.created_at,
            updated_at: document.updated_at,
            published_at: document.published_at,
            archived_at: document.archived_at,
            deleted_at: document.deleted_at,
            synced_at: document.synced_at,
        }
    }
}

impl TryFrom<RemoteDocumentRow> for Document {
    type Error = Error;

    fn try_from(row: RemoteDocumentRow) -> Result<Self> {
        let parent_id = match row.parent_blog.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse().map_err(|_| {
                Error::Remote(format!("row {} has invalid parent_blog {raw}", row.blog_id))
            })?),
        };

        Ok(Self {
            id: row.blog_id,
            owner_id: row.author_id,
            parent_id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            content: row.content,
            category_id: row.category_id,
            cover_image: row.cover_image.map(|image| CoverImage {
                image_id: image.uploaded_image_id,
                url: image.image_url,
            }),
            icon: row.icon,
            tags: row.tags,
            read_time: row.read_time,
            likes: row.likes,
            views: row.views,
            comments: row.comments,
            shares: row.shares,
            pinned: row.is_pinned,
            featured: row.is_featured,
            published: row.is_published,
            archived: row.is_archived,
            locked: row.is_preview,
            visible_on_explore: row.is_on_explore,
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
            archived_at: row.archived_at,
            deleted_at: row.deleted_at,
            synced_at: row.synced_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.msg).or(payload.error) {
            return match payload.details.filter(|details| !details.trim().is_empty()) {
                Some(details) => format!(
                    "{}: {} ({})",
                    message.trim(),
                    compact_text(&details),
                    status.as_u16()
                ),
                None => format!("{} ({})", message.trim(), status.as_u16()),
            };
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}
