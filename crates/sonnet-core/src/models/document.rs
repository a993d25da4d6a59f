//! Document (blog/page) model

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::block::Block;

/// Reading speed used for `read_time`
const WORDS_PER_MINUTE: usize = 200;

/// A unique identifier for a document, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new unique document ID using UUID v7
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

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Cover image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverImage {
    #[serde(alias = "uploaded_image_id")]
    pub image_id: String,
    #[serde(alias = "image_url")]
    pub url: String,
}

/// A node in an owner's document forest
///
/// Flags are plain `bool`s here; the local store writes them as 0/1 and the
/// remote store as JSON booleans, and [`flag::deserialize`] accepts either.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub owner_id: String,
    /// `None` for root documents
    #[serde(default, deserialize_with = "parent_id::deserialize")]
    pub parent_id: Option<DocumentId>,

    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: Vec<Block>,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub cover_image: Option<CoverImage>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Estimated reading time in minutes
    #[serde(default)]
    pub read_time: u32,

    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,

    #[serde(default, deserialize_with = "flag::deserialize")]
    pub pinned: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub featured: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub published: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub archived: bool,
    /// Preview-only, not editable
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub locked: bool,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub visible_on_explore: bool,

    /// Timestamps are Unix ms, 0 when unset
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub published_at: i64,
    #[serde(default)]
    pub archived_at: i64,
    #[serde(default)]
    pub deleted_at: i64,
    #[serde(default)]
    pub synced_at: i64,
}

impl Document {
    /// Create a new root document for `owner_id`
    #[must_use]
    pub fn new_root(owner_id: impl Into<String>) -> Self {
        Self::with_parent(owner_id, None)
    }

    /// Create a new page under `parent_id`
    ///
    /// Does not check that the parent exists; see
    /// [`DocumentService::create_page`](crate::services::DocumentService::create_page).
    #[must_use]
    pub fn new_page(owner_id: impl Into<String>, parent_id: DocumentId) -> Self {
        Self::with_parent(owner_id, Some(parent_id))
    }

    fn with_parent(owner_id: impl Into<String>, parent_id: Option<DocumentId>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let id = DocumentId::new();
        let title = if parent_id.is_some() {
            "New Page"
        } else {
            "New Blog"
        };
        Self {
            id,
            owner_id: owner_id.into(),
            parent_id,
            title: title.to_string(),
            slug: id.as_str(),
            description: String::new(),
            content: Vec::new(),
            category_id: String::new(),
            cover_image: None,
            icon: None,
            tags: Vec::new(),
            read_time: 0,
            likes: 0,
            views: 0,
            comments: 0,
            shares: 0,
            pinned: false,
            featured: false,
            published: true,
            archived: false,
            locked: false,
            visible_on_explore: true,
            created_at: now,
            updated_at: now,
            published_at: now,
            archived_at: 0,
            deleted_at: 0,
            synced_at: 0,
        }
    }

    /// Whether the document has been soft-deleted
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at > 0
    }

    /// Whether the document has no parent
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Advance `updated_at` to `now`, never moving it backwards
    pub fn touch(&mut self, now: i64) {
        self.updated_at = self.updated_at.max(now);
    }

    /// Replace the content and recompute `read_time`
    pub fn set_content(&mut self, content: Vec<Block>) {
        self.read_time = read_time_minutes(&content);
        self.content = content;
    }

    /// Copy the remote-authoritative engagement counters from `other`
    pub fn copy_counters_from(&mut self, other: &Self) {
        self.likes = other.likes;
        self.views = other.views;
        self.comments = other.comments;
        self.shares = other.shares;
    }
}

/// Estimate reading time for a block sequence, rounded up to whole minutes
#[must_use]
pub fn read_time_minutes(blocks: &[Block]) -> u32 {
    let words: usize = blocks.iter().map(Block::word_count).sum();
    let minutes = words.div_ceil(WORDS_PER_MINUTE);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}

/// Turn arbitrary text into a display path segment
///
/// # Examples
///
/// ```
/// use sonnet_core::models::slugify;
///
/// assert_eq!(slugify("  Hello, World!  "), "hello-world");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let re = Regex::new(r"[^a-z0-9]+").expect("Invalid regex");
    re.replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Tolerant flag decoding for 0/1 integers, booleans and their string forms
pub mod flag {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Normalize any stored flag representation to a `bool`
    #[must_use]
    pub fn normalize(value: &Value) -> Option<bool> {
        match value {
            Value::Null => Some(false),
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => number
                .as_i64()
                .map(|n| n != 0)
                .or_else(|| number.as_f64().map(|n| n != 0.0)),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Some(true),
                "" | "0" | "false" => Some(false),
                _ => None,
            },
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        normalize(&value).ok_or_else(|| D::Error::custom(format!("invalid flag value: {value}")))
    }
}

mod parent_id {
    use super::{Deserialize, Deserializer, DocumentId};
    use serde::de::Error as _;

    /// Empty string and null both mean "root"
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DocumentId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_id_parse() {
        let id = DocumentId::new();
        let parsed: DocumentId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_new_root_defaults() {
        let doc = Document::new_root("owner-1");
        assert_eq!(doc.title, "New Blog");
        assert_eq!(doc.slug, doc.id.as_str());
        assert!(doc.published);
        assert!(doc.visible_on_explore);
        assert!(!doc.archived);
        assert!(doc.is_root());
        assert_eq!(doc.created_at, doc.updated_at);
        assert_eq!(doc.deleted_at, 0);
    }

    #[test]
    fn test_new_page_has_parent() {
        let root = Document::new_root("owner-1");
        let page = Document::new_page("owner-1", root.id);
        assert_eq!(page.title, "New Page");
        assert_eq!(page.parent_id, Some(root.id));
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let mut doc = Document::new_root("owner-1");
        doc.updated_at = 500;
        doc.touch(100);
        assert_eq!(doc.updated_at, 500);
        doc.touch(900);
        assert_eq!(doc.updated_at, 900);
    }

    #[test]
    fn test_flags_accept_integers_and_booleans() {
        let doc = Document::new_root("owner-1");
        let mut value = serde_json::to_value(&doc).unwrap();
        value["pinned"] = json!(1);
        value["archived"] = json!(true);
        value["locked"] = json!("0");
        value["featured"] = json!(null);

        let parsed: Document = serde_json::from_value(value).unwrap();
        assert!(parsed.pinned);
        assert!(parsed.archived);
        assert!(!parsed.locked);
        assert!(!parsed.featured);
    }

    #[test]
    fn test_flag_rejects_garbage() {
        assert_eq!(flag::normalize(&json!("maybe")), None);
        assert_eq!(flag::normalize(&json!([1])), None);
    }

    #[test]
    fn test_empty_parent_is_root() {
        let doc = Document::new_root("owner-1");
        let mut value = serde_json::to_value(&doc).unwrap();
        value["parent_id"] = json!("");
        let parsed: Document = serde_json::from_value(value).unwrap();
        assert!(parsed.parent_id.is_none());
    }

    #[test]
    fn test_read_time_rounds_up() {
        let words = vec!["word"; 201].join(" ");
        assert_eq!(read_time_minutes(&[Block::paragraph("a", words)]), 2);
        assert_eq!(read_time_minutes(&[Block::paragraph("a", "one")]), 1);
        assert_eq!(read_time_minutes(&[]), 0);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My First Post"), "my-first-post");
        assert_eq!(slugify("--Rust & Tokio--"), "rust-tokio");
        assert_eq!(slugify("!!!"), "");
    }
}
