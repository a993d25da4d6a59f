//! Content block model

use serde::{Deserialize, Serialize};

/// How a run of merged text relates to the two versions it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMark {
    /// Present in both versions
    Unchanged,
    /// Present only in the local version
    Added,
    /// Present only in the remote version, kept for provenance
    Removed,
}

/// A tagged span of text inside a merged block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub mark: RunMark,
}

impl TextRun {
    #[must_use]
    pub fn new(text: impl Into<String>, mark: RunMark) -> Self {
        Self {
            text: text.into(),
            mark,
        }
    }
}

/// A structural unit of document content (paragraph, heading, ...)
///
/// `id` is the stable identity used to align blocks across versions; the
/// merge never looks inside `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Stable per-block identity
    pub id: String,
    /// Opaque block type from the editor schema
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// Plain text of the block
    #[serde(default)]
    pub text: String,
    /// Provenance runs, only present on blocks produced by a merge
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<TextRun>,
}

fn default_kind() -> String {
    "paragraph".to_string()
}

impl Block {
    /// Create a paragraph block
    #[must_use]
    pub fn paragraph(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: default_kind(),
            text: text.into(),
            runs: Vec::new(),
        }
    }

    /// Number of whitespace-separated words in the block text
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
