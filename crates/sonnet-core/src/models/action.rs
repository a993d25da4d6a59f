//! Commands that can be applied to a document

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::document::Document;

/// A user-facing document command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentAction {
    Pin,
    Unpin,
    Archive,
    Restore,
    Publish,
    Unpublish,
    Lock,
    Unlock,
}

impl DocumentAction {
    pub const ALL: [Self; 8] = [
        Self::Pin,
        Self::Unpin,
        Self::Archive,
        Self::Restore,
        Self::Publish,
        Self::Unpublish,
        Self::Lock,
        Self::Unlock,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pin => "pin",
            Self::Unpin => "unpin",
            Self::Archive => "archive",
            Self::Restore => "restore",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Pin => "Add this blog to your pins",
            Self::Unpin => "Remove this blog from your pins",
            Self::Archive => "Move this blog and its pages to the trash",
            Self::Restore => "Move this blog and its pages out of the trash",
            Self::Publish => "Make this blog public",
            Self::Unpublish => "Hide this blog from readers",
            Self::Lock => "Make this blog preview-only",
            Self::Unlock => "Allow editing this blog again",
        }
    }

    /// Whether the action would change `document`
    const fn is_available_for(self, document: &Document) -> bool {
        match self {
            Self::Pin => !document.pinned,
            Self::Unpin => document.pinned,
            Self::Archive => !document.archived,
            Self::Restore => document.archived,
            Self::Publish => !document.published,
            Self::Unpublish => document.published,
            Self::Lock => !document.locked,
            Self::Unlock => document.locked,
        }
    }
}

impl fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocumentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.name() == needle)
            .ok_or_else(|| format!("unknown action: {s}"))
    }
}

/// Actions that make sense for `document` right now
///
/// Soft-deleted documents have none.
#[must_use]
pub fn available_actions(document: &Document) -> Vec<DocumentAction> {
    if document.is_deleted() {
        return Vec::new();
    }
    DocumentAction::ALL
        .into_iter()
        .filter(|action| action.is_available_for(document))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_document_actions() {
        let doc = Document::new_root("owner-1");
        assert_eq!(
            available_actions(&doc),
            vec![
                DocumentAction::Pin,
                DocumentAction::Archive,
                DocumentAction::Unpublish,
                DocumentAction::Lock,
            ]
        );
    }

    #[test]
    fn archived_pinned_document_actions() {
        let mut doc = Document::new_root("owner-1");
        doc.pinned = true;
        doc.archived = true;
        let actions = available_actions(&doc);
        assert!(actions.contains(&DocumentAction::Unpin));
        assert!(actions.contains(&DocumentAction::Restore));
        assert!(!actions.contains(&DocumentAction::Archive));
        assert!(!actions.contains(&DocumentAction::Pin));
    }

    #[test]
    fn deleted_document_has_no_actions() {
        let mut doc = Document::new_root("owner-1");
        doc.deleted_at = 42;
        assert!(available_actions(&doc).is_empty());
    }

    #[test]
    fn parse_action_names() {
        assert_eq!("Archive".parse::<DocumentAction>(), Ok(DocumentAction::Archive));
        assert!("explode".parse::<DocumentAction>().is_err());
    }
}
