//! Conflict resolution between two versions of one document

use serde_json::{Map, Value};

use super::merge::merge_blocks;
use crate::models::{Difference, Document, FieldDifference};

/// Fields that never count as a difference between the stores
///
/// `synced_at` is per-store bookkeeping and the engagement counters are owned
/// by the remote.
const IGNORED_FIELDS: [&str; 5] = ["synced_at", "likes", "views", "comments", "shares"];

/// How a pair of versions was reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Local `updated_at` is strictly newer; the local version wins
    LocalNewer,
    /// Remote `updated_at` is strictly newer; the remote version wins
    RemoteNewer,
    /// Same `updated_at` with different fields; content was merged
    Merged,
    /// Same `updated_at` and no differences
    Identical,
}

impl Outcome {
    /// Human description recorded in the sync log
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::LocalNewer => "local version kept",
            Self::RemoteNewer => "remote version kept",
            Self::Merged => "merged concurrent edits",
            Self::Identical => "already in sync",
        }
    }
}

/// Result of [`resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    /// The version both stores should hold afterwards
    pub document: Document,
}

/// Pick the winner between `local` and `remote`, or merge them on a tie
///
/// Strictly newer `updated_at` wins outright. On an exact tie with differing
/// fields, the result keeps the local scalar fields, the remote engagement
/// counters and the block-level merge of both contents, stamped with
/// `max(now, updated_at + 1)` so the next run does not see a tie again.
#[must_use]
pub fn resolve(local: &Document, remote: &Document, now: i64) -> Resolution {
    if local.updated_at > remote.updated_at {
        let mut document = local.clone();
        document.copy_counters_from(remote);
        return Resolution {
            outcome: Outcome::LocalNewer,
            document,
        };
    }

    if remote.updated_at > local.updated_at {
        return Resolution {
            outcome: Outcome::RemoteNewer,
            document: remote.clone(),
        };
    }

    if difference(local, remote).is_empty() {
        let mut document = local.clone();
        document.copy_counters_from(remote);
        return Resolution {
            outcome: Outcome::Identical,
            document,
        };
    }

    let mut document = local.clone();
    document.copy_counters_from(remote);
    document.set_content(merge_blocks(&local.content, &remote.content));
    document.updated_at = now.max(local.updated_at + 1);

    Resolution {
        outcome: Outcome::Merged,
        document,
    }
}

/// Per-field differences between two versions, ordered by field name
///
/// Flags are compared after normalization at the model boundary, so a `1`
/// from one store and `true` from the other are equal.
#[must_use]
pub fn difference(local: &Document, remote: &Document) -> Difference {
    let local_fields = to_fields(local);
    let mut remote_fields = to_fields(remote);

    let mut difference = Difference::new();
    for (field, local_value) in local_fields {
        if IGNORED_FIELDS.contains(&field.as_str()) {
            continue;
        }
        let remote_value = remote_fields.remove(&field).unwrap_or(Value::Null);
        if local_value != remote_value {
            difference.insert(
                field,
                FieldDifference {
                    local: local_value,
                    remote: remote_value,
                },
            );
        }
    }
    difference
}

fn to_fields(document: &Document) -> Map<String, Value> {
    match serde_json::to_value(document) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Block, RunMark};
    use pretty_assertions::assert_eq;

    fn pair() -> (Document, Document) {
        let mut local = Document::new_root("owner-1");
        local.updated_at = 1_000;
        local.set_content(vec![
            Block::paragraph("p1", "intro"),
            Block::paragraph("p2", "the cat sat"),
        ]);
        let remote = local.clone();
        (local, remote)
    }

    #[test]
    fn strictly_newer_remote_wins() {
        let (mut local, mut remote) = pair();
        local.updated_at = 100;
        remote.updated_at = 200;
        remote.title = "Remote title".to_string();

        let resolution = resolve(&local, &remote, 5_000);
        assert_eq!(resolution.outcome, Outcome::RemoteNewer);
        assert_eq!(resolution.document, remote);
    }

    #[test]
    fn strictly_newer_local_wins_but_keeps_remote_counters() {
        let (mut local, mut remote) = pair();
        local.updated_at = 300;
        remote.updated_at = 100;
        local.title = "Local title".to_string();
        local.likes = 1;
        remote.likes = 42;

        let resolution = resolve(&local, &remote, 5_000);
        assert_eq!(resolution.outcome, Outcome::LocalNewer);
        assert_eq!(resolution.document.title, "Local title");
        assert_eq!(resolution.document.likes, 42);
        assert_eq!(resolution.document.updated_at, 300);
    }

    #[test]
    fn tie_without_differences_is_identical() {
        let (local, mut remote) = pair();
        remote.synced_at = 77;
        remote.views = 9;

        let resolution = resolve(&local, &remote, 5_000);
        assert_eq!(resolution.outcome, Outcome::Identical);
    }

    #[test]
    fn tie_with_differences_merges_content() {
        let (mut local, mut remote) = pair();
        local.set_content(vec![
            Block::paragraph("p1", "intro"),
            Block::paragraph("p2", "the cut sat"),
            Block::paragraph("l", "local paragraph"),
        ]);
        remote.set_content(vec![
            Block::paragraph("p1", "intro"),
            Block::paragraph("r", "remote paragraph"),
            Block::paragraph("p2", "the cat sat"),
        ]);
        remote.shares = 3;

        let resolution = resolve(&local, &remote, 500);
        assert_eq!(resolution.outcome, Outcome::Merged);

        let merged = resolution.document;
        assert_eq!(merged.updated_at, 1_001);
        assert_eq!(merged.shares, 3);
        let ids: Vec<&str> = merged.content.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "r", "p2", "l"]);
        assert!(merged.content[0].runs.is_empty());
        assert!(merged.content[2]
            .runs
            .iter()
            .any(|run| run.mark == RunMark::Removed && run.text == "cat"));
    }

    #[test]
    fn merged_timestamp_uses_wall_clock_when_later() {
        let (mut local, remote) = pair();
        local.title = "changed".to_string();
        let resolution = resolve(&local, &remote, 9_000);
        assert_eq!(resolution.document.updated_at, 9_000);
    }

    #[test]
    fn difference_ignores_counters_and_sync_stamp() {
        let (local, mut remote) = pair();
        remote.likes = 10;
        remote.synced_at = 123;
        assert!(difference(&local, &remote).is_empty());

        remote.title = "other".to_string();
        remote.pinned = true;
        let diff = difference(&local, &remote);
        assert_eq!(diff.keys().collect::<Vec<_>>(), vec!["pinned", "title"]);
        assert_eq!(diff["pinned"].local, Value::Bool(false));
        assert_eq!(diff["pinned"].remote, Value::Bool(true));
    }
}
