//! Structural merge of block content
//!
//! Blocks are aligned by their stable ids, then blocks that exist on both
//! sides with different text get a character-level diff rendered as tagged
//! runs. Nothing in here looks at the block `kind`, so the merge works for any
//! editor schema that can be flattened into `(id, text)` blocks.

use std::collections::{HashMap, HashSet};

use crate::models::{Block, RunMark, TextRun};

/// Largest LCS table we are willing to allocate
const MAX_TABLE_CELLS: usize = 4_000_000;

/// Equalities shorter than this are folded into surrounding edits
const MIN_EQUALITY_CHARS: usize = 4;

/// Merge two versions of a document's content
///
/// Blocks are aligned by longest common subsequence over their ids. Between
/// two aligned blocks, blocks only the remote has come first, then the local
/// blocks. A block that moved is emitted once, at its local position. Blocks
/// on both sides with different text carry provenance runs; the merged text is
/// always the local text.
///
/// Extra copies of a block id repeated on the remote side are kept as
/// remote-only blocks.
#[must_use]
pub fn merge_blocks(local: &[Block], remote: &[Block]) -> Vec<Block> {
    if local == remote {
        return local.to_vec();
    }

    let remote_keys: Vec<&str> = remote.iter().map(|block| block.id.as_str()).collect();
    let local_keys: Vec<&str> = local.iter().map(|block| block.id.as_str()).collect();
    let anchors: Vec<(usize, usize)> = edit_script(&remote_keys, &local_keys)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|edit| match edit {
            Edit::Equal(remote_idx, local_idx) => Some((local_idx, remote_idx)),
            Edit::Delete(_) | Edit::Insert(_) => None,
        })
        .collect();

    let mut claimed: HashSet<usize> = anchors.iter().map(|&(_, remote_idx)| remote_idx).collect();
    let mut unanchored: HashMap<&str, usize> = HashMap::new();
    for (remote_idx, key) in remote_keys.iter().enumerate() {
        if !claimed.contains(&remote_idx) {
            unanchored.entry(*key).or_insert(remote_idx);
        }
    }

    // local index -> remote index of the same block
    let mut paired: HashMap<usize, usize> = anchors.iter().copied().collect();
    for (local_idx, key) in local_keys.iter().enumerate() {
        if paired.contains_key(&local_idx) {
            continue;
        }
        if let Some(&remote_idx) = unanchored.get(key) {
            paired.insert(local_idx, remote_idx);
            claimed.insert(remote_idx);
        }
    }

    let unique_remote: HashSet<&str> = remote_keys.iter().copied().collect();
    if unique_remote.len() < remote.len() {
        tracing::warn!(
            duplicates = remote.len() - unique_remote.len(),
            "Remote content repeats block ids, keeping the extra copies as remote blocks"
        );
    }

    let mut merged = Vec::with_capacity(local.len() + remote.len());
    let (mut local_start, mut remote_start) = (0, 0);
    for (local_end, remote_end) in anchors
        .into_iter()
        .chain(std::iter::once((local.len(), remote.len())))
    {
        merged.extend(
            (remote_start..remote_end)
                .filter(|remote_idx| !claimed.contains(remote_idx))
                .map(|remote_idx| remote[remote_idx].clone()),
        );
        merged.extend((local_start..local_end).map(|local_idx| {
            paired.get(&local_idx).map_or_else(
                || local[local_idx].clone(),
                |&remote_idx| merge_block(&local[local_idx], &remote[remote_idx]),
            )
        }));
        if local_end < local.len() {
            merged.push(merge_block(&local[local_end], &remote[remote_end]));
        }
        local_start = local_end + 1;
        remote_start = remote_end + 1;
    }

    merged
}

/// Merge one block that exists on both sides
fn merge_block(local: &Block, remote: &Block) -> Block {
    if local == remote || local.text == remote.text {
        return local.clone();
    }

    Block {
        id: local.id.clone(),
        kind: local.kind.clone(),
        text: local.text.clone(),
        runs: diff_text(&remote.text, &local.text),
    }
}

/// Character-level diff from `remote` to `local`, as tagged runs
///
/// Concatenating the `unchanged` and `added` runs yields `local`; the
/// `unchanged` and `removed` runs yield `remote`.
///
/// # Examples
///
/// ```
/// use sonnet_core::models::RunMark;
/// use sonnet_core::sync::merge::diff_text;
///
/// let runs = diff_text("the cat sat", "the cut sat");
/// let marks: Vec<_> = runs.iter().map(|run| (run.text.as_str(), run.mark)).collect();
/// assert_eq!(
///     marks,
///     vec![
///         ("the ", RunMark::Unchanged),
///         ("cat", RunMark::Removed),
///         ("cut", RunMark::Added),
///         (" sat", RunMark::Unchanged),
///     ]
/// );
/// ```
#[must_use]
pub fn diff_text(remote: &str, local: &str) -> Vec<TextRun> {
    if remote == local {
        return if local.is_empty() {
            Vec::new()
        } else {
            vec![TextRun::new(local, RunMark::Unchanged)]
        };
    }

    let remote_chars: Vec<char> = remote.chars().collect();
    let local_chars: Vec<char> = local.chars().collect();

    let prefix = remote_chars
        .iter()
        .zip(&local_chars)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = remote_chars[prefix..]
        .iter()
        .rev()
        .zip(local_chars[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let remote_mid = &remote_chars[prefix..remote_chars.len() - suffix];
    let local_mid = &local_chars[prefix..local_chars.len() - suffix];

    let mut pieces = Vec::new();
    push_piece(&mut pieces, Piece::Equal(remote_chars[..prefix].iter().collect()));
    match edit_script(remote_mid, local_mid) {
        Some(edits) => {
            for edit in edits {
                let piece = match edit {
                    Edit::Equal(idx, _) => Piece::Equal(remote_mid[idx].to_string()),
                    Edit::Delete(idx) => Piece::change(remote_mid[idx].to_string(), String::new()),
                    Edit::Insert(idx) => Piece::change(String::new(), local_mid[idx].to_string()),
                };
                push_piece(&mut pieces, piece);
            }
        }
        None => push_piece(
            &mut pieces,
            Piece::change(remote_mid.iter().collect(), local_mid.iter().collect()),
        ),
    }
    push_piece(
        &mut pieces,
        Piece::Equal(remote_chars[remote_chars.len() - suffix..].iter().collect()),
    );

    let pieces = widen_to_word_boundaries(absorb_short_equalities(pieces));
    into_runs(pieces)
}

/// One step of an edit script between `a` (remote) and `b` (local)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    /// `a[i] == b[j]`
    Equal(usize, usize),
    /// `a[i]` only
    Delete(usize),
    /// `b[j]` only
    Insert(usize),
}

/// Minimal edit script by longest common subsequence
///
/// Returns `None` when the table would exceed [`MAX_TABLE_CELLS`]. Ties prefer
/// deletions, which keeps the output stable for identical inputs.
fn edit_script<T: PartialEq>(a: &[T], b: &[T]) -> Option<Vec<Edit>> {
    let (n, m) = (a.len(), b.len());
    let cells = (n + 1).checked_mul(m + 1)?;
    if cells > MAX_TABLE_CELLS {
        return None;
    }

    // table[i * (m + 1) + j] = LCS length of a[i..] and b[j..]
    let width = m + 1;
    let mut table = vec![0_u32; cells];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            edits.push(Edit::Equal(i, j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            edits.push(Edit::Delete(i));
            i += 1;
        } else {
            edits.push(Edit::Insert(j));
            j += 1;
        }
    }
    edits.extend((i..n).map(Edit::Delete));
    edits.extend((j..m).map(Edit::Insert));
    Some(edits)
}

/// A diff region before it becomes runs
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Equal(String),
    Change { removed: String, added: String },
}

impl Piece {
    const fn change(removed: String, added: String) -> Self {
        Self::Change { removed, added }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Equal(text) => text.is_empty(),
            Self::Change { removed, added } => removed.is_empty() && added.is_empty(),
        }
    }
}

/// Append a piece, coalescing it with a neighbour of the same kind
fn push_piece(pieces: &mut Vec<Piece>, piece: Piece) {
    if piece.is_empty() {
        return;
    }
    match (pieces.last_mut(), piece) {
        (Some(Piece::Equal(last)), Piece::Equal(text)) => last.push_str(&text),
        (
            Some(Piece::Change { removed, added }),
            Piece::Change {
                removed: more_removed,
                added: more_added,
            },
        ) => {
            removed.push_str(&more_removed);
            added.push_str(&more_added);
        }
        (_, piece) => pieces.push(piece),
    }
}

fn is_absorbable(text: &str) -> bool {
    text.chars().count() < MIN_EQUALITY_CHARS || text.chars().all(char::is_whitespace)
}

/// Fold short or blank equalities sitting between two edits into one edit
fn absorb_short_equalities(pieces: Vec<Piece>) -> Vec<Piece> {
    let mut out: Vec<Piece> = Vec::with_capacity(pieces.len());
    let mut iter = pieces.into_iter().peekable();

    while let Some(piece) = iter.next() {
        let between_edits = matches!(out.last(), Some(Piece::Change { .. }))
            && matches!(iter.peek(), Some(Piece::Change { .. }));
        match piece {
            Piece::Equal(text) if between_edits && is_absorbable(&text) => {
                push_piece(&mut out, Piece::change(text.clone(), text));
            }
            other => push_piece(&mut out, other),
        }
    }

    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn starts_with_word(text: &str) -> bool {
    text.chars().next().is_some_and(is_word_char)
}

fn ends_with_word(text: &str) -> bool {
    text.chars().next_back().is_some_and(is_word_char)
}

/// Split off the trailing run of word characters
fn split_trailing_word(text: &mut String) -> String {
    let cut = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map_or(text.len(), |(idx, _)| idx);
    text.split_off(cut)
}

/// Split off the leading run of word characters
fn split_leading_word(text: &mut String) -> String {
    let cut = text
        .char_indices()
        .find(|(_, c)| !is_word_char(*c))
        .map_or(text.len(), |(idx, _)| idx);
    let rest = text.split_off(cut);
    std::mem::replace(text, rest)
}

/// Grow each edit so it never starts or ends inside a word
fn widen_to_word_boundaries(mut pieces: Vec<Piece>) -> Vec<Piece> {
    for idx in 0..pieces.len() {
        let (starts_word, ends_word) = match &pieces[idx] {
            Piece::Change { removed, added } => (
                starts_with_word(removed) || starts_with_word(added),
                ends_with_word(removed) || ends_with_word(added),
            ),
            Piece::Equal(_) => continue,
        };

        let leading = match (starts_word, idx.checked_sub(1).map(|prev| &mut pieces[prev])) {
            (true, Some(Piece::Equal(prev))) => split_trailing_word(prev),
            _ => String::new(),
        };
        let trailing = match (ends_word, pieces.get_mut(idx + 1)) {
            (true, Some(Piece::Equal(next))) => split_leading_word(next),
            _ => String::new(),
        };

        if let Piece::Change { removed, added } = &mut pieces[idx] {
            removed.insert_str(0, &leading);
            added.insert_str(0, &leading);
            removed.push_str(&trailing);
            added.push_str(&trailing);
        }
    }

    pieces.into_iter().fold(Vec::new(), |mut out, piece| {
        push_piece(&mut out, piece);
        out
    })
}

fn into_runs(pieces: Vec<Piece>) -> Vec<TextRun> {
    let mut runs = Vec::with_capacity(pieces.len() * 2);
    for piece in pieces {
        match piece {
            Piece::Equal(text) => runs.push(TextRun::new(text, RunMark::Unchanged)),
            Piece::Change { removed, added } => {
                if !removed.is_empty() {
                    runs.push(TextRun::new(removed, RunMark::Removed));
                }
                if !added.is_empty() {
                    runs.push(TextRun::new(added, RunMark::Added));
                }
            }
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block(id: &str, text: &str) -> Block {
        Block::paragraph(id, text)
    }

    fn rebuild(runs: &[TextRun], keep: RunMark) -> String {
        runs.iter()
            .filter(|run| run.mark == RunMark::Unchanged || run.mark == keep)
            .map(|run| run.text.as_str())
            .collect()
    }

    fn marks(runs: &[TextRun]) -> Vec<(&str, RunMark)> {
        runs.iter().map(|run| (run.text.as_str(), run.mark)).collect()
    }

    #[test]
    fn merge_of_identical_content_is_identity() {
        let content = vec![block("a", "one"), block("b", "two"), block("c", "three")];
        assert_eq!(merge_blocks(&content, &content), content);
        assert_eq!(merge_blocks(&[], &[]), Vec::<Block>::new());
    }

    #[test]
    fn merge_is_a_union_of_blocks() {
        let local = vec![block("a", "one"), block("l1", "local only"), block("c", "three")];
        let remote = vec![block("a", "one"), block("r1", "remote only"), block("c", "three")];

        let merged = merge_blocks(&local, &remote);
        let ids: Vec<&str> = merged.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "r1", "l1", "c"]);
    }

    #[test]
    fn merge_keeps_every_block_from_both_sides() {
        let local = vec![block("x", "1"), block("a", "2"), block("y", "3")];
        let remote = vec![block("p", "4"), block("a", "2"), block("q", "5"), block("r", "6")];

        let merged = merge_blocks(&local, &remote);
        let mut ids: Vec<&str> = merged.iter().map(|b| b.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "p", "q", "r", "x", "y"]);
    }

    #[test]
    fn repeated_remote_block_ids_are_kept() {
        let local = vec![block("a", "one"), block("b", "first"), block("c", "three")];
        let remote = vec![
            block("a", "one"),
            block("b", "first"),
            block("b", "second copy"),
            block("c", "three"),
        ];

        let merged = merge_blocks(&local, &remote);
        assert_eq!(
            merged,
            vec![
                block("a", "one"),
                block("b", "first"),
                block("b", "second copy"),
                block("c", "three"),
            ]
        );

        let disjoint = merge_blocks(&[block("b", "first")], &[block("x", "4"), block("x", "5")]);
        assert_eq!(
            disjoint,
            vec![block("x", "4"), block("x", "5"), block("b", "first")]
        );
    }

    #[test]
    fn moved_block_is_emitted_once_at_local_position() {
        let local = vec![block("b", "two"), block("a", "one"), block("c", "three")];
        let remote = vec![block("a", "one"), block("b", "two"), block("c", "three")];

        let merged = merge_blocks(&local, &remote);
        let ids: Vec<&str> = merged.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn differing_block_gets_runs_and_local_text() {
        let local = vec![block("a", "same"), block("b", "the cut sat")];
        let remote = vec![block("a", "same"), block("b", "the cat sat")];

        let merged = merge_blocks(&local, &remote);
        assert_eq!(merged[0], block("a", "same"));
        assert_eq!(merged[1].text, "the cut sat");
        assert_eq!(rebuild(&merged[1].runs, RunMark::Added), "the cut sat");
        assert_eq!(rebuild(&merged[1].runs, RunMark::Removed), "the cat sat");
    }

    #[test]
    fn same_text_with_other_attributes_keeps_local() {
        let mut local = block("a", "text");
        local.kind = "heading".to_string();
        let remote = block("a", "text");

        let merged = merge_blocks(&[local.clone()], &[remote]);
        assert_eq!(merged, vec![local]);
    }

    #[test]
    fn merge_is_deterministic() {
        let local = vec![block("a", "hello brave world"), block("n", "new")];
        let remote = vec![block("o", "old"), block("a", "hello cruel world")];
        assert_eq!(merge_blocks(&local, &remote), merge_blocks(&local, &remote));
    }

    #[test]
    fn diff_of_equal_text_is_single_run() {
        assert_eq!(marks(&diff_text("abc", "abc")), vec![("abc", RunMark::Unchanged)]);
        assert!(diff_text("", "").is_empty());
    }

    #[test]
    fn diff_pure_insertion() {
        let runs = diff_text("hello world", "hello big world");
        assert_eq!(
            marks(&runs),
            vec![
                ("hello ", RunMark::Unchanged),
                ("big ", RunMark::Added),
                ("world", RunMark::Unchanged),
            ]
        );
    }

    #[test]
    fn diff_avoids_single_character_fragments() {
        let runs = diff_text("kitten sitting", "mitten knitting");
        assert!(runs
            .iter()
            .filter(|run| run.mark != RunMark::Unchanged)
            .all(|run| run.text.chars().count() > 1));
        assert_eq!(rebuild(&runs, RunMark::Added), "mitten knitting");
        assert_eq!(rebuild(&runs, RunMark::Removed), "kitten sitting");
    }

    #[test]
    fn diff_absorbs_short_equalities_between_edits() {
        // "x" survives between two edits and must not become its own run
        let runs = diff_text("aaxbb", "ccxdd");
        assert_eq!(
            marks(&runs),
            vec![("aaxbb", RunMark::Removed), ("ccxdd", RunMark::Added)]
        );
    }

    #[test]
    fn diff_from_empty_side() {
        assert_eq!(marks(&diff_text("", "new")), vec![("new", RunMark::Added)]);
        assert_eq!(marks(&diff_text("old", "")), vec![("old", RunMark::Removed)]);
    }

    #[test]
    fn diff_handles_multibyte_text() {
        let runs = diff_text("café au lait", "café noir");
        assert_eq!(rebuild(&runs, RunMark::Added), "café noir");
        assert_eq!(rebuild(&runs, RunMark::Removed), "café au lait");
        assert_eq!(runs[0], TextRun::new("café ", RunMark::Unchanged));
    }

    #[test]
    fn oversized_diff_falls_back_to_replace() {
        let remote = "a".repeat(2_100);
        let local = "b".repeat(2_100);
        let runs = diff_text(&remote, &local);
        assert_eq!(
            marks(&runs),
            vec![(remote.as_str(), RunMark::Removed), (local.as_str(), RunMark::Added)]
        );
    }

    #[test]
    fn edit_script_prefers_deletions_on_ties() {
        let edits = edit_script(&['a', 'b'], &['b', 'a']).unwrap();
        assert_eq!(edits, vec![Edit::Delete(0), Edit::Equal(1, 0), Edit::Insert(1)]);
    }
}
