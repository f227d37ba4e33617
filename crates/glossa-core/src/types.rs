//! Core engine types: selection boundaries, snapshots, context and resolved terms.
//!
//! These types are host-agnostic: a browser binding, a TUI or a test can build
//! them without touching any ambient selection API.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Child-index path from the tree root to a node.
pub type NodePath = Vec<usize>;

/// Identity of a text-bearing leaf.
///
/// Leaves are immutable; splitting a leaf mints fresh ids for every piece, so
/// an id never refers to two different texts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub u64);

static NEXT_LEAF_ID: AtomicU64 = AtomicU64::new(1);

impl LeafId {
    /// Allocate a process-unique leaf id.
    pub fn next() -> Self {
        Self(NEXT_LEAF_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for LeafId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "leaf-{}", self.0)
    }
}

/// Which side of a leaf edge an offset prefers.
///
/// A char offset that sits exactly between two leaves belongs to both. `Before`
/// sticks to the end of the earlier leaf (used for range ends), `After` to the
/// start of the later one (used for range starts).
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    #[default]
    Before,
    After,
}

/// A position inside a text-bearing leaf.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Boundary {
    /// Path to the text-bearing node (text leaf or mounted annotation).
    pub path: NodePath,
    /// Character offset in the leaf's text (NOT byte offset!)
    pub offset: usize,
}

impl Boundary {
    pub fn new(path: NodePath, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// A live range between two leaf boundaries, in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl SelectionRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Check if both ends sit in the same leaf.
    pub fn is_single_leaf(&self) -> bool {
        self.start.path == self.end.path
    }

    /// Check if the range is empty.
    pub fn is_collapsed(&self) -> bool {
        self.is_single_leaf() && self.start.offset == self.end.offset
    }

    /// Path of the deepest element containing both ends.
    ///
    /// Always a proper prefix of both boundary paths, so it names an element
    /// even when both ends are in the same leaf.
    pub fn common_ancestor(&self) -> NodePath {
        let shared = self
            .start
            .path
            .iter()
            .zip(self.end.path.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let depth = shared
            .min(self.start.path.len().saturating_sub(1))
            .min(self.end.path.len().saturating_sub(1));
        self.start.path[..depth].to_vec()
    }
}

/// Frozen copy of the host's selection at trigger time.
///
/// Replaces any ambient "current selection" lookup: everything the engine
/// needs is captured here, so the algorithms run against synthetic trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSnapshot {
    /// Selected text as the host reports it (may carry edge whitespace).
    pub text: String,
    /// The first range of the selection.
    pub range: SelectionRange,
    /// Number of ranges the host reported.
    pub range_count: usize,
}

impl SelectionSnapshot {
    pub fn new(text: impl Into<String>, range: SelectionRange) -> Self {
        Self {
            text: text.into(),
            range,
            range_count: 1,
        }
    }

    /// Check if there is nothing usable selected.
    pub fn is_empty(&self) -> bool {
        self.range_count == 0 || self.range.is_collapsed() || self.text.trim().is_empty()
    }
}

/// Sentence or line around a selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    /// The context text, trimmed.
    pub raw: String,
    /// `raw` with the selected occurrence wrapped in the marker pair.
    pub marked: String,
}

/// Output of the context extractor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedContext {
    pub selected_text: String,
    pub context: Option<Context>,
}

impl ExtractedContext {
    pub fn without_context(selected_text: impl Into<String>) -> Self {
        Self {
            selected_text: selected_text.into(),
            context: None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_ref().map(|c| c.raw.as_str())
    }

    pub fn context_marked(&self) -> Option<&str> {
        self.context.as_ref().map(|c| c.marked.as_str())
    }
}

/// One term returned by the term-resolution service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTerm {
    #[serde(alias = "word")]
    pub term: SmolStr,
    pub meaning_en: String,
    pub meaning_vi: String,
    pub translated_vi: String,
}

impl ResolvedTerm {
    pub fn new(
        term: impl Into<SmolStr>,
        meaning_en: impl Into<String>,
        meaning_vi: impl Into<String>,
        translated_vi: impl Into<String>,
    ) -> Self {
        Self {
            term: term.into(),
            meaning_en: meaning_en.into(),
            meaning_vi: meaning_vi.into(),
            translated_vi: translated_vi.into(),
        }
    }
}

/// How a target is located inside leaf text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Only whole-word occurrences.
    #[default]
    WordBounded,
    /// Any occurrence, including inside longer words.
    Substring,
}

/// Delimiters wrapped around the selected span in a marked context.
pub const MARK_OPEN: &str = "[[";
pub const MARK_CLOSE: &str = "]]";
