//! Context extraction around a selection.
//!
//! The context is the first sentence of the selection's parent text that
//! contains the selected text, or failing that the line covering the
//! selection. A context that is nothing but the selection itself is dropped.

use std::ops::Range;

use crate::text_helpers::{char_len, find_from, line_spans, sentence_spans, slice_chars, trim_span};
use crate::tree::ContentTree;
use crate::types::{Context, ExtractedContext, MARK_CLOSE, MARK_OPEN, SelectionSnapshot};

/// Derive the selected text and its surrounding context from the live tree.
///
/// Never fails: a selection spanning several leaves, a detached leaf or a
/// context-free selection all yield `context: None`.
pub fn extract_context(tree: &ContentTree, snapshot: &SelectionSnapshot) -> ExtractedContext {
    let selected = snapshot.text.clone();
    let range = &snapshot.range;

    if !range.is_single_leaf() {
        tracing::debug!(
            start = ?range.start.path,
            end = ?range.end.path,
            "context unavailable: selection spans several leaves"
        );
        return ExtractedContext::without_context(selected);
    }

    let Some((parent_text, leaf_offset)) = tree.parent_text(&range.start.path) else {
        tracing::debug!(path = ?range.start.path, "context unavailable: no parent for leaf");
        return ExtractedContext::without_context(selected);
    };

    let span = leaf_offset + range.start.offset..leaf_offset + range.end.offset;
    let context = find_context(&parent_text, selected.trim(), span);
    if context.is_none() {
        tracing::debug!(selected = %selected.escape_debug(), "context unavailable");
    }

    ExtractedContext {
        selected_text: selected,
        context,
    }
}

/// Find the context of `needle`, selected at `selection` (char offsets) in `text`.
pub fn find_context(text: &str, needle: &str, selection: Range<usize>) -> Option<Context> {
    if needle.is_empty() {
        return None;
    }

    let span = sentence_containing(text, needle).or_else(|| line_covering(text, needle, &selection))?;
    let raw = slice_chars(text, span.clone());
    if raw == needle {
        return None;
    }

    let occurrence = find_from(text, needle, span.start)?;
    let occurrence_end = occurrence + char_len(needle);
    if occurrence_end > span.end {
        return None;
    }

    let marked = format!(
        "{}{MARK_OPEN}{needle}{MARK_CLOSE}{}",
        slice_chars(text, span.start..occurrence),
        slice_chars(text, occurrence_end..span.end),
    );

    Some(Context {
        raw: raw.to_string(),
        marked,
    })
}

/// First terminated sentence containing `needle`, trimmed.
fn sentence_containing(text: &str, needle: &str) -> Option<Range<usize>> {
    sentence_spans(text)
        .into_iter()
        .find(|span| slice_chars(text, span.clone()).contains(needle))
        .map(|span| trim_span(text, span))
        .filter(|span| !span.is_empty())
}

/// Line whose span covers the selection and contains `needle`, trimmed.
fn line_covering(text: &str, needle: &str, selection: &Range<usize>) -> Option<Range<usize>> {
    line_spans(text)
        .into_iter()
        .find(|line| {
            line.start <= selection.start
                && line.end >= selection.end
                && slice_chars(text, line.clone()).contains(needle)
        })
        .map(|span| trim_span(text, span))
        .filter(|span| !span.is_empty())
}
