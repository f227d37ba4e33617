//! Property tests: annotating never changes the text a reader sees.
//!
//! Trees, selections and term lists are generated from a small word pool so
//! that matches, partial-word hits and multi-leaf selections all come up.

use std::cell::RefCell;

use glossa_core::commit::commit;
use glossa_core::context::find_context;
use glossa_core::mount::{AnnotationTarget, PopoverFactory, mount_placeholders};
use glossa_core::rewrite::{Fragment, rewrite_fragment};
use glossa_core::tree::{ContentTree, Element, Node, fragment_text};
use glossa_core::types::{MARK_CLOSE, MARK_OPEN, MatchMode};
use proptest::prelude::*;
use proptest::sample::Index;

// =============================================================================
// STRATEGIES
// =============================================================================

const PIECES: &[&str] = &[
    "pod", "Pod", "kubelet", "node", "nodes", "run", "running", "chào", "nút", " ", " ", "  ",
    ".", ", ", "; ", "!", "\n",
];

const TERMS: &[&str] = &["pod", "kubelet", "node", "run", "chào", "o", "ku", "ode", " "];

fn leaf_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(PIECES), 1..8).prop_map(|pieces| pieces.concat())
}

fn inline() -> impl Strategy<Value = Node> {
    prop_oneof![
        3 => leaf_text().prop_map(|text| Node::text(text)),
        1 => prop::collection::vec(leaf_text().prop_map(|text| Node::text(text)), 1..3)
            .prop_map(|children| Node::element("em", children)),
    ]
}

fn paragraph() -> impl Strategy<Value = Node> {
    prop::collection::vec(inline(), 1..4).prop_map(|children| Node::element("p", children))
}

fn tree_strategy() -> impl Strategy<Value = ContentTree> {
    prop::collection::vec(paragraph(), 1..4)
        .prop_map(|paragraphs| ContentTree::new(Element::new("article", paragraphs)))
}

fn terms_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(TERMS), 0..4)
}

fn mode_strategy() -> impl Strategy<Value = MatchMode> {
    prop_oneof![Just(MatchMode::WordBounded), Just(MatchMode::Substring)]
}

/// Ordered, non-empty char span of a text of `len` chars.
fn span(a: Index, b: Index, len: usize) -> (usize, usize) {
    let (a, b) = (a.index(len + 1), b.index(len + 1));
    (a.min(b), a.max(b))
}

fn translations(terms: &[&str]) -> Vec<AnnotationTarget> {
    terms
        .iter()
        .map(|text| AnnotationTarget::Translation {
            text: text.to_string(),
            context: None,
        })
        .collect()
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    /// Rewriting only splits leaves; the fragment's text is unchanged.
    #[test]
    fn rewrite_preserves_fragment_text(
        children in prop::collection::vec(inline(), 1..6),
        terms in terms_strategy(),
        mode in mode_strategy(),
    ) {
        let fragment: Fragment = children.into_iter().map(Node::detach).collect();
        let before = fragment_text(&fragment);
        let out = rewrite_fragment(fragment, &terms, mode);
        prop_assert_eq!(fragment_text(&out), before);
    }

    /// Clone, rewrite, mount and commit leave the document text as it was.
    #[test]
    fn annotate_and_commit_preserves_document_text(
        tree in tree_strategy(),
        a in any::<Index>(),
        b in any::<Index>(),
        terms in terms_strategy(),
        mode in mode_strategy(),
    ) {
        let before = tree.text_content();
        let (start, end) = span(a, b, before.chars().count());
        prop_assume!(start < end);

        let snapshot = tree.select(start, end);
        prop_assert!(snapshot.is_some(), "no snapshot for {}..{}", start, end);
        let snapshot = snapshot.unwrap();

        let cloned = tree.clone_range(&snapshot.range);
        prop_assert!(cloned.is_ok(), "clone failed: {:?}", cloned);
        let fragment: Fragment = cloned.unwrap().into_iter().map(Node::detach).collect();
        prop_assert_eq!(fragment_text(&fragment), snapshot.text.clone());

        let rewritten = rewrite_fragment(fragment, &terms, mode);
        let (nodes, _) = mount_placeholders(rewritten, &translations(&terms), &PopoverFactory);

        let doc = RefCell::new(tree);
        prop_assert!(commit(&doc, &snapshot, nodes).is_ok());
        prop_assert_eq!(doc.borrow().text_content(), before);
    }

    /// The marked context is the raw context with one marker pair added.
    #[test]
    fn marked_context_strips_back_to_raw(
        text in leaf_text(),
        a in any::<Index>(),
        b in any::<Index>(),
    ) {
        let chars: Vec<char> = text.chars().collect();
        let (start, end) = span(a, b, chars.len());
        prop_assume!(start < end);
        let needle: String = chars[start..end].iter().collect();

        if let Some(context) = find_context(&text, &needle, start..end) {
            let wrapped = format!("{MARK_OPEN}{needle}{MARK_CLOSE}");
            prop_assert!(context.marked.contains(&wrapped));
            let stripped = context
                .marked
                .replacen(MARK_OPEN, "", 1)
                .replacen(MARK_CLOSE, "", 1);
            prop_assert_eq!(stripped, context.raw);
        }
    }
}
