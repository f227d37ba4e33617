//! Fragment rewriting: split text leaves of a detached fragment on every
//! occurrence of each target, leaving a placeholder per match.
//!
//! The rewrite consumes and returns owned node lists; nothing here touches the
//! live tree.

use crate::matcher::{Piece, TermMatcher};
use crate::tree::{Node, Slot};
use crate::types::{Context, LeafId, MARK_CLOSE, MARK_OPEN, MatchMode};

/// Stand-in for one matched span, waiting for a widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// Index of the target that produced this match.
    pub target: usize,
    /// Matched text in its original casing.
    pub matched: String,
    /// Identity the mounted widget is anchored at.
    pub anchor: LeafId,
    /// The split leaf's text around this occurrence.
    pub local_context: Context,
}

impl Slot for Placeholder {
    fn display_text(&self) -> &str {
        &self.matched
    }
}

/// A detached fragment that may carry placeholders.
pub type Fragment = Vec<Node<Placeholder>>;

/// Apply every target, in order, to the fragment's text leaves.
///
/// Leaves already converted into placeholders, and previously mounted
/// annotations, are never matched again, so the first target to claim a span
/// keeps it. Blank targets are skipped.
pub fn rewrite_fragment<S: AsRef<str>>(
    mut fragment: Fragment,
    targets: &[S],
    mode: MatchMode,
) -> Fragment {
    for (index, target) in targets.iter().enumerate() {
        let target = target.as_ref();
        let Some(matcher) = TermMatcher::new(target, mode) else {
            tracing::debug!(index, "skipping blank target");
            continue;
        };
        let mut hits = 0;
        fragment = split_nodes(fragment, &matcher, index, &mut hits);
        tracing::trace!(index, target, hits, ?mode, "applied target");
    }
    fragment
}

/// Placeholders of a fragment, in document order.
pub fn placeholders(fragment: &[Node<Placeholder>]) -> Vec<&Placeholder> {
    fn walk<'a>(nodes: &'a [Node<Placeholder>], out: &mut Vec<&'a Placeholder>) {
        for node in nodes {
            match node {
                Node::Element(el) => walk(&el.children, out),
                Node::Placeholder(p) => out.push(p),
                _ => {}
            }
        }
    }

    let mut out = Vec::new();
    walk(fragment, &mut out);
    out
}

fn split_nodes(
    nodes: Fragment,
    matcher: &TermMatcher,
    target: usize,
    hits: &mut usize,
) -> Fragment {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(mut el) => {
                el.children = split_nodes(std::mem::take(&mut el.children), matcher, target, hits);
                out.push(Node::Element(el));
            }
            Node::Text(leaf) if matcher.is_match(&leaf.text) => {
                // The original leaf is discarded; every piece gets a fresh id.
                out.extend(split_leaf(&leaf.text, matcher, target, hits));
            }
            other => out.push(other),
        }
    }
    out
}

fn split_leaf(
    text: &str,
    matcher: &TermMatcher,
    target: usize,
    hits: &mut usize,
) -> Fragment {
    let pieces = matcher.split(text);
    let plain_at = |idx: Option<usize>| match idx.and_then(|i| pieces.get(i)) {
        Some(Piece::Plain(s)) => *s,
        _ => "",
    };

    pieces
        .iter()
        .enumerate()
        .map(|(idx, piece)| match piece {
            Piece::Plain(s) => Node::text(*s),
            Piece::Match(matched) => {
                *hits += 1;
                let before = plain_at(idx.checked_sub(1)).trim_start();
                let after = plain_at(Some(idx + 1)).trim_end();
                Node::Placeholder(Placeholder {
                    target,
                    matched: matched.to_string(),
                    anchor: LeafId::next(),
                    local_context: Context {
                        raw: format!("{before}{matched}{after}"),
                        marked: format!("{before}{MARK_OPEN}{matched}{MARK_CLOSE}{after}"),
                    },
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    use crate::tree::{Element, TextLeaf, fragment_text};

    fn leaf(text: &str) -> Fragment {
        vec![Node::text(text)]
    }

    /// Flatten to (is_placeholder, text) pairs for easy comparison.
    fn shape(fragment: &[Node<Placeholder>]) -> Vec<(bool, String)> {
        fragment
            .iter()
            .map(|node| match node {
                Node::Placeholder(p) => (true, p.matched.clone()),
                other => (false, other.text_content()),
            })
            .collect()
    }

    #[test]
    fn test_empty_targets_leave_fragment_unchanged() {
        let fragment = vec![
            Node::text("Deploy the "),
            Node::element("b", vec![Node::text("pod")]),
        ];
        let out = rewrite_fragment(fragment.clone(), &[] as &[&str], MatchMode::WordBounded);
        assert_eq!(out, fragment);
    }

    #[test]
    fn test_multi_occurrence_split() {
        let out = rewrite_fragment(leaf("run run fast"), &["run"], MatchMode::Substring);
        assert_eq!(
            shape(&out),
            vec![
                (true, "run".to_string()),
                (false, " ".to_string()),
                (true, "run".to_string()),
                (false, " fast".to_string()),
            ]
        );
        assert!(placeholders(&out).iter().all(|p| p.target == 0));
    }

    #[test]
    fn test_overlap_word_bounded() {
        let out = rewrite_fragment(
            leaf("running fast"),
            &["run", "running"],
            MatchMode::WordBounded,
        );
        let found = placeholders(&out);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched, "running");
        assert_eq!(found[0].target, 1);
    }

    #[test]
    fn test_overlap_substring_first_target_wins() {
        let out = rewrite_fragment(
            leaf("running fast"),
            &["run", "running"],
            MatchMode::Substring,
        );
        let found = placeholders(&out);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched, "run");
        assert_eq!(found[0].target, 0);
        assert_eq!(
            shape(&out),
            vec![(true, "run".to_string()), (false, "ning fast".to_string())]
        );
    }

    #[test]
    fn test_round_trip_text_preserved() {
        let fragment: Fragment = vec![
            Node::text("The Pod restarted; "),
            Node::element(
                "em",
                vec![Node::text("each pod"), Node::text(" has a kubelet.")],
            ),
            Node::text(" POD!"),
        ];
        let before = fragment_text(&fragment);
        let out = rewrite_fragment(fragment, &["pod", "kubelet", "missing"], MatchMode::WordBounded);
        assert_eq!(fragment_text(&out), before);
        assert_eq!(placeholders(&out).len(), 4);
    }

    #[test]
    fn test_markup_is_kept_around_matches() {
        let fragment: Fragment = vec![Node::Element(
            Element::new("b", vec![Node::text("a pod here")]).with_attr("class", "x"),
        )];
        let out = rewrite_fragment(fragment, &["pod"], MatchMode::WordBounded);
        let Node::Element(el) = &out[0] else {
            panic!("expected element, got {:?}", out[0]);
        };
        assert_eq!(el.tag, "b");
        assert_eq!(el.attrs, vec![(SmolStr::new("class"), "x".to_string())]);
        assert_eq!(
            shape(&el.children),
            vec![
                (false, "a ".to_string()),
                (true, "pod".to_string()),
                (false, " here".to_string()),
            ]
        );
    }

    #[test]
    fn test_absent_and_blank_targets_are_noops() {
        let fragment = leaf("nothing to see");
        let out = rewrite_fragment(fragment.clone(), &["", "  ", "zebra"], MatchMode::Substring);
        assert_eq!(out, fragment);
    }

    #[test]
    fn test_local_context() {
        let out = rewrite_fragment(
            leaf("  restart the kubelet now  "),
            &["kubelet"],
            MatchMode::WordBounded,
        );
        let p = placeholders(&out)[0];
        assert_eq!(p.local_context.raw, "restart the kubelet now");
        assert_eq!(p.local_context.marked, "restart the [[kubelet]] now");
    }

    #[test]
    fn test_split_pieces_get_fresh_ids() {
        let original = TextLeaf::new("a pod b");
        let id = original.id;
        let out = rewrite_fragment(vec![Node::Text(original)], &["pod"], MatchMode::WordBounded);
        assert_eq!(out.len(), 3);
        for node in &out {
            if let Node::Text(leaf) = node {
                assert_ne!(leaf.id, id);
            }
        }
    }
}
