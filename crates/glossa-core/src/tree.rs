//! Owned content tree: the live document the engine annotates.
//!
//! The tree is an element root with element, text-leaf and annotation
//! children. Detached fragments reuse the same node type with a slot
//! parameter `P` for placeholders; the live tree uses `Infallible`, so a
//! placeholder that was never mounted cannot be committed.
//!
//! All offsets are char offsets. Ranges address text-bearing nodes (text
//! leaves and mounted annotations) by child-index path.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Write as _;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::RangeError;
use crate::mount::AnnotationMount;
use crate::text_helpers::{char_len, slice_chars};
use crate::types::{Affinity, Boundary, LeafId, NodePath, SelectionRange, SelectionSnapshot};

/// Something that can stand in a fragment's slot position and render as text.
pub trait Slot {
    /// Text this slot stands for in the document's text content.
    fn display_text(&self) -> &str;
}

impl Slot for Infallible {
    fn display_text(&self) -> &str {
        match *self {}
    }
}

/// An indivisible span of plain text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextLeaf {
    pub id: LeafId,
    pub text: String,
}

impl TextLeaf {
    /// Create a leaf with a fresh id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: LeafId::next(),
            text: text.into(),
        }
    }
}

/// Structural node with ordered children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element<P = Infallible> {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<Node<P>>,
}

impl<P> Element<P> {
    pub fn new(tag: impl Into<SmolStr>, children: Vec<Node<P>>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children,
        }
    }

    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Same element with no children; used when rebuilding clipped copies.
    fn shell<Q>(&self) -> Element<Q> {
        Element {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: Vec::new(),
        }
    }
}

/// A node of the content tree or of a detached fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node<P = Infallible> {
    Element(Element<P>),
    Text(TextLeaf),
    Annotation(AnnotationMount),
    Placeholder(P),
}

impl<P> Node<P> {
    /// Text leaf with a fresh id.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextLeaf::new(text))
    }

    pub fn element(tag: impl Into<SmolStr>, children: Vec<Node<P>>) -> Self {
        Node::Element(Element::new(tag, children))
    }

    /// Check if this node carries text directly (rather than through children).
    pub fn is_text_bearing(&self) -> bool {
        !matches!(self, Node::Element(_))
    }

    /// Replace every slot in this subtree, keeping everything else in place.
    pub fn map_slots<Q>(self, f: &mut impl FnMut(P) -> Node<Q>) -> Node<Q> {
        match self {
            Node::Element(el) => Node::Element(Element {
                tag: el.tag,
                attrs: el.attrs,
                children: el.children.into_iter().map(|c| c.map_slots(f)).collect(),
            }),
            Node::Text(leaf) => Node::Text(leaf),
            Node::Annotation(mount) => Node::Annotation(mount),
            Node::Placeholder(slot) => f(slot),
        }
    }
}

impl<P: Slot> Node<P> {
    /// Text of a text-bearing node; `None` for elements.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Node::Element(_) => None,
            Node::Text(leaf) => Some(&leaf.text),
            Node::Annotation(mount) => Some(&mount.matched),
            Node::Placeholder(slot) => Some(slot.display_text()),
        }
    }

    /// Append this subtree's text content to `out`.
    pub fn push_text(&self, out: &mut String) {
        match self {
            Node::Element(el) => {
                for child in &el.children {
                    child.push_text(out);
                }
            }
            other => out.push_str(other.display_text().unwrap_or_default()),
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }
}

impl Node {
    /// Re-type a live node for use in a detached fragment.
    pub fn detach<Q>(self) -> Node<Q> {
        self.map_slots(&mut |never| match never {})
    }
}

/// Concatenated text of a node list, in document order.
pub fn fragment_text<P: Slot>(nodes: &[Node<P>]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.push_text(&mut out);
    }
    out
}

/// Serialized node shape accepted by [`ContentTree::from_spec`].
///
/// A bare JSON string is a text leaf; an object is an element.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text(String),
    Element {
        tag: SmolStr,
        #[serde(default)]
        attrs: BTreeMap<SmolStr, String>,
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
}

impl NodeSpec {
    fn build(self) -> Node {
        match self {
            NodeSpec::Text(text) => Node::text(text),
            NodeSpec::Element {
                tag,
                attrs,
                children,
            } => Node::Element(Element {
                tag,
                attrs: attrs.into_iter().collect(),
                children: children.into_iter().map(NodeSpec::build).collect(),
            }),
        }
    }
}

/// Bound of a clip operation: path below the clipped node and char offset.
type Bound<'a> = Option<(&'a [usize], usize)>;

/// The live document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentTree {
    root: Element,
}

impl ContentTree {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Build a tree from plain text: blank-line separated paragraphs become `<p>`.
    ///
    /// Single newlines stay inside the paragraph's text leaf.
    pub fn from_plain_text(text: &str) -> Self {
        let paragraphs = text
            .split("\n\n")
            .map(|p| p.trim_matches('\n'))
            .filter(|p| !p.trim().is_empty())
            .map(|p| Node::element("p", vec![Node::text(p)]))
            .collect();
        Self::new(Element::new("article", paragraphs))
    }

    /// Build a tree from its serialized shape. A text root is wrapped in a `div`.
    pub fn from_spec(spec: NodeSpec) -> Self {
        match spec.build() {
            Node::Element(root) => Self::new(root),
            other => Self::new(Element::new("div", vec![other])),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_spec(serde_json::from_str(json)?))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.root.children {
            child.push_text(&mut out);
        }
        out
    }

    /// Node at `path`. The root itself has no `Node` and is reached via [`Self::element`].
    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (last, parent) = path.split_last()?;
        self.element(parent)?.children.get(*last)
    }

    /// Element at `path`; the empty path is the root.
    pub fn element(&self, path: &[usize]) -> Option<&Element> {
        let mut current = &self.root;
        for idx in path {
            match current.children.get(*idx)? {
                Node::Element(el) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    fn element_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = &mut self.root;
        for idx in path {
            match current.children.get_mut(*idx)? {
                Node::Element(el) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Every text-bearing node with its path, in document order.
    pub fn leaves(&self) -> Vec<(NodePath, &str)> {
        fn walk<'a>(el: &'a Element, path: &mut NodePath, out: &mut Vec<(NodePath, &'a str)>) {
            for (idx, child) in el.children.iter().enumerate() {
                path.push(idx);
                match child {
                    Node::Element(inner) => walk(inner, path, out),
                    other => {
                        if let Some(text) = other.display_text() {
                            out.push((path.clone(), text));
                        }
                    }
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Map a document char offset to a leaf boundary.
    pub fn locate(&self, offset: usize, affinity: Affinity) -> Option<Boundary> {
        let mut pos = 0;
        let mut last = None;
        for (path, text) in self.leaves() {
            let len = char_len(text);
            if len == 0 {
                continue;
            }
            let end = pos + len;
            let hit = match affinity {
                Affinity::Before => offset >= pos && offset <= end,
                Affinity::After => offset >= pos && offset < end,
            };
            if hit {
                return Some(Boundary::new(path, offset - pos));
            }
            pos = end;
            last = Some((path, len));
        }
        // The very end of the document belongs to the last leaf either way.
        match last {
            Some((path, len)) if offset == pos => Some(Boundary::new(path, len)),
            _ => None,
        }
    }

    /// Document char offset of a boundary.
    pub fn offset_of(&self, boundary: &Boundary) -> Result<usize, RangeError> {
        let mut pos = 0;
        for (path, text) in self.leaves() {
            if path == boundary.path {
                let len = char_len(text);
                if boundary.offset > len {
                    return Err(RangeError::OffsetOutOfBounds {
                        offset: boundary.offset,
                        len,
                    });
                }
                return Ok(pos + boundary.offset);
            }
            pos += char_len(text);
        }
        Err(RangeError::InvalidPath {
            path: boundary.path.clone(),
        })
    }

    /// Check a range still addresses this tree, returning its document offsets.
    pub fn validate(&self, range: &SelectionRange) -> Result<(usize, usize), RangeError> {
        let start = self.offset_of(&range.start)?;
        let end = self.offset_of(&range.end)?;
        let ordered = (&range.start.path, range.start.offset) <= (&range.end.path, range.end.offset);
        if !ordered {
            return Err(RangeError::Reversed);
        }
        Ok((start, end))
    }

    /// Current text between the two ends of a range.
    pub fn range_text(&self, range: &SelectionRange) -> Result<String, RangeError> {
        let (start, end) = self.validate(range)?;
        Ok(slice_chars(&self.text_content(), start..end).to_string())
    }

    /// Snapshot of the document span `start..end`.
    pub fn select(&self, start: usize, end: usize) -> Option<SelectionSnapshot> {
        if start > end {
            return None;
        }
        let range = SelectionRange::new(
            self.locate(start, Affinity::After)?,
            self.locate(end, Affinity::Before)?,
        );
        let text = slice_chars(&self.text_content(), start..end).to_string();
        Some(SelectionSnapshot::new(text, range))
    }

    /// Snapshot of the `nth` (zero-based) occurrence of `needle` in the document.
    pub fn select_text(&self, needle: &str, nth: usize) -> Option<SelectionSnapshot> {
        if needle.is_empty() {
            return None;
        }
        let content = self.text_content();
        let (byte, _) = content.match_indices(needle).nth(nth)?;
        let start = char_len(&content[..byte]);
        self.select(start, start + char_len(needle))
    }

    /// Text content of the leaf's parent element, and the leaf's char offset within it.
    pub fn parent_text(&self, leaf_path: &[usize]) -> Option<(String, usize)> {
        let (leaf_idx, parent_path) = leaf_path.split_last()?;
        let parent = self.element(parent_path)?;
        let mut text = String::new();
        let mut leaf_offset = None;
        for (idx, child) in parent.children.iter().enumerate() {
            if idx == *leaf_idx {
                leaf_offset = Some(char_len(&text));
            }
            child.push_text(&mut text);
        }
        leaf_offset.map(|offset| (text, offset))
    }

    /// Detached copy of the range's content.
    ///
    /// Partially covered ancestors below the common ancestor are cloned with
    /// only their covered children, like a DOM range's `cloneContents`.
    pub fn clone_range(&self, range: &SelectionRange) -> Result<Vec<Node>, RangeError> {
        self.validate(range)?;
        let ancestor = range.common_ancestor();
        let depth = ancestor.len();
        let el = self.element(&ancestor).ok_or_else(|| RangeError::InvalidPath {
            path: ancestor.clone(),
        })?;
        Ok(clip_children(
            el,
            Some((&range.start.path[depth..], range.start.offset)),
            Some((&range.end.path[depth..], range.end.offset)),
        ))
    }

    /// Replace the range's content with `nodes`.
    ///
    /// The replacement lands in the common-ancestor element: the content of
    /// the first covered child before the start, `nodes`, then the content of
    /// the last covered child after the end. Nothing changes on error.
    pub fn replace_range(
        &mut self,
        range: &SelectionRange,
        nodes: Vec<Node>,
    ) -> Result<(), RangeError> {
        self.validate(range)?;
        let ancestor = range.common_ancestor();
        let depth = ancestor.len();
        let el = self
            .element_mut(&ancestor)
            .ok_or_else(|| RangeError::InvalidPath {
                path: ancestor.clone(),
            })?;

        let (first, start_rest) = (range.start.path[depth], &range.start.path[depth + 1..]);
        let (last, end_rest) = (range.end.path[depth], &range.end.path[depth + 1..]);

        let before = clip(&el.children[first], None, Some((start_rest, range.start.offset)));
        let after = clip(&el.children[last], Some((end_rest, range.end.offset)), None);

        let replacement: Vec<Node> = before.into_iter().chain(nodes).chain(after).collect();
        el.children.splice(first..=last, replacement);
        Ok(())
    }

    /// Every mounted annotation, in document order.
    pub fn annotations(&self) -> Vec<&AnnotationMount> {
        fn walk<'a>(el: &'a Element, out: &mut Vec<&'a AnnotationMount>) {
            for child in &el.children {
                match child {
                    Node::Element(inner) => walk(inner, out),
                    Node::Annotation(mount) => out.push(mount),
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }

    pub fn annotation(&self, anchor: LeafId) -> Option<&AnnotationMount> {
        self.annotations().into_iter().find(|m| m.anchor == anchor)
    }

    pub fn annotation_mut(&mut self, anchor: LeafId) -> Option<&mut AnnotationMount> {
        fn walk(el: &mut Element, anchor: LeafId) -> Option<&mut AnnotationMount> {
            for child in el.children.iter_mut() {
                match child {
                    Node::Element(inner) => {
                        if let Some(found) = walk(inner, anchor) {
                            return Some(found);
                        }
                    }
                    Node::Annotation(mount) if mount.anchor == anchor => return Some(mount),
                    _ => {}
                }
            }
            None
        }

        walk(&mut self.root, anchor)
    }

    /// Render as HTML. Annotations become `span.glossa-annotation` anchors.
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        render_element(&self.root, &mut out);
        out
    }
}

/// Content of `node` between two bounds; `None` bounds are open ends.
fn clip(node: &Node, start: Bound<'_>, end: Bound<'_>) -> Option<Node> {
    if start.is_none() && end.is_none() {
        return Some(node.clone());
    }
    match node {
        Node::Element(el) => {
            let children = clip_children(el, start, end);
            if children.is_empty() {
                return None;
            }
            let mut copy = el.shell();
            copy.children = children;
            Some(Node::Element(copy))
        }
        Node::Text(leaf) => {
            let len = char_len(&leaf.text);
            let (from, to) = clip_offsets(start, end, len);
            if from >= to {
                None
            } else if from == 0 && to == len {
                Some(Node::Text(leaf.clone()))
            } else {
                Some(Node::text(slice_chars(&leaf.text, from..to)))
            }
        }
        Node::Annotation(mount) => {
            let len = char_len(&mount.matched);
            let (from, to) = clip_offsets(start, end, len);
            if from >= to {
                None
            } else if from == 0 && to == len {
                Some(Node::Annotation(mount.clone()))
            } else {
                // A cut through a widget leaves only its text behind.
                Some(Node::text(slice_chars(&mount.matched, from..to)))
            }
        }
        Node::Placeholder(never) => match *never {},
    }
}

fn clip_offsets(start: Bound<'_>, end: Bound<'_>, len: usize) -> (usize, usize) {
    let from = start.map(|(_, offset)| offset).unwrap_or(0).min(len);
    let to = end.map(|(_, offset)| offset).unwrap_or(len).min(len);
    (from, to)
}

fn clip_children(el: &Element, start: Bound<'_>, end: Bound<'_>) -> Vec<Node> {
    if el.children.is_empty() {
        return Vec::new();
    }
    let first = start
        .and_then(|(path, _)| path.first().copied())
        .unwrap_or(0);
    let last = end
        .and_then(|(path, _)| path.first().copied())
        .unwrap_or(el.children.len() - 1)
        .min(el.children.len() - 1);

    let mut out = Vec::new();
    for idx in first..=last {
        let child_start = start
            .filter(|_| idx == first)
            .map(|(path, offset)| (path.get(1..).unwrap_or_default(), offset));
        let child_end = end
            .filter(|_| idx == last)
            .map(|(path, offset)| (path.get(1..).unwrap_or_default(), offset));
        if let Some(node) = clip(&el.children[idx], child_start, child_end) {
            out.push(node);
        }
    }
    out
}

fn render_element(el: &Element, out: &mut String) {
    let _ = write!(out, "<{}", el.tag);
    for (name, value) in &el.attrs {
        let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
    }
    out.push('>');
    for child in &el.children {
        match child {
            Node::Element(inner) => render_element(inner, out),
            Node::Text(leaf) => out.push_str(&escape_html(&leaf.text)),
            Node::Annotation(mount) => {
                let _ = write!(
                    out,
                    "<span class=\"glossa-annotation\" data-anchor=\"{}\" data-term=\"{}\" data-open=\"{}\">{}</span>",
                    mount.anchor.0,
                    escape_html(mount.target.label()),
                    mount.state.open,
                    escape_html(&mount.matched),
                );
            }
            Node::Placeholder(never) => match *never {},
        }
    }
    let _ = write!(out, "</{}>", el.tag);
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<div><p>Hello <b>bold</b> world</p><p>Second line.</p></div>`
    fn sample() -> ContentTree {
        ContentTree::new(Element::new(
            "div",
            vec![
                Node::element(
                    "p",
                    vec![
                        Node::text("Hello "),
                        Node::element("b", vec![Node::text("bold")]),
                        Node::text(" world"),
                    ],
                ),
                Node::element("p", vec![Node::text("Second line.")]),
            ],
        ))
    }

    #[test]
    fn test_text_content_and_leaves() {
        let tree = sample();
        assert_eq!(tree.text_content(), "Hello bold worldSecond line.");
        let paths: Vec<NodePath> = tree.leaves().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![vec![0, 0], vec![0, 1, 0], vec![0, 2], vec![1, 0]]
        );
    }

    #[test]
    fn test_locate_affinity() {
        let tree = sample();
        // Offset 6 is the seam between "Hello " and "bold".
        assert_eq!(
            tree.locate(6, Affinity::Before),
            Some(Boundary::new(vec![0, 0], 6))
        );
        assert_eq!(
            tree.locate(6, Affinity::After),
            Some(Boundary::new(vec![0, 1, 0], 0))
        );
        // End of document.
        assert_eq!(
            tree.locate(28, Affinity::After),
            Some(Boundary::new(vec![1, 0], 12))
        );
        assert_eq!(tree.locate(29, Affinity::Before), None);
    }

    #[test]
    fn test_select_text_maps_offsets() {
        let tree = sample();
        let snap = tree.select_text("lo bo", 0).unwrap();
        assert_eq!(snap.text, "lo bo");
        assert_eq!(snap.range.start, Boundary::new(vec![0, 0], 3));
        assert_eq!(snap.range.end, Boundary::new(vec![0, 1, 0], 2));
        assert_eq!(tree.range_text(&snap.range).unwrap(), "lo bo");
        assert!(tree.select_text("missing", 0).is_none());
    }

    #[test]
    fn test_clone_range_clips_partial_ancestors() {
        let tree = sample();
        let snap = tree.select_text("lo bo", 0).unwrap();
        let fragment = tree.clone_range(&snap.range).unwrap();
        assert_eq!(fragment.len(), 2);
        assert_eq!(fragment_text(&fragment), "lo bo");
        match &fragment[1] {
            Node::Element(el) => assert_eq!(el.tag, "b"),
            other => panic!("expected clipped <b>, got {other:?}"),
        }
    }

    #[test]
    fn test_replace_range_same_leaf() {
        let mut tree = sample();
        let snap = tree.select_text("world", 0).unwrap();
        tree.replace_range(&snap.range, vec![Node::text("there")])
            .unwrap();
        assert_eq!(tree.text_content(), "Hello bold thereSecond line.");
        assert_eq!(
            tree.render_html(),
            "<div><p>Hello <b>bold</b> there</p><p>Second line.</p></div>"
        );
    }

    #[test]
    fn test_replace_range_across_elements_keeps_outer_text() {
        let mut tree = sample();
        let snap = tree.select_text("lo bo", 0).unwrap();
        let fragment = tree.clone_range(&snap.range).unwrap();
        tree.replace_range(&snap.range, fragment).unwrap();
        assert_eq!(tree.text_content(), "Hello bold worldSecond line.");
        assert_eq!(
            tree.render_html(),
            "<div><p>Hello <b>bo</b><b>ld</b> world</p><p>Second line.</p></div>"
        );
    }

    #[test]
    fn test_replace_range_across_paragraphs() {
        let mut tree = sample();
        let snap = tree.select(12, 22).unwrap();
        assert_eq!(snap.text, "orldSecond");
        tree.replace_range(&snap.range, vec![Node::text("X")]).unwrap();
        assert_eq!(tree.text_content(), "Hello bold wX line.");
    }

    #[test]
    fn test_stale_range_rejected() {
        let mut tree = sample();
        let snap = tree.select_text("Second", 0).unwrap();
        let mut stale = snap.range.clone();
        stale.start.path = vec![5, 0];
        assert!(matches!(
            tree.replace_range(&stale, vec![]),
            Err(RangeError::InvalidPath { .. })
        ));
        stale = snap.range.clone();
        stale.end.offset = 99;
        assert!(matches!(
            tree.replace_range(&stale, vec![]),
            Err(RangeError::OffsetOutOfBounds { .. })
        ));
        assert_eq!(tree.render_html(), sample().render_html());
    }

    #[test]
    fn test_parent_text_offsets() {
        let tree = sample();
        let (text, offset) = tree.parent_text(&[0, 2]).unwrap();
        assert_eq!(text, "Hello bold world");
        assert_eq!(offset, 10);
        let (text, offset) = tree.parent_text(&[0, 1, 0]).unwrap();
        assert_eq!(text, "bold");
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_from_plain_text() {
        let tree = ContentTree::from_plain_text("One. Two.\n\nhello world\nfoo bar\n");
        assert_eq!(tree.root().children.len(), 2);
        assert_eq!(tree.text_content(), "One. Two.hello world\nfoo bar");
    }

    #[test]
    fn test_from_json_spec() {
        let tree = ContentTree::from_json(
            r#"{"tag":"p","attrs":{"class":"lead"},"children":["a ",{"tag":"em","children":["b"]}]}"#,
        )
        .unwrap();
        assert_eq!(tree.text_content(), "a b");
        insta::assert_snapshot!(tree.render_html(), @r#"<p class="lead">a <em>b</em></p>"#);
    }

    #[test]
    fn test_escape_html() {
        let tree = ContentTree::new(Element::new("p", vec![Node::text("a < b & \"c\"")]));
        assert_eq!(
            tree.render_html(),
            "<p>a &lt; b &amp; &quot;c&quot;</p>"
        );
    }
}
