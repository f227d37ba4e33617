//! Annotation mounting: bind one widget to each placeholder of a rewritten
//! fragment, producing nodes that can be committed to the live tree.

use crate::error::MountError;
use crate::lookup::LookupOutcome;
use crate::rewrite::{Fragment, Placeholder};
use crate::tree::Node;
use crate::types::{Context, LeafId, ResolvedTerm};

/// What a widget annotates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationTarget {
    /// A term resolved by the term service, with its meanings.
    Term(ResolvedTerm),
    /// A free-form span to translate on demand.
    Translation {
        text: String,
        context: Option<Context>,
    },
}

impl AnnotationTarget {
    /// Text the rewriter matches for this target.
    pub fn label(&self) -> &str {
        match self {
            AnnotationTarget::Term(term) => &term.term,
            AnnotationTarget::Translation { text, .. } => text,
        }
    }
}

/// Which panel a widget shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WidgetView {
    /// English and Vietnamese meanings side by side, translation below.
    #[default]
    Meanings,
    /// Dictionary lookup or free-text translation.
    Lookup,
}

/// Interactive state of one mounted widget.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct WidgetState {
    pub view: WidgetView,
    pub open: bool,
    /// Result of the lazy lookup, once it has run.
    pub lookup: Option<LookupOutcome>,
}

impl WidgetState {
    pub fn closed(view: WidgetView) -> Self {
        Self {
            view,
            open: false,
            lookup: None,
        }
    }

    pub fn opened(view: WidgetView) -> Self {
        Self {
            view,
            open: true,
            lookup: None,
        }
    }

    /// Switch between the meanings and lookup panels.
    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            WidgetView::Meanings => WidgetView::Lookup,
            WidgetView::Lookup => WidgetView::Meanings,
        };
    }
}

/// A widget bound into the tree at a former placeholder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationMount {
    pub anchor: LeafId,
    pub matched: String,
    pub target: AnnotationTarget,
    pub local_context: Context,
    pub state: WidgetState,
}

/// Everything a factory sees when asked to build a widget.
#[derive(Clone, Copy, Debug)]
pub struct MountRequest<'a> {
    pub anchor: LeafId,
    pub matched: &'a str,
    pub target: &'a AnnotationTarget,
}

/// Builds the initial state of a widget.
pub trait WidgetFactory {
    fn build(&self, request: &MountRequest<'_>) -> Result<WidgetState, MountError>;
}

/// Default popover widgets.
///
/// Term popovers start closed on their meanings; translation popovers open
/// straight onto the lookup panel.
#[derive(Clone, Copy, Debug, Default)]
pub struct PopoverFactory;

impl WidgetFactory for PopoverFactory {
    fn build(&self, request: &MountRequest<'_>) -> Result<WidgetState, MountError> {
        Ok(match request.target {
            AnnotationTarget::Term(_) => WidgetState::closed(WidgetView::Meanings),
            AnnotationTarget::Translation { .. } => WidgetState::opened(WidgetView::Lookup),
        })
    }
}

impl<F: WidgetFactory + ?Sized> WidgetFactory for &F {
    fn build(&self, request: &MountRequest<'_>) -> Result<WidgetState, MountError> {
        (**self).build(request)
    }
}

/// Outcome of mounting a fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MountReport {
    pub mounted: usize,
    /// Placeholders that fell back to plain text.
    pub failures: Vec<MountError>,
}

/// Mount a widget at every placeholder of `fragment`.
///
/// Each placeholder is mounted on its own: a failing widget becomes a plain
/// text leaf holding the matched text and its siblings are unaffected.
pub fn mount_placeholders(
    fragment: Fragment,
    targets: &[AnnotationTarget],
    factory: &impl WidgetFactory,
) -> (Vec<Node>, MountReport) {
    let mut report = MountReport::default();
    let mut mount = |placeholder: Placeholder| -> Node {
        match mount_one(&placeholder, targets, factory) {
            Ok(mount) => {
                report.mounted += 1;
                Node::Annotation(mount)
            }
            Err(err) => {
                tracing::warn!(
                    anchor = %placeholder.anchor,
                    matched = %placeholder.matched,
                    error = %err,
                    "widget failed to mount, keeping plain text"
                );
                report.failures.push(err);
                Node::text(placeholder.matched)
            }
        }
    };

    let nodes = fragment
        .into_iter()
        .map(|node| node.map_slots(&mut mount))
        .collect();
    (nodes, report)
}

fn mount_one(
    placeholder: &Placeholder,
    targets: &[AnnotationTarget],
    factory: &impl WidgetFactory,
) -> Result<AnnotationMount, MountError> {
    let target = targets.get(placeholder.target).ok_or_else(|| {
        MountError::new(&placeholder.matched, format!("no target #{}", placeholder.target))
    })?;
    let state = factory.build(&MountRequest {
        anchor: placeholder.anchor,
        matched: &placeholder.matched,
        target,
    })?;
    Ok(AnnotationMount {
        anchor: placeholder.anchor,
        matched: placeholder.matched.clone(),
        target: target.clone(),
        local_context: placeholder.local_context.clone(),
        state,
    })
}
