//! Engine orchestration: trigger → context → resolve → rewrite → mount → commit.
//!
//! A run reads the live tree once before its only suspension point (the term
//! service call) and writes it once at the end. Two runs may be in flight at
//! the same time; each commits when its own resolution finishes. Runs over
//! overlapping text can race: the later commit replaces whatever the earlier
//! one inserted if its range still resolves, and fails with
//! [`EngineError::StaleRange`] if it does not.

use std::collections::HashSet;

use crate::commit::{LiveDocument, commit};
use crate::config::EngineConfig;
use crate::context::extract_context;
use crate::error::{EngineError, LookupError, MountError};
use crate::lookup::{self, LookupOutcome, SaveAction, VocabularyLookup, VocabularyRecord};
use crate::mount::{AnnotationMount, AnnotationTarget, PopoverFactory, WidgetFactory, WidgetView, mount_placeholders};
use crate::platform::{Notifier, SelectionSource, TracingNotifier};
use crate::resolver::{TermQuery, TermResolver};
use crate::rewrite::{Fragment, Placeholder, placeholders, rewrite_fragment};
use crate::session::Session;
use crate::tree::{Element, Node};
use crate::trigger::{Key, KeydownResult, Modifiers, TriggerMode};
use crate::types::{Context, LeafId, SelectionSnapshot};

/// Warning shown when mark mode needs a topic and none was entered.
pub const TOPIC_REQUIRED_NOTICE: &str = "Please enter topic first";
/// Warning shown when a short text has no dictionary lemma.
pub const NOT_IN_DICTIONARY_NOTICE: &str = "Word not found in dictionary";

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The key was not a trigger chord.
    Ignored,
    /// Nothing usable was selected.
    NoSelection,
    /// The selection was processed.
    Annotated(RunReport),
}

impl RunOutcome {
    pub fn keydown_result(&self) -> KeydownResult {
        match self {
            RunOutcome::Ignored => KeydownResult::NotHandled,
            _ => KeydownResult::Handled,
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Annotated(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: TriggerMode,
    pub selected_text: String,
    pub context: Option<Context>,
    /// Number of annotation targets: resolved terms, or the one translated span.
    pub targets: usize,
    /// Matches found in the selection.
    pub placeholders: usize,
    /// Anchors of the widgets that mounted, in document order.
    pub anchors: Vec<LeafId>,
    /// Matches that fell back to plain text.
    pub failures: Vec<MountError>,
    /// Whether the live tree was touched. Nothing is committed when no target matched.
    pub committed: bool,
}

/// The annotation engine, generic over its collaborators.
pub struct AnnotationEngine<R, V, F = PopoverFactory, N = TracingNotifier> {
    config: EngineConfig,
    resolver: R,
    vocabulary: V,
    factory: F,
    notifier: N,
    session: Session,
}

impl<R, V> AnnotationEngine<R, V> {
    pub fn new(config: EngineConfig, resolver: R, vocabulary: V) -> Self {
        Self {
            config,
            resolver,
            vocabulary,
            factory: PopoverFactory,
            notifier: TracingNotifier,
            session: Session::new(),
        }
    }
}

impl<R, V, F, N> AnnotationEngine<R, V, F, N> {
    pub fn with_factory<G>(self, factory: G) -> AnnotationEngine<R, V, G, N> {
        AnnotationEngine {
            config: self.config,
            resolver: self.resolver,
            vocabulary: self.vocabulary,
            factory,
            notifier: self.notifier,
            session: self.session,
        }
    }

    pub fn with_notifier<M>(self, notifier: M) -> AnnotationEngine<R, V, F, M> {
        AnnotationEngine {
            config: self.config,
            resolver: self.resolver,
            vocabulary: self.vocabulary,
            factory: self.factory,
            notifier,
            session: self.session,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn vocabulary(&self) -> &V {
        &self.vocabulary
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn set_topic(&self, topic: &str) {
        self.session.set_topic(topic);
    }

    /// The reader left the page.
    pub fn on_navigation(&self) {
        self.session.on_navigation();
    }

    /// Switch a widget between its meanings and lookup panels.
    pub fn toggle_view(&self, doc: &impl LiveDocument, anchor: LeafId) -> Option<WidgetView> {
        doc.write(|tree| {
            let mount = tree.annotation_mut(anchor)?;
            mount.state.toggle_view();
            Some(mount.state.view)
        })
    }
}

impl<R, V, F, N> AnnotationEngine<R, V, F, N>
where
    R: TermResolver,
    V: VocabularyLookup,
    F: WidgetFactory,
    N: Notifier,
{
    /// Handle a keydown: run the mode its chord maps to, if any.
    pub async fn handle_key(
        &self,
        key: &Key,
        modifiers: Modifiers,
        selection: &impl SelectionSource,
        doc: &impl LiveDocument,
    ) -> Result<RunOutcome, EngineError> {
        let Some(mode) = self.config.keymap.mode_for(key, modifiers) else {
            return Ok(RunOutcome::Ignored);
        };
        tracing::debug!(%mode, %key, "trigger");
        self.run(mode, selection.snapshot(), doc).await
    }

    /// Run one mode over a captured selection.
    ///
    /// On error the live tree is untouched.
    pub async fn run(
        &self,
        mode: TriggerMode,
        snapshot: Option<SelectionSnapshot>,
        doc: &impl LiveDocument,
    ) -> Result<RunOutcome, EngineError> {
        let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) else {
            tracing::debug!("nothing selected");
            return Ok(RunOutcome::NoSelection);
        };

        let topic = self.session.topic();
        if mode == TriggerMode::Mark && self.config.require_topic && topic.is_none() {
            self.notifier.warning(TOPIC_REQUIRED_NOTICE);
            return Err(EngineError::TopicRequired);
        }

        let (extracted, fragment) = doc.read(|tree| {
            (
                extract_context(tree, &snapshot),
                tree.clone_range(&snapshot.range),
            )
        });
        let fragment = fragment.inspect_err(|err| {
            tracing::warn!(error = %err, "selection no longer addresses the document");
        })?;
        let selected = extracted.selected_text.trim().to_string();

        let targets: Vec<AnnotationTarget> = match mode {
            TriggerMode::Mark => {
                let query = TermQuery::new(selected.clone())
                    .with_context(extracted.context_marked())
                    .with_topic(topic);
                match self.resolver.resolve_terms(&query).await {
                    Ok(terms) => terms.into_iter().map(AnnotationTarget::Term).collect(),
                    Err(err) => {
                        tracing::warn!(error = %err, "term resolution failed");
                        self.notifier.error(&err.to_string());
                        return Err(err.into());
                    }
                }
            }
            TriggerMode::Translate => vec![AnnotationTarget::Translation {
                text: selected.clone(),
                context: extracted.context.clone(),
            }],
        };

        let labels: Vec<&str> = targets.iter().map(AnnotationTarget::label).collect();
        let rewritten = rewrite_fragment(
            fragment.into_iter().map(Node::detach).collect(),
            &labels,
            self.config.match_mode(mode),
        );
        let rewritten = widen_bare_contexts(rewritten, extracted.context.as_ref());
        let pending: Vec<LeafId> = placeholders(&rewritten).iter().map(|p| p.anchor).collect();
        let found = pending.len();
        let (nodes, mounted) = mount_placeholders(rewritten, &targets, &self.factory);
        let in_tree = annotation_anchors(&nodes);
        let anchors = pending.into_iter().filter(|a| in_tree.contains(a)).collect();

        let committed = found > 0;
        if committed {
            commit(doc, &snapshot, nodes).inspect_err(|err| {
                tracing::warn!(error = %err, "commit rejected");
            })?;
        } else {
            tracing::debug!(targets = targets.len(), "no target matched, leaving the document alone");
        }

        tracing::debug!(
            %mode,
            targets = targets.len(),
            placeholders = found,
            mounted = mounted.mounted,
            failed = mounted.failures.len(),
            "run finished"
        );
        Ok(RunOutcome::Annotated(RunReport {
            mode,
            selected_text: extracted.selected_text,
            context: extracted.context,
            targets: targets.len(),
            placeholders: found,
            anchors,
            failures: mounted.failures,
            committed,
        }))
    }

    /// Run a widget's lazy lookup and store the result on the widget.
    pub async fn lookup(
        &self,
        doc: &impl LiveDocument,
        anchor: LeafId,
    ) -> Result<LookupOutcome, LookupError> {
        let (text, context_marked) = doc
            .read(|tree| tree.annotation(anchor).map(lookup_request))
            .ok_or(LookupError::UnknownAnnotation { anchor })?;

        let outcome =
            match lookup::lookup(&self.resolver, &self.vocabulary, &text, context_marked.as_deref()).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.notify_lookup_error(&err);
                    return Err(err);
                }
            };

        let stored = doc.write(|tree| {
            let mount = tree.annotation_mut(anchor)?;
            mount.state.view = WidgetView::Lookup;
            mount.state.open = true;
            mount.state.lookup = Some(outcome.clone());
            Some(())
        });
        if stored.is_none() {
            tracing::debug!(%anchor, "widget went away during lookup");
        }
        Ok(outcome)
    }

    /// Save the word a widget looked up.
    pub async fn save(
        &self,
        doc: &impl LiveDocument,
        anchor: LeafId,
    ) -> Result<SaveAction, LookupError> {
        let outcome = doc
            .read(|tree| tree.annotation(anchor).map(|m| m.state.lookup.clone()))
            .ok_or(LookupError::UnknownAnnotation { anchor })?
            .ok_or(LookupError::NothingToSave)?;

        match lookup::save(&self.vocabulary, &outcome).await {
            Ok(action) => {
                self.notifier.info("Saved successfully");
                Ok(action)
            }
            Err(err) => {
                self.notify_lookup_error(&err);
                Err(err)
            }
        }
    }

    /// Store an edit to one of the records a widget's lookup found.
    ///
    /// The widget keeps the edited copy so reopening it shows the change.
    pub async fn update_existing(
        &self,
        doc: &impl LiveDocument,
        anchor: LeafId,
        id: &str,
        record: VocabularyRecord,
    ) -> Result<SaveAction, LookupError> {
        let outcome = doc
            .read(|tree| tree.annotation(anchor).map(|m| m.state.lookup.clone()))
            .ok_or(LookupError::UnknownAnnotation { anchor })?
            .ok_or(LookupError::NothingToSave)?;

        let action = match lookup::update_existing(&self.vocabulary, &outcome, id, &record).await {
            Ok(action) => action,
            Err(err) => {
                self.notify_lookup_error(&err);
                return Err(err);
            }
        };
        self.notifier.info("Update successfully");

        doc.write(|tree| {
            let stored = tree.annotation_mut(anchor)?.state.lookup.as_mut()?;
            let slot = stored.existing.iter_mut().find(|r| r.id.as_deref() == Some(id))?;
            *slot = VocabularyRecord {
                id: Some(id.to_string()),
                ..record
            };
            Some(())
        });
        Ok(action)
    }

    fn notify_lookup_error(&self, err: &LookupError) {
        match err {
            LookupError::NotInDictionary { .. } => self.notifier.warning(NOT_IN_DICTIONARY_NOTICE),
            other => {
                tracing::warn!(error = %other, "lookup failed");
                self.notifier.error(&other.to_string());
            }
        }
    }
}

/// A match that filled its whole leaf has no local context of its own; give
/// it the selection's context instead.
fn widen_bare_contexts(fragment: Fragment, context: Option<&Context>) -> Fragment {
    let Some(context) = context else {
        return fragment;
    };
    let mut widen = |mut placeholder: Placeholder| {
        if placeholder.local_context.raw == placeholder.matched {
            placeholder.local_context = context.clone();
        }
        Node::Placeholder(placeholder)
    };
    fragment.into_iter().map(|node| node.map_slots(&mut widen)).collect()
}

/// Text and marked context a widget looks up.
fn lookup_request(mount: &AnnotationMount) -> (String, Option<String>) {
    match &mount.target {
        AnnotationTarget::Term(term) => (term.term.to_string(), Some(mount.local_context.marked.clone())),
        AnnotationTarget::Translation { text, context } => {
            (text.clone(), context.as_ref().map(|c| c.marked.clone()))
        }
    }
}

/// Anchors of every annotation in a node list.
fn annotation_anchors(nodes: &[Node]) -> HashSet<LeafId> {
    fn walk(nodes: &[Node], out: &mut HashSet<LeafId>) {
        for node in nodes {
            match node {
                Node::Element(Element { children, .. }) => walk(children, out),
                Node::Annotation(mount) => {
                    out.insert(mount.anchor);
                }
                _ => {}
            }
        }
    }

    let mut out = HashSet::new();
    walk(nodes, &mut out);
    out
}
