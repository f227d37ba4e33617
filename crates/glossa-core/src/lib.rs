//! glossa-core: selection-driven annotation engine.
//!
//! This crate provides:
//! - `ContentTree` - owned document tree with char-offset ranges
//! - Context extraction (sentence, then line) around a selection
//! - Fragment rewriting that splits text leaves on resolved terms
//! - Widget mounting with per-annotation failure isolation
//! - `AnnotationEngine` - trigger-to-commit orchestration over pluggable
//!   term, vocabulary and host collaborators

pub mod commit;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod matcher;
pub mod mount;
pub mod platform;
pub mod resolver;
pub mod rewrite;
pub mod session;
pub mod text_helpers;
pub mod tree;
pub mod trigger;
pub mod types;

pub use commit::{LiveDocument, commit};
pub use config::{EngineConfig, FileStore, Loader, Saver};
pub use context::{extract_context, find_context};
pub use engine::{AnnotationEngine, RunOutcome, RunReport};
pub use error::{
    ChordError, ConfigError, EngineError, LookupError, MountError, RangeError, ResolutionError,
    VocabularyError,
};
pub use lookup::{LookupOutcome, SaveAction, Translation, VocabularyLookup, VocabularyRecord};
pub use mount::{
    AnnotationMount, AnnotationTarget, MountReport, MountRequest, PopoverFactory, WidgetFactory,
    WidgetState, WidgetView, mount_placeholders,
};
pub use platform::{NoticeLevel, Notifier, SelectionSource, TracingNotifier};
pub use resolver::{
    SchemaResolver, ServiceRequest, TermQuery, TermResolver, TermService, TextTranslation,
    VocabularyInfo,
};
pub use rewrite::{Fragment, Placeholder, rewrite_fragment};
pub use smol_str::SmolStr;
pub use tree::{ContentTree, Element, Node, NodeSpec, TextLeaf};
pub use trigger::{Key, KeyCombo, KeydownResult, Keymap, Modifiers, TriggerMode};
pub use types::{
    Affinity, Boundary, Context, ExtractedContext, LeafId, MatchMode, ResolvedTerm,
    SelectionRange, SelectionSnapshot,
};
