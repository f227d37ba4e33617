//! Error types for the annotation engine.
//!
//! Every failure is scoped to one trigger invocation; nothing here is fatal to
//! the host. A missing selection and a missing context are not errors at all
//! and have no variant.

use miette::Diagnostic;

use crate::types::{LeafId, NodePath};

/// A selection range that no longer addresses the tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum RangeError {
    #[error("no text-bearing node at path {path:?}")]
    #[diagnostic(
        code(glossa::range::invalid_path),
        help("the document changed after the selection was captured")
    )]
    InvalidPath { path: NodePath },

    #[error("offset {offset} is past the end of a {len}-char leaf")]
    #[diagnostic(code(glossa::range::offset))]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("range end comes before its start")]
    #[diagnostic(code(glossa::range::reversed))]
    Reversed,
}

/// The remote term or translation service failed, or answered nonsense.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ResolutionError {
    /// Transport or service failure; carries the upstream message verbatim.
    #[error("{0}")]
    #[diagnostic(code(glossa::resolve::upstream))]
    Upstream(String),

    /// The payload did not match the expected schema.
    #[error("malformed {what} response: {source}")]
    #[diagnostic(
        code(glossa::resolve::malformed),
        help("the service must answer with the documented JSON shape")
    )]
    Malformed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ResolutionError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }
}

/// One widget could not be initialized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("could not mount widget for {term:?}: {reason}")]
#[diagnostic(code(glossa::mount))]
pub struct MountError {
    pub term: String,
    pub reason: String,
}

impl MountError {
    pub fn new(term: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            reason: reason.into(),
        }
    }
}

/// The vocabulary store failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("{0}")]
#[diagnostic(code(glossa::vocabulary))]
pub struct VocabularyError(pub String);

/// A widget's on-demand lookup failed.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum LookupError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error("{text:?} was not found in the dictionary")]
    #[diagnostic(code(glossa::lookup::not_found))]
    NotInDictionary { text: String },

    #[error("nothing has been looked up yet")]
    #[diagnostic(code(glossa::lookup::empty))]
    NothingToSave,

    #[error("no saved record with id {id:?} was found for this word")]
    #[diagnostic(code(glossa::lookup::unknown_record))]
    UnknownRecord { id: String },

    #[error("no annotation is anchored at {anchor}")]
    #[diagnostic(
        code(glossa::lookup::unknown_anchor),
        help("the annotation was replaced by a later run")
    )]
    UnknownAnnotation { anchor: LeafId },
}

/// A key chord string could not be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("invalid key chord {chord:?}: {reason}")]
#[diagnostic(
    code(glossa::chord),
    help("write chords like \"Shift+M\" or \"Ctrl+Alt+T\"")
)]
pub struct ChordError {
    pub chord: String,
    pub reason: &'static str,
}

/// Failure of one engine run. The live tree is untouched whenever this is returned.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("selection is stale: {0}")]
    #[diagnostic(code(glossa::engine::stale))]
    StaleRange(#[from] RangeError),

    #[error("a topic is required before marking terms")]
    #[diagnostic(
        code(glossa::engine::topic),
        help("set a topic so the resolver knows which domain the terms belong to")
    )]
    TopicRequired,
}

/// Configuration could not be loaded or saved.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error("unsupported config format: {0}")]
    #[diagnostic(help("use a .json or .toml file"))]
    UnsupportedFormat(String),
}
