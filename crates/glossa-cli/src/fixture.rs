//! Offline collaborators: canned service answers and an in-memory vocabulary.

use std::cell::RefCell;
use std::path::Path;

use glossa_core::{
    ResolutionError, ServiceRequest, TermService, VocabularyError, VocabularyLookup,
    VocabularyRecord,
};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::{Map, Value};

/// Answers each operation with the JSON stored under its name, e.g.
/// `{ "resolve-terms": { "words": [...] }, "translate-word": {...} }`.
pub struct FixtureService {
    replies: Map<String, Value>,
}

impl FixtureService {
    pub fn new(replies: Map<String, Value>) -> Self {
        Self { replies }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading fixture {}", path.display()))?;
        let replies: Map<String, Value> = serde_json::from_str(&raw)
            .into_diagnostic()
            .wrap_err("fixture must be a JSON object keyed by operation")?;
        Ok(Self::new(replies))
    }
}

impl TermService for FixtureService {
    async fn call(&self, request: ServiceRequest) -> Result<Value, ResolutionError> {
        let op = request.op();
        tracing::debug!(op, "fixture call");
        self.replies
            .get(op)
            .cloned()
            .ok_or_else(|| ResolutionError::upstream(format!("fixture has no answer for {op}")))
    }
}

/// Vocabulary store that lives for one process.
#[derive(Default)]
pub struct MemoryVocabulary {
    records: RefCell<Vec<VocabularyRecord>>,
}

impl VocabularyLookup for MemoryVocabulary {
    async fn search(&self, term: &str, exact: bool) -> Result<Vec<VocabularyRecord>, VocabularyError> {
        let records = self.records.borrow();
        Ok(records
            .iter()
            .filter(|r| {
                let lemma = r.original_vocabulary.as_deref().unwrap_or(&r.vocabulary);
                if exact {
                    lemma == term
                } else {
                    lemma.contains(term)
                }
            })
            .cloned()
            .collect())
    }

    async fn create(&self, record: &VocabularyRecord) -> Result<(), VocabularyError> {
        let mut records = self.records.borrow_mut();
        let mut record = record.clone();
        record.id = Some(records.len().to_string());
        records.push(record);
        Ok(())
    }

    async fn update(&self, id: &str, record: &VocabularyRecord) -> Result<(), VocabularyError> {
        let mut records = self.records.borrow_mut();
        let slot = records
            .iter_mut()
            .find(|r| r.id.as_deref() == Some(id))
            .ok_or_else(|| VocabularyError(format!("no record with id {id}")))?;
        *slot = record.clone();
        Ok(())
    }
}
