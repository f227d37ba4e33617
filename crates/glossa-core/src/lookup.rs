//! On-demand lookups run from inside a mounted widget.
//!
//! Nothing here runs during a rewrite. A widget asks for a lookup when the
//! reader opens it, and may then save what it found to the vocabulary store.

use std::future::Future;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{LookupError, VocabularyError};
use crate::resolver::{PartOfSpeech, TermResolver, TextTranslation, VocabularyInfo};
use crate::text_helpers::word_count;

/// Texts of at most this many words are looked up as vocabulary.
pub const MAX_VOCABULARY_WORDS: usize = 2;

/// A vocabulary record as the store keeps it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyRecord {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub vocabulary: String,
    pub translated_vi: String,
    #[serde(default)]
    pub parts_of_speech: PartOfSpeech,
    #[serde(default)]
    pub pronunciation: String,
    #[serde(default)]
    pub definition_en: String,
    #[serde(default)]
    pub definition_vi: String,
    #[serde(default)]
    pub example_sentences: String,
    #[serde(default)]
    pub example_sentences_vi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_vocabulary: Option<SmolStr>,
}

impl VocabularyRecord {
    /// Build a new record from a dictionary answer.
    ///
    /// With a marked context, the context itself becomes the example sentence.
    pub fn from_info(
        info: &VocabularyInfo,
        lemma: &SmolStr,
        vocabulary: &str,
        context_marked: Option<&str>,
    ) -> Self {
        let (example_sentences, example_sentences_vi) = match context_marked {
            Some(context) => (
                context.to_string(),
                info.sentences_translated_vi.clone().unwrap_or_default(),
            ),
            None => (
                info.example_sentences.clone().unwrap_or_default(),
                info.example_sentences_vi.clone().unwrap_or_default(),
            ),
        };
        Self {
            id: None,
            vocabulary: vocabulary.to_string(),
            translated_vi: info.vocabulary_translated_vi.clone(),
            parts_of_speech: info.parts_of_speech,
            pronunciation: info.pronunciation.clone(),
            definition_en: info.definition_en.clone(),
            definition_vi: info.definition_vi.clone(),
            example_sentences,
            example_sentences_vi,
            original_vocabulary: Some(lemma.clone()),
        }
    }
}

/// The vocabulary store.
pub trait VocabularyLookup {
    fn search(
        &self,
        term: &str,
        exact: bool,
    ) -> impl Future<Output = Result<Vec<VocabularyRecord>, VocabularyError>>;

    fn create(
        &self,
        record: &VocabularyRecord,
    ) -> impl Future<Output = Result<(), VocabularyError>>;

    fn update(
        &self,
        id: &str,
        record: &VocabularyRecord,
    ) -> impl Future<Output = Result<(), VocabularyError>>;
}

/// What a lookup found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Translation {
    Vocabulary {
        lemma: SmolStr,
        record: VocabularyRecord,
    },
    Text(TextTranslation),
}

/// A finished lookup, with any records the store already holds for the lemma.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupOutcome {
    pub translation: Translation,
    pub existing: Vec<VocabularyRecord>,
}

/// What [`save`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveAction {
    Created,
    Updated { id: String },
}

/// Check if a text is short enough to be looked up as vocabulary.
pub fn is_vocabulary(text: &str) -> bool {
    (1..=MAX_VOCABULARY_WORDS).contains(&word_count(text))
}

/// Translate `text`: as a dictionary word if it is short, as free text otherwise.
pub async fn resolve_translation<R: TermResolver>(
    resolver: &R,
    text: &str,
    context_marked: Option<&str>,
) -> Result<Translation, LookupError> {
    let text = text.trim();
    if !is_vocabulary(text) {
        let translated = resolver.translate_text(text, context_marked).await?;
        return Ok(Translation::Text(translated));
    }

    let lemma = resolver
        .original_vocabulary(text, context_marked)
        .await?
        .filter(|lemma| !lemma.trim().is_empty() && !lemma.to_lowercase().contains("null"))
        .ok_or_else(|| LookupError::NotInDictionary {
            text: text.to_string(),
        })?;
    tracing::debug!(text, %lemma, "found lemma");

    let info = resolver.translate_word(text, context_marked).await?;
    let record = VocabularyRecord::from_info(&info, &lemma, text, context_marked);
    Ok(Translation::Vocabulary { lemma, record })
}

/// Full widget lookup: translate, then find existing records for a vocabulary hit.
pub async fn lookup<R: TermResolver, V: VocabularyLookup>(
    resolver: &R,
    vocabulary: &V,
    text: &str,
    context_marked: Option<&str>,
) -> Result<LookupOutcome, LookupError> {
    let translation = resolve_translation(resolver, text, context_marked).await?;
    let existing = match &translation {
        Translation::Vocabulary { lemma, .. } => vocabulary.search(lemma, true).await?,
        Translation::Text(_) => Vec::new(),
    };
    Ok(LookupOutcome {
        translation,
        existing,
    })
}

/// Save a looked-up word as a new record.
///
/// Records already in the store are left alone; each save adds one.
pub async fn save<V: VocabularyLookup>(
    vocabulary: &V,
    outcome: &LookupOutcome,
) -> Result<SaveAction, LookupError> {
    let Translation::Vocabulary { record, .. } = &outcome.translation else {
        return Err(LookupError::NothingToSave);
    };
    vocabulary.create(record).await?;
    Ok(SaveAction::Created)
}

/// Write an edited copy of one of `outcome.existing` back to the store.
pub async fn update_existing<V: VocabularyLookup>(
    vocabulary: &V,
    outcome: &LookupOutcome,
    id: &str,
    record: &VocabularyRecord,
) -> Result<SaveAction, LookupError> {
    if !outcome.existing.iter().any(|r| r.id.as_deref() == Some(id)) {
        return Err(LookupError::UnknownRecord { id: id.to_string() });
    }
    let mut record = record.clone();
    record.id = Some(id.to_string());
    vocabulary.update(id, &record).await?;
    Ok(SaveAction::Updated { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::ResolutionError;
    use crate::resolver::TermQuery;
    use crate::types::ResolvedTerm;

    struct Dictionary {
        lemma: Option<&'static str>,
    }

    impl TermResolver for Dictionary {
        async fn resolve_terms(&self, _: &TermQuery) -> Result<Vec<ResolvedTerm>, ResolutionError> {
            Ok(Vec::new())
        }

        async fn original_vocabulary(
            &self,
            _: &str,
            _: Option<&str>,
        ) -> Result<Option<SmolStr>, ResolutionError> {
            Ok(self.lemma.map(SmolStr::new))
        }

        async fn translate_word(
            &self,
            _: &str,
            context_marked: Option<&str>,
        ) -> Result<VocabularyInfo, ResolutionError> {
            Ok(VocabularyInfo {
                vocabulary_translated_vi: "chạy".into(),
                parts_of_speech: PartOfSpeech::Verb,
                pronunciation: "/rʌn/".into(),
                definition_en: "move fast".into(),
                definition_vi: "di chuyển nhanh".into(),
                example_sentences: Some("I run daily.".into()),
                example_sentences_vi: Some("Tôi chạy mỗi ngày.".into()),
                sentences_translated_vi: context_marked.map(|_| "Họ đang chạy.".into()),
            })
        }

        async fn translate_text(
            &self,
            text: &str,
            _: Option<&str>,
        ) -> Result<TextTranslation, ResolutionError> {
            Ok(TextTranslation {
                text: text.to_string(),
                translated_vi: "bản dịch".into(),
                grammar: "- simple present".into(),
            })
        }
    }

    #[derive(Default)]
    struct Store {
        records: RefCell<Vec<VocabularyRecord>>,
        calls: RefCell<Vec<String>>,
    }

    impl VocabularyLookup for Store {
        async fn search(&self, term: &str, exact: bool) -> Result<Vec<VocabularyRecord>, VocabularyError> {
            self.calls.borrow_mut().push(format!("search {term} {exact}"));
            Ok(self
                .records
                .borrow()
                .iter()
                .filter(|r| r.original_vocabulary.as_deref() == Some(term))
                .cloned()
                .collect())
        }

        async fn create(&self, record: &VocabularyRecord) -> Result<(), VocabularyError> {
            self.calls.borrow_mut().push(format!("create {}", record.vocabulary));
            let mut records = self.records.borrow_mut();
            let mut record = record.clone();
            record.id = Some(format!("r{}", records.len()));
            records.push(record);
            Ok(())
        }

        async fn update(&self, id: &str, record: &VocabularyRecord) -> Result<(), VocabularyError> {
            self.calls.borrow_mut().push(format!("update {id}"));
            let mut records = self.records.borrow_mut();
            let slot = records
                .iter_mut()
                .find(|r| r.id.as_deref() == Some(id))
                .ok_or_else(|| VocabularyError(format!("no record {id}")))?;
            *slot = record.clone();
            Ok(())
        }
    }

    #[test]
    fn test_is_vocabulary() {
        assert!(is_vocabulary("kubelet"));
        assert!(is_vocabulary(" take  off "));
        assert!(!is_vocabulary("a whole sentence"));
        assert!(!is_vocabulary("   "));
    }

    #[tokio::test]
    async fn test_vocabulary_lookup_with_context() {
        let store = Store::default();
        let outcome = lookup(
            &Dictionary { lemma: Some("run") },
            &store,
            " running ",
            Some("They are [[running]]."),
        )
        .await
        .unwrap();

        let Translation::Vocabulary { lemma, record } = &outcome.translation else {
            panic!("expected vocabulary, got {:?}", outcome.translation);
        };
        assert_eq!(lemma, "run");
        assert_eq!(record.vocabulary, "running");
        assert_eq!(record.example_sentences, "They are [[running]].");
        assert_eq!(record.example_sentences_vi, "Họ đang chạy.");
        assert_eq!(store.calls.borrow().as_slice(), ["search run true"]);
    }

    #[tokio::test]
    async fn test_null_lemma_not_in_dictionary() {
        for lemma in [None, Some("null"), Some("NULL word")] {
            let err = resolve_translation(&Dictionary { lemma }, "qwzx", None)
                .await
                .unwrap_err();
            assert!(matches!(err, LookupError::NotInDictionary { .. }));
        }
    }

    #[tokio::test]
    async fn test_long_text_is_translated_whole() {
        let store = Store::default();
        let outcome = lookup(&Dictionary { lemma: None }, &store, "the cat sat down", None)
            .await
            .unwrap();
        assert!(matches!(outcome.translation, Translation::Text(ref t) if t.text == "the cat sat down"));
        assert!(outcome.existing.is_empty());
        assert!(store.calls.borrow().is_empty());
        assert!(matches!(save(&store, &outcome).await, Err(LookupError::NothingToSave)));
    }

    #[tokio::test]
    async fn test_each_save_adds_a_record() {
        let store = Store::default();
        let dict = Dictionary { lemma: Some("run") };

        let first = lookup(&dict, &store, "running", Some("I am [[running]] home."))
            .await
            .unwrap();
        assert_eq!(save(&store, &first).await.unwrap(), SaveAction::Created);

        let second = lookup(&dict, &store, "ran", Some("She [[ran]] away."))
            .await
            .unwrap();
        assert_eq!(second.existing.len(), 1);
        assert_eq!(save(&store, &second).await.unwrap(), SaveAction::Created);

        let records = store.records.borrow();
        let saved: Vec<_> = records
            .iter()
            .map(|r| (r.vocabulary.as_str(), r.example_sentences.as_str()))
            .collect();
        assert_eq!(
            saved,
            [("running", "I am [[running]] home."), ("ran", "She [[ran]] away.")]
        );
        assert_eq!(
            store.calls.borrow().as_slice(),
            ["search run true", "create running", "search run true", "create ran"]
        );
    }

    #[tokio::test]
    async fn test_update_existing_edits_one_record() {
        let store = Store::default();
        let dict = Dictionary { lemma: Some("run") };
        for text in ["run", "ran"] {
            let outcome = lookup(&dict, &store, text, None).await.unwrap();
            save(&store, &outcome).await.unwrap();
        }

        let outcome = lookup(&dict, &store, "run", None).await.unwrap();
        assert_eq!(outcome.existing.len(), 2);
        let mut edited = outcome.existing[1].clone();
        edited.translated_vi = "đã chạy".into();
        assert_eq!(
            update_existing(&store, &outcome, "r1", &edited).await.unwrap(),
            SaveAction::Updated { id: "r1".into() }
        );

        let records = store.records.borrow();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].translated_vi, "chạy");
        assert_eq!(records[1].translated_vi, "đã chạy");
        drop(records);

        let err = update_existing(&store, &outcome, "r9", &edited).await.unwrap_err();
        assert!(matches!(err, LookupError::UnknownRecord { ref id } if id == "r9"));
    }
}
