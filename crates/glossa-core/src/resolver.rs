//! Term resolution boundary.
//!
//! The term service is an opaque, asynchronous, fallible collaborator that
//! speaks JSON. [`TermService`] is the raw transport; [`SchemaResolver`]
//! validates every payload into typed records before anything downstream
//! sees it.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ResolutionError;
use crate::types::ResolvedTerm;

/// Request for the terms of a selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermQuery {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_marked: Option<String>,
    /// Subject area the reader is in, e.g. "kubernetes".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<SmolStr>,
}

impl TermQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context_marked: Option<impl Into<String>>) -> Self {
        self.context_marked = context_marked.map(Into::into);
        self
    }

    pub fn with_topic(mut self, topic: Option<impl Into<SmolStr>>) -> Self {
        self.topic = topic.map(Into::into);
        self
    }
}

/// One call to the term service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum ServiceRequest {
    ResolveTerms(TermQuery),
    #[serde(rename_all = "camelCase")]
    OriginalVocabulary {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context_marked: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TranslateWord {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context_marked: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TranslateText {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context_marked: Option<String>,
    },
}

impl ServiceRequest {
    /// Operation name, also used as the endpoint path by HTTP transports.
    pub fn op(&self) -> &'static str {
        match self {
            ServiceRequest::ResolveTerms(_) => "resolve-terms",
            ServiceRequest::OriginalVocabulary { .. } => "original-vocabulary",
            ServiceRequest::TranslateWord { .. } => "translate-word",
            ServiceRequest::TranslateText { .. } => "translate-text",
        }
    }
}

/// Raw transport to the term service.
pub trait TermService {
    fn call(
        &self,
        request: ServiceRequest,
    ) -> impl Future<Output = Result<serde_json::Value, ResolutionError>>;
}

impl<S: TermService> TermService for &S {
    fn call(
        &self,
        request: ServiceRequest,
    ) -> impl Future<Output = Result<serde_json::Value, ResolutionError>> {
        (**self).call(request)
    }
}

/// Part of speech reported for a dictionary word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartOfSpeech {
    Verb,
    Noun,
    Adverb,
    Adjective,
    Pronoun,
    Conjunction,
    Preposition,
    Article,
    Interjection,
    Determiner,
    #[default]
    #[serde(other)]
    Other,
}

/// Dictionary information for a word or two-word phrase.
///
/// Asked without context the service supplies its own example sentence;
/// asked with context it translates that sentence instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyInfo {
    pub vocabulary_translated_vi: String,
    pub parts_of_speech: PartOfSpeech,
    pub pronunciation: String,
    pub definition_en: String,
    pub definition_vi: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentences: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentences_vi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentences_translated_vi: Option<String>,
}

/// Translation of a longer span.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextTranslation {
    pub text: String,
    pub translated_vi: String,
    /// Grammar notes, in markdown.
    pub grammar: String,
}

/// Typed view of the term service.
pub trait TermResolver {
    /// Terms of a selection, in service order.
    fn resolve_terms(
        &self,
        query: &TermQuery,
    ) -> impl Future<Output = Result<Vec<ResolvedTerm>, ResolutionError>>;

    /// Dictionary lemma of `text`, if the service knows one.
    fn original_vocabulary(
        &self,
        text: &str,
        context_marked: Option<&str>,
    ) -> impl Future<Output = Result<Option<SmolStr>, ResolutionError>>;

    fn translate_word(
        &self,
        text: &str,
        context_marked: Option<&str>,
    ) -> impl Future<Output = Result<VocabularyInfo, ResolutionError>>;

    fn translate_text(
        &self,
        text: &str,
        context_marked: Option<&str>,
    ) -> impl Future<Output = Result<TextTranslation, ResolutionError>>;
}

/// [`TermResolver`] over a raw [`TermService`], validating each response.
#[derive(Clone, Debug)]
pub struct SchemaResolver<S> {
    service: S,
}

impl<S: TermService> SchemaResolver<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

/// Terms may arrive bare or wrapped as `{ "words": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TermsPayload {
    Bare(Vec<ResolvedTerm>),
    Wrapped { words: Vec<ResolvedTerm> },
}

#[derive(Deserialize)]
struct LemmaPayload {
    word: Option<SmolStr>,
}

fn parse<T: DeserializeOwned>(what: &'static str, value: serde_json::Value) -> Result<T, ResolutionError> {
    serde_json::from_value(value).map_err(|source| {
        tracing::warn!(what, error = %source, "rejecting malformed service response");
        ResolutionError::Malformed { what, source }
    })
}

impl<S: TermService> TermResolver for SchemaResolver<S> {
    async fn resolve_terms(&self, query: &TermQuery) -> Result<Vec<ResolvedTerm>, ResolutionError> {
        let value = self
            .service
            .call(ServiceRequest::ResolveTerms(query.clone()))
            .await?;
        let terms = match parse::<TermsPayload>("terms", value)? {
            TermsPayload::Bare(terms) | TermsPayload::Wrapped { words: terms } => terms,
        };
        tracing::debug!(count = terms.len(), "resolved terms");
        Ok(terms)
    }

    async fn original_vocabulary(
        &self,
        text: &str,
        context_marked: Option<&str>,
    ) -> Result<Option<SmolStr>, ResolutionError> {
        let value = self
            .service
            .call(ServiceRequest::OriginalVocabulary {
                text: text.to_string(),
                context_marked: context_marked.map(str::to_string),
            })
            .await?;
        Ok(parse::<LemmaPayload>("lemma", value)?.word)
    }

    async fn translate_word(
        &self,
        text: &str,
        context_marked: Option<&str>,
    ) -> Result<VocabularyInfo, ResolutionError> {
        let value = self
            .service
            .call(ServiceRequest::TranslateWord {
                text: text.to_string(),
                context_marked: context_marked.map(str::to_string),
            })
            .await?;
        parse("vocabulary", value)
    }

    async fn translate_text(
        &self,
        text: &str,
        context_marked: Option<&str>,
    ) -> Result<TextTranslation, ResolutionError> {
        let value = self
            .service
            .call(ServiceRequest::TranslateText {
                text: text.to_string(),
                context_marked: context_marked.map(str::to_string),
            })
            .await?;
        parse("translation", value)
    }
}
