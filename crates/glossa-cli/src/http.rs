//! HTTP collaborators.
//!
//! The term service takes each request as a JSON body at `{base}/{op}`. The
//! vocabulary store is a plain REST collection at `{base}/vocabulary`.

use std::time::Duration;

use glossa_core::{
    ResolutionError, ServiceRequest, TermService, VocabularyError, VocabularyLookup,
    VocabularyRecord,
};
use serde::Deserialize;
use serde_json::Value;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to the default HTTP client");
            reqwest::Client::new()
        })
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Read a response body as JSON, turning non-2xx statuses into an error message.
async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("HTTP error {status}: {body}"));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| format!("invalid JSON response: {e}"))
}

pub struct HttpTermService {
    client: reqwest::Client,
    base: String,
}

impl HttpTermService {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: client(),
            base: base.into(),
        }
    }
}

impl TermService for HttpTermService {
    async fn call(&self, request: ServiceRequest) -> Result<Value, ResolutionError> {
        let url = endpoint(&self.base, request.op());
        tracing::debug!(%url, "term service request");
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ResolutionError::upstream(format!("HTTP request failed: {e}")))?;
        read_json(response).await.map_err(ResolutionError::upstream)
    }
}

/// Search results may arrive bare or paged as `{ "data": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchPage {
    Bare(Vec<VocabularyRecord>),
    Paged { data: Vec<VocabularyRecord> },
}

pub struct HttpVocabulary {
    client: reqwest::Client,
    base: String,
}

impl HttpVocabulary {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: client(),
            base: base.into(),
        }
    }

    fn collection(&self) -> String {
        endpoint(&self.base, "vocabulary")
    }
}

impl VocabularyLookup for HttpVocabulary {
    async fn search(&self, term: &str, exact: bool) -> Result<Vec<VocabularyRecord>, VocabularyError> {
        let response = self
            .client
            .get(self.collection())
            .query(&[("search", term), ("isExact", if exact { "true" } else { "false" })])
            .send()
            .await
            .map_err(|e| VocabularyError(format!("HTTP request failed: {e}")))?;
        let page: SearchPage = read_json(response).await.map_err(VocabularyError)?;
        Ok(match page {
            SearchPage::Bare(records) | SearchPage::Paged { data: records } => records,
        })
    }

    async fn create(&self, record: &VocabularyRecord) -> Result<(), VocabularyError> {
        let response = self
            .client
            .post(self.collection())
            .json(record)
            .send()
            .await
            .map_err(|e| VocabularyError(format!("HTTP request failed: {e}")))?;
        read_json::<Value>(response).await.map_err(VocabularyError)?;
        Ok(())
    }

    async fn update(&self, id: &str, record: &VocabularyRecord) -> Result<(), VocabularyError> {
        let url = endpoint(&self.collection(), id);
        let response = self
            .client
            .put(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| VocabularyError(format!("HTTP request failed: {e}")))?;
        read_json::<Value>(response).await.map_err(VocabularyError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_once() {
        assert_eq!(endpoint("http://localhost:3000/", "resolve-terms"), "http://localhost:3000/resolve-terms");
        assert_eq!(endpoint("http://localhost:3000", "vocabulary"), "http://localhost:3000/vocabulary");
    }

    #[test]
    fn test_search_page_shapes() {
        let paged: SearchPage =
            serde_json::from_str(r#"{"data":[{"_id":"a1","vocabulary":"run","translatedVi":"chạy"}]}"#)
                .unwrap();
        let SearchPage::Paged { data } = paged else {
            panic!("expected a paged response");
        };
        assert_eq!(data[0].id.as_deref(), Some("a1"));

        let bare: SearchPage = serde_json::from_str("[]").unwrap();
        assert!(matches!(bare, SearchPage::Bare(records) if records.is_empty()));
    }
}
