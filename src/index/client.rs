//! HTTP client for the remote search index.

use crate::index::types::{IndexBatchResponse, IndexError, UploadResult};
use crate::model::IndexRecord;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};

const API_VERSION: &str = "2023-11-01";

/// Seam through which batches reach the remote index.
///
/// The batch indexer only depends on this trait, so tests and alternative
/// backends substitute their own writer.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// Merge-or-upload a batch of records, returning one result per record.
    ///
    /// The call is idempotent by record id: re-submitting a batch replaces
    /// the same records rather than duplicating them.
    async fn merge_or_upload(
        &self,
        records: &[IndexRecord],
    ) -> Result<Vec<UploadResult>, IndexError>;
}

/// Lightweight HTTP client for the search index's document API.
pub struct SearchIndexClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) index_name: String,
    pub(crate) api_key: Option<String>,
}

impl SearchIndexClient {
    /// Construct a new client for one index.
    pub fn new(
        endpoint: &str,
        index_name: &str,
        api_key: Option<String>,
    ) -> Result<Self, IndexError> {
        let client = Client::builder()
            .user_agent("rag-ingest/0.1")
            .build()?;
        let base_url = normalize_base_url(endpoint).map_err(IndexError::InvalidUrl)?;

        tracing::debug!(
            url = %base_url,
            index = index_name,
            has_api_key = api_key.as_deref().map(|key| !key.is_empty()).unwrap_or(false),
            "Initialized search index HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            index_name: index_name.to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self
            .client
            .request(method, url)
            .query(&[("api-version", API_VERSION)]);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }
}

#[async_trait]
impl IndexWriter for SearchIndexClient {
    async fn merge_or_upload(
        &self,
        records: &[IndexRecord],
    ) -> Result<Vec<UploadResult>, IndexError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let actions: Vec<Value> = records
            .iter()
            .map(|record| {
                let mut value = serde_json::to_value(record)
                    .expect("index record serializes to a JSON object");
                value
                    .as_object_mut()
                    .expect("index record serializes to a JSON object")
                    .insert(
                        "@search.action".into(),
                        Value::String("mergeOrUpload".into()),
                    );
                value
            })
            .collect();

        let response = self
            .request(
                Method::POST,
                &format!("indexes/{}/docs/index", self.index_name),
            )
            .json(&json!({ "value": actions }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = IndexError::UnexpectedStatus { status, body };
            tracing::error!(index = %self.index_name, error = %error, "Batch upload failed");
            return Err(error);
        }

        let payload: IndexBatchResponse = response.json().await?;
        tracing::debug!(
            index = %self.index_name,
            records = records.len(),
            results = payload.value.len(),
            "Batch upload accepted"
        );
        Ok(payload.value)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn record(id: &str) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            content: "chunk text".into(),
            content_vector: vec![0.25; 4],
            document_id: "doc-1".into(),
            document_name: "doc.pdf".into(),
            document_url: "https://example.test/doc.pdf".into(),
            page_number: 1,
            chunk_index: 0,
            metadata: "{}".into(),
            organization_id: "org-1".into(),
            folder_id: "folder-1".into(),
        }
    }

    fn client(base_url: &str) -> SearchIndexClient {
        SearchIndexClient {
            client: Client::builder()
                .user_agent("rag-ingest-test")
                .build()
                .expect("client"),
            base_url: base_url.to_string(),
            index_name: "rag-index".into(),
            api_key: Some("secret".into()),
        }
    }

    #[tokio::test]
    async fn merge_or_upload_emits_actions_and_parses_results() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/indexes/rag-index/docs/index")
                    .query_param("api-version", API_VERSION)
                    .header("api-key", "secret")
                    .json_body_partial(
                        r#"{"value":[{"@search.action":"mergeOrUpload","id":"doc-1_chunk_0"}]}"#,
                    );
                then.status(200).json_body(serde_json::json!({
                    "value": [
                        { "key": "doc-1_chunk_0", "status": true, "errorMessage": null }
                    ]
                }));
            })
            .await;

        let results = client(&server.base_url())
            .merge_or_upload(&[record("doc-1_chunk_0")])
            .await
            .expect("upload succeeds");

        mock.assert();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "doc-1_chunk_0");
        assert!(results[0].succeeded);
        assert!(results[0].error_message.is_none());
    }

    #[tokio::test]
    async fn partial_rejections_are_surfaced_per_record() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/rag-index/docs/index");
                then.status(207).json_body(serde_json::json!({
                    "value": [
                        { "key": "a", "status": true },
                        { "key": "b", "status": false, "errorMessage": "vector dimension mismatch" }
                    ]
                }));
            })
            .await;

        let results = client(&server.base_url())
            .merge_or_upload(&[record("a"), record("b")])
            .await
            .expect("multi-status body parses");

        assert!(results[0].succeeded);
        assert!(!results[1].succeeded);
        assert_eq!(
            results[1].error_message.as_deref(),
            Some("vector dimension mismatch")
        );
    }

    #[tokio::test]
    async fn unexpected_status_becomes_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/rag-index/docs/index");
                then.status(503).body("throttled");
            })
            .await;

        let error = client(&server.base_url())
            .merge_or_upload(&[record("a")])
            .await
            .unwrap_err();

        match error {
            IndexError::UnexpectedStatus { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "throttled");
            }
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let results = client("http://127.0.0.1:1")
            .merge_or_upload(&[])
            .await
            .expect("empty batch is a no-op");
        assert!(results.is_empty());
    }
}
