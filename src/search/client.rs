//! HTTP client for Elasticsearch / OpenSearch

use crate::config::ElasticsearchConfig;
use crate::metrics::STORE_REQUESTS_TOTAL;
use crate::models::{ConversationDocument, MessageDocument};
use crate::search::error::{SearchError, SearchResult};
use crate::search::store::{BulkSummary, ClusterHealth, DocumentIndexer, IndexAdmin, SearchBackend};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

const ADD_MESSAGE_SCRIPT: &str = "if (ctx._source.messages == null) { ctx._source.messages = [] } \
     ctx._source.messages.add(params.message)";

const UPDATE_MESSAGE_SCRIPT: &str = "if (ctx._source.messages != null) { \
     for (int i = 0; i < ctx._source.messages.size(); i++) { \
     if (ctx._source.messages[i].id == params.message_id) { \
     ctx._source.messages[i] = params.message; break } } }";

const REMOVE_MESSAGE_SCRIPT: &str = "if (ctx._source.messages != null) { \
     ctx._source.messages.removeIf(m -> m.id == params.message_id) }";

/// Thin client over the engine's REST API. Cloning is cheap and clones share
/// the connection pool.
#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl ElasticsearchClient {
    /// Create a client for the first configured host
    pub fn new(config: &ElasticsearchConfig) -> SearchResult<Self> {
        let host = config
            .hosts
            .first()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| {
                SearchError::InvalidConfiguration("at least one elasticsearch host is required".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e)))?;

        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user.clone(), pass.clone())),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.credentials {
            Some((user, pass)) => builder.basic_auth(user, Some(pass)),
            None => builder,
        }
    }

    /// Send a request, recording the outcome per operation
    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> SearchResult<Response> {
        match builder.send().await {
            Ok(response) => {
                let label = if response.status().is_success() { "success" } else { "error" };
                STORE_REQUESTS_TOTAL.with_label_values(&[operation, label]).inc();
                Ok(response)
            }
            Err(e) => {
                STORE_REQUESTS_TOTAL.with_label_values(&[operation, "error"]).inc();
                error!(operation, error = %e, "Document store request failed");
                Err(e.into())
            }
        }
    }

    /// Send a request and turn any non-2xx status into an error
    async fn send_checked(&self, operation: &'static str, builder: RequestBuilder) -> SearchResult<Response> {
        let response = self.send(operation, builder).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(operation, status = status.as_u16(), "Document store returned an error status");
        Err(SearchError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// `HEAD` request mapping 200 to true and 404 to false
    async fn head_exists(&self, operation: &'static str, path: &str) -> SearchResult<bool> {
        let response = self.send(operation, self.request(Method::HEAD, path)).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(SearchError::Status {
                status: s.as_u16(),
                body: String::new(),
            }),
        }
    }

    /// Cluster information from `GET /`
    pub async fn info(&self) -> SearchResult<Value> {
        let response = self.send_checked("info", self.request(Method::GET, "/")).await?;
        Ok(response.json().await?)
    }

    async fn update_script(
        &self,
        operation: &'static str,
        index: &str,
        conversation_id: Uuid,
        source: &str,
        params: Value,
    ) -> SearchResult<()> {
        let body = json!({
            "script": {
                "source": source,
                "lang": "painless",
                "params": params
            }
        });

        let path = format!("/{}/_update/{}?refresh=true", index, conversation_id);
        self.send_checked(operation, self.request(Method::POST, &path).json(&body))
            .await
            .map_err(|e| indexing_error(e, conversation_id))?;

        debug!(operation, conversation_id = %conversation_id, "Applied message update script");
        Ok(())
    }
}

fn indexing_error(err: SearchError, id: Uuid) -> SearchError {
    match err {
        SearchError::Status { status, body } => {
            SearchError::IndexingFailed(format!("{} (status {}): {}", id, status, body))
        }
        other => other,
    }
}

/// Newline-delimited bulk body: an action line then a source line per document
pub fn bulk_body(index: &str, docs: &[ConversationDocument]) -> SearchResult<String> {
    let mut body = String::new();
    for doc in docs {
        let action = json!({ "index": { "_index": index, "_id": doc.id.to_string() } });
        body.push_str(&serde_json::to_string(&action).map_err(|e| SearchError::Serialization(e.to_string()))?);
        body.push('\n');
        body.push_str(&serde_json::to_string(doc).map_err(|e| SearchError::Serialization(e.to_string()))?);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

fn summarize_bulk(response: BulkResponse) -> BulkSummary {
    let mut summary = BulkSummary::default();
    for item in response.items.iter().flat_map(|entry| entry.values()) {
        if item.error.is_some() || item.status >= 300 {
            summary.failed += 1;
            let reason = item
                .error
                .as_ref()
                .and_then(|e| e.get("reason"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            summary
                .errors
                .push(format!("{}: {}", item.id.as_deref().unwrap_or("<none>"), reason));
        } else {
            summary.indexed += 1;
        }
    }
    if response.errors && summary.failed == 0 {
        summary.failed = 1;
        summary.errors.push("bulk response flagged errors".to_string());
    }
    summary
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn execute_query(&self, index: &str, body: &Value) -> SearchResult<Value> {
        let path = format!("/{}/_search", index);
        let response = self
            .send_checked("search", self.request(Method::POST, &path).json(body))
            .await
            .map_err(|e| match e {
                SearchError::Status { status: 404, .. } => SearchError::IndexNotFound(index.to_string()),
                other => other,
            })?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentIndexer for ElasticsearchClient {
    async fn index_document(&self, index: &str, doc: &ConversationDocument) -> SearchResult<()> {
        let path = format!("/{}/_doc/{}?refresh=true", index, doc.id);
        self.send_checked("index", self.request(Method::PUT, &path).json(doc))
            .await
            .map_err(|e| indexing_error(e, doc.id))?;

        debug!(conversation_id = %doc.id, index, "Indexed conversation");
        Ok(())
    }

    async fn update_document(&self, index: &str, doc: &ConversationDocument) -> SearchResult<()> {
        let body = json!({
            "doc": {
                "id": doc.id,
                "user_id": doc.user_id,
                "title": doc.title,
                "provider": doc.provider,
                "model": doc.model,
                "source_id": doc.source_id,
                "source_title": doc.source_title,
                "created_at": doc.created_at,
                "updated_at": doc.updated_at
            }
        });

        let path = format!("/{}/_update/{}?refresh=true", index, doc.id);
        self.send_checked("update", self.request(Method::POST, &path).json(&body))
            .await
            .map_err(|e| indexing_error(e, doc.id))?;

        debug!(conversation_id = %doc.id, index, "Updated conversation");
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: Uuid) -> SearchResult<()> {
        let path = format!("/{}/_doc/{}?refresh=true", index, id);
        self.send_checked("delete", self.request(Method::DELETE, &path))
            .await
            .map_err(|e| indexing_error(e, id))?;

        debug!(conversation_id = %id, index, "Deleted conversation");
        Ok(())
    }

    async fn bulk_index(&self, index: &str, docs: &[ConversationDocument]) -> SearchResult<BulkSummary> {
        if docs.is_empty() {
            return Ok(BulkSummary::default());
        }

        let body = bulk_body(index, docs)?;
        let response = self
            .send_checked(
                "bulk",
                self.request(Method::POST, "/_bulk?refresh=true")
                    .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                    .body(body),
            )
            .await?;

        let summary = summarize_bulk(response.json().await?);
        if summary.has_failures() {
            warn!(
                index,
                indexed = summary.indexed,
                failed = summary.failed,
                "Bulk request had failed items"
            );
        } else {
            debug!(index, indexed = summary.indexed, "Bulk indexed conversations");
        }
        Ok(summary)
    }

    async fn document_exists(&self, index: &str, id: Uuid) -> SearchResult<bool> {
        self.head_exists("exists", &format!("/{}/_doc/{}", index, id)).await
    }

    async fn add_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message: &MessageDocument,
    ) -> SearchResult<()> {
        self.update_script(
            "add_message",
            index,
            conversation_id,
            ADD_MESSAGE_SCRIPT,
            json!({ "message": message }),
        )
        .await
    }

    async fn update_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message: &MessageDocument,
    ) -> SearchResult<()> {
        self.update_script(
            "update_message",
            index,
            conversation_id,
            UPDATE_MESSAGE_SCRIPT,
            json!({ "message_id": message.id.to_string(), "message": message }),
        )
        .await
    }

    async fn remove_message(
        &self,
        index: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> SearchResult<()> {
        self.update_script(
            "remove_message",
            index,
            conversation_id,
            REMOVE_MESSAGE_SCRIPT,
            json!({ "message_id": message_id.to_string() }),
        )
        .await
    }
}

#[async_trait]
impl IndexAdmin for ElasticsearchClient {
    async fn ping(&self) -> SearchResult<bool> {
        let response = self.send("ping", self.request(Method::HEAD, "/")).await?;
        Ok(response.status().is_success())
    }

    async fn cluster_health(&self) -> SearchResult<ClusterHealth> {
        let response = self
            .send_checked("cluster_health", self.request(Method::GET, "/_cluster/health"))
            .await?;
        Ok(response.json().await?)
    }

    async fn index_exists(&self, index: &str) -> SearchResult<bool> {
        self.head_exists("index_exists", &format!("/{}", index)).await
    }

    async fn create_index(&self, index: &str, body: &Value) -> SearchResult<()> {
        self.send_checked("create_index", self.request(Method::PUT, &format!("/{}", index)).json(body))
            .await
            .map_err(|e| match e {
                SearchError::Status { status, body } => {
                    SearchError::IndexInitFailed(format!("{} (status {}): {}", index, status, body))
                }
                other => other,
            })?;
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> SearchResult<()> {
        self.send_checked("delete_index", self.request(Method::DELETE, &format!("/{}", index)))
            .await
            .map_err(|e| match e {
                SearchError::Status { status: 404, .. } => SearchError::IndexNotFound(index.to_string()),
                other => other,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_a_host() {
        let config = ElasticsearchConfig {
            hosts: vec![],
            ..Default::default()
        };
        assert!(matches!(
            ElasticsearchClient::new(&config),
            Err(SearchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = ElasticsearchConfig {
            hosts: vec!["http://localhost:9200/".to_string()],
            ..Default::default()
        };
        let client = ElasticsearchClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9200");
    }

    #[test]
    fn test_bulk_body_is_ndjson() {
        let docs = vec![
            ConversationDocument::new(Uuid::new_v4(), "one"),
            ConversationDocument::new(Uuid::new_v4(), "two"),
        ];
        let body = bulk_body("conversations", &docs).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));

        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "conversations");
        assert_eq!(action["index"]["_id"], docs[0].id.to_string());

        let source: ConversationDocument = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(source.title, "two");
    }

    #[test]
    fn test_summarize_bulk() {
        let response: BulkResponse = serde_json::from_value(json!({
            "took": 3,
            "errors": true,
            "items": [
                { "index": { "_id": "a", "status": 201 } },
                { "index": { "_id": "b", "status": 400, "error": { "reason": "mapper_parsing_exception" } } }
            ]
        }))
        .unwrap();

        let summary = summarize_bulk(response);
        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors, vec!["b: mapper_parsing_exception"]);
    }
}
