//! HTTP client for the external knowledge and project services
//!
//! The bridge does no storage or retrieval of its own: RAG queries,
//! knowledge storage and project/task management are all forwarded to the
//! API service over HTTP. The two traits exist so tools can be exercised
//! against mocks.

use crate::config::ServicesConfig;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::{Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Reachability of the dependent services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub api_service: bool,
    pub agents_service: bool,
}

/// A document to store in the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreKnowledgeRequest {
    pub content: String,
    pub title: String,
    pub source_type: String,
    pub metadata: Map<String, Value>,
}

/// Answer to a store request
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StoredDocument {
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProject {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub project_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// Partial task update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assignee.is_none()
    }
}

/// Knowledge base and RAG operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgeService: Send + Sync {
    /// Probe the dependent services
    async fn health_check(&self) -> Result<ServiceHealth>;

    async fn store_knowledge(&self, request: StoreKnowledgeRequest) -> Result<StoredDocument>;

    async fn search_knowledge(&self, query: String, max_results: usize) -> Result<Value>;

    async fn rag_query(
        &self,
        query: String,
        source: Option<String>,
        match_count: usize,
    ) -> Result<Value>;

    async fn search_code_examples(
        &self,
        query: String,
        source_id: Option<String>,
        match_count: usize,
    ) -> Result<Value>;

    async fn list_sources(&self) -> Result<Value>;
}

/// Project and task management operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn list_projects(&self) -> Result<Value>;

    async fn get_project(&self, project_id: String) -> Result<Value>;

    async fn create_project(&self, project: NewProject) -> Result<Value>;

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Value>;

    async fn create_task(&self, task: NewTask) -> Result<Value>;

    async fn update_task(&self, task_id: String, update: TaskUpdate) -> Result<Value>;
}

static SHARED: OnceCell<Arc<ServiceClient>> = OnceCell::new();

/// reqwest-backed implementation of both service traits
#[derive(Debug)]
pub struct ServiceClient {
    api_url: String,
    agents_url: String,
    timeout: Duration,
    http: OnceCell<reqwest::Client>,
}

impl ServiceClient {
    pub fn new(config: &ServicesConfig) -> Self {
        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            agents_url: config.agents_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            http: OnceCell::new(),
        }
    }

    /// Process-wide client; the first caller's configuration wins
    pub fn shared(config: &ServicesConfig) -> Arc<ServiceClient> {
        SHARED
            .get_or_init(|| Arc::new(ServiceClient::new(config)))
            .clone()
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn http(&self) -> Result<&reqwest::Client> {
        self.http.get_or_try_init(|| {
            debug!("Building HTTP client with {:?} timeout", self.timeout);
            reqwest::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(BridgeError::Http)
        })
    }

    fn api_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.api_url, path);
        Ok(self.http()?.request(method, url))
    }

    /// Request for `/api/<collection>/<id>`; the id is a single
    /// percent-encoded path segment, so `/`, `..` and `?` stay inside it
    fn api_item_request(
        &self,
        method: Method,
        collection: &str,
        id: &str,
    ) -> Result<RequestBuilder> {
        // dot segments are dropped by the URL builder and would address the collection
        if matches!(id, "" | "." | "..") {
            return Err(BridgeError::InvalidParams(format!(
                "Invalid {} id: {:?}",
                collection, id
            )));
        }
        let mut url = Url::parse(&self.api_url).map_err(|e| {
            BridgeError::Validation(format!("Invalid API URL {}: {}", self.api_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                BridgeError::Validation(format!("API URL cannot be a base: {}", self.api_url))
            })?
            .pop_if_empty()
            .extend(["api", collection, id]);
        Ok(self.http()?.request(method, url))
    }

    /// Send a request and decode its JSON body; non-2xx becomes Upstream
    async fn send_json(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn is_reachable(&self, url: String) -> bool {
        let client = match self.http() {
            Ok(client) => client,
            Err(_) => return false,
        };
        match client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Health probe {} failed: {}", url, e);
                false
            }
        }
    }
}

#[async_trait]
impl KnowledgeService for ServiceClient {
    async fn health_check(&self) -> Result<ServiceHealth> {
        // surfaces client construction failures; probe errors count as down
        self.http()?;
        let (api_service, agents_service) = tokio::join!(
            self.is_reachable(format!("{}/health", self.api_url)),
            self.is_reachable(format!("{}/health", self.agents_url)),
        );
        Ok(ServiceHealth {
            api_service,
            agents_service,
        })
    }

    async fn store_knowledge(&self, request: StoreKnowledgeRequest) -> Result<StoredDocument> {
        let value = self
            .send_json(
                self.api_request(Method::POST, "/api/knowledge/store")?
                    .json(&request),
            )
            .await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    async fn search_knowledge(&self, query: String, max_results: usize) -> Result<Value> {
        self.send_json(
            self.api_request(Method::POST, "/api/knowledge/search")?
                .json(&json!({ "query": query, "max_results": max_results })),
        )
        .await
    }

    async fn rag_query(
        &self,
        query: String,
        source: Option<String>,
        match_count: usize,
    ) -> Result<Value> {
        self.send_json(
            self.api_request(Method::POST, "/api/rag/query")?.json(&json!({
                "query": query,
                "source": source,
                "match_count": match_count,
            })),
        )
        .await
    }

    async fn search_code_examples(
        &self,
        query: String,
        source_id: Option<String>,
        match_count: usize,
    ) -> Result<Value> {
        self.send_json(
            self.api_request(Method::POST, "/api/rag/code-examples")?
                .json(&json!({
                    "query": query,
                    "source_id": source_id,
                    "match_count": match_count,
                })),
        )
        .await
    }

    async fn list_sources(&self) -> Result<Value> {
        self.send_json(self.api_request(Method::GET, "/api/rag/sources")?)
            .await
    }
}

#[async_trait]
impl ProjectService for ServiceClient {
    async fn list_projects(&self) -> Result<Value> {
        self.send_json(self.api_request(Method::GET, "/api/projects")?)
            .await
    }

    async fn get_project(&self, project_id: String) -> Result<Value> {
        self.send_json(self.api_item_request(Method::GET, "projects", &project_id)?)
            .await
    }

    async fn create_project(&self, project: NewProject) -> Result<Value> {
        self.send_json(
            self.api_request(Method::POST, "/api/projects")?
                .json(&project),
        )
        .await
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Value> {
        let mut query = Vec::new();
        if let Some(project_id) = filter.project_id {
            query.push(("project_id", project_id));
        }
        if let Some(status) = filter.status {
            query.push(("status", status));
        }
        self.send_json(
            self.api_request(Method::GET, "/api/tasks")?
                .query(&query),
        )
        .await
    }

    async fn create_task(&self, task: NewTask) -> Result<Value> {
        self.send_json(self.api_request(Method::POST, "/api/tasks")?.json(&task))
            .await
    }

    async fn update_task(&self, task_id: String, update: TaskUpdate) -> Result<Value> {
        self.send_json(
            self.api_item_request(Method::PUT, "tasks", &task_id)?
                .json(&update),
        )
        .await
    }
}
