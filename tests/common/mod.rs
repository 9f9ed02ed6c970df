//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use learnbridge_core::{
    config::BridgeConfig,
    error::{BridgeError, Result},
    register_modules,
    services::{
        KnowledgeService, NewProject, NewTask, ProjectService, ServiceHealth,
        StoreKnowledgeRequest, StoredDocument, TaskFilter, TaskUpdate,
    },
    Dispatcher, ServerContext,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// In-memory stand-in for the knowledge and project services
#[derive(Default)]
pub struct FakeServices {
    pub stored: Mutex<Vec<StoreKnowledgeRequest>>,
    pub fail_store: bool,
}

impl FakeServices {
    pub fn stored_titles(&self) -> Vec<String> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.title.clone())
            .collect()
    }
}

#[async_trait]
impl KnowledgeService for FakeServices {
    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth {
            api_service: true,
            agents_service: true,
        })
    }

    async fn store_knowledge(&self, request: StoreKnowledgeRequest) -> Result<StoredDocument> {
        if self.fail_store {
            return Err(BridgeError::Upstream {
                status: 503,
                body: "knowledge base unavailable".to_string(),
            });
        }
        let mut stored = self.stored.lock().unwrap();
        stored.push(request);
        Ok(StoredDocument {
            document_id: Some(format!("doc-{}", stored.len())),
        })
    }

    async fn search_knowledge(&self, query: String, max_results: usize) -> Result<Value> {
        let stored = self.stored.lock().unwrap();
        let results: Vec<Value> = stored
            .iter()
            .filter(|request| request.content.contains(query.split_whitespace().next().unwrap_or("")))
            .take(max_results)
            .map(|request| {
                json!({
                    "title": request.title,
                    "content": request.content,
                    "score": 0.9,
                    "metadata": request.metadata,
                })
            })
            .collect();
        Ok(json!({ "results": results }))
    }

    async fn rag_query(
        &self,
        query: String,
        _source: Option<String>,
        match_count: usize,
    ) -> Result<Value> {
        Ok(json!({ "query": query, "match_count": match_count, "results": [] }))
    }

    async fn search_code_examples(
        &self,
        query: String,
        _source_id: Option<String>,
        _match_count: usize,
    ) -> Result<Value> {
        Ok(json!({ "query": query, "results": [] }))
    }

    async fn list_sources(&self) -> Result<Value> {
        Ok(json!({ "sources": [{"source_id": "docs.rs"}] }))
    }
}

#[async_trait]
impl ProjectService for FakeServices {
    async fn list_projects(&self) -> Result<Value> {
        Ok(json!([{ "id": "p1", "title": "learnbridge" }]))
    }

    async fn get_project(&self, project_id: String) -> Result<Value> {
        Ok(json!({ "project": { "id": project_id } }))
    }

    async fn create_project(&self, project: NewProject) -> Result<Value> {
        Ok(json!({ "project": { "id": "p2", "title": project.title } }))
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Value> {
        Ok(json!({ "tasks": [], "project_id": filter.project_id }))
    }

    async fn create_task(&self, task: NewTask) -> Result<Value> {
        Ok(json!({ "task": { "id": "t1", "title": task.title } }))
    }

    async fn update_task(&self, task_id: String, update: TaskUpdate) -> Result<Value> {
        Ok(json!({ "task": { "id": task_id, "status": update.status } }))
    }
}

/// A dispatcher over fake services whose knowledge directory lives in a temp dir
pub struct TestServer {
    pub dispatcher: Dispatcher,
    pub services: Arc<FakeServices>,
    pub knowledge_dir: TempDir,
}

pub fn create_test_server() -> TestServer {
    create_test_server_with(FakeServices::default())
}

pub fn create_test_server_with(services: FakeServices) -> TestServer {
    let knowledge_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = BridgeConfig::default();
    config.server.port = Some(8051);
    config.storage.knowledge_dir = knowledge_dir.path().to_path_buf();

    let services = Arc::new(services);
    let registry = register_modules(&config.modules).expect("Failed to register modules");
    let ctx = ServerContext::new(config, services.clone(), services.clone());

    TestServer {
        dispatcher: Dispatcher::new(Arc::new(registry), Arc::new(ctx)),
        services,
        knowledge_dir,
    }
}
