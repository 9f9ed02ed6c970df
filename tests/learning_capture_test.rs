//! Learning capture from tool call to markdown file and knowledge base

mod common;

use common::{create_test_server, create_test_server_with, FakeServices};
use learnbridge_core::transport::http::handle_bridge_request;
use learnbridge_core::KnowledgeStore;
use serde_json::{json, Value};
use std::path::Path;

async fn call(server: &common::TestServer, method: &str, params: Value) -> Value {
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params}).to_string();
    let response = handle_bridge_request(&server.dispatcher, body.as_bytes()).await;
    assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
    response.result.unwrap()
}

#[tokio::test]
async fn test_capture_learning_writes_file_and_stores_entry() {
    let server = create_test_server();

    let result = call(
        &server,
        "capture_learning",
        json!({
            "problem_description": "Connection timeout when calling the payments API",
            "investigation_steps": ["Checked network", "Measured latency", "Raised pool size"],
            "solution_applied": "Raised the client timeout and enabled keep-alive",
            "outcome": "Requests complete in under a second",
            "project_context": "checkout",
            "additional_context": {"ticket": "OPS-12"}
        }),
    )
    .await;

    assert_eq!(result["success"], true);
    assert_eq!(result["entries_created"], 1);
    let session_id = result["session_id"].as_str().unwrap();
    assert!(session_id.starts_with("external-checkout-"));

    let markdown_file = result["markdown_file"].as_str().unwrap();
    assert!(Path::new(markdown_file).starts_with(server.knowledge_dir.path()));
    let markdown = std::fs::read_to_string(markdown_file).unwrap();
    assert!(markdown.contains(session_id));
    assert!(markdown.contains("checkout"));

    let storage = result["knowledge_storage"].as_array().unwrap();
    assert_eq!(storage[0]["status"], "stored");
    assert_eq!(storage[0]["document_id"], "doc-1");

    let stored = server.services.stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].source_type, "learning_capture");
    assert_eq!(stored[0].metadata["project_context"], "checkout");
    assert_eq!(stored[0].metadata["ticket"], "OPS-12");
    assert_eq!(stored[0].metadata["trigger"], "performance");
}

#[tokio::test]
async fn test_capture_survives_knowledge_base_outage() {
    let server = create_test_server_with(FakeServices {
        fail_store: true,
        ..Default::default()
    });

    let result = call(
        &server,
        "capture_learning",
        json!({"problem_description": "Build failed after dependency upgrade"}),
    )
    .await;

    assert_eq!(result["success"], true);
    assert_eq!(result["knowledge_storage"][0]["status"], "failed");
    assert!(result["knowledge_storage"][0]["error"]
        .as_str()
        .unwrap()
        .contains("knowledge base unavailable"));
    assert!(Path::new(result["markdown_file"].as_str().unwrap()).exists());
}

#[tokio::test]
async fn test_session_capture_then_search() {
    let server = create_test_server();

    let transcript = "Started the migration.\n\
                      Error: relation \"users\" does not exist in the test database\n\
                      Tried rerunning the seed script.\n\
                      Fixed by running migrations before seeding the database\n";

    let result = call(
        &server,
        "capture_session_learning",
        json!({
            "session_content": transcript,
            "project_name": "accounts",
            "tags": ["postgres", "migrations"]
        }),
    )
    .await;

    assert_eq!(result["success"], true);
    assert_eq!(result["experiences_found"], 1);
    assert!(result["session_id"]
        .as_str()
        .unwrap()
        .starts_with("session-accounts-"));

    {
        let stored = server.services.stored.lock().unwrap();
        assert_eq!(stored[0].source_type, "session_capture");
        assert!(stored[0].content.contains("**Tags**: postgres, migrations"));
        assert!(stored[0].content.contains("## Session Context"));
    }

    let found = call(
        &server,
        "search_learning",
        json!({"query": "Session", "project_filter": "accounts", "max_results": 3}),
    )
    .await;
    assert_eq!(found["success"], true);
    assert_eq!(found["query"], "Session");
    assert_eq!(found["results_count"], 1);
    assert!(found["results"][0]["content"].as_str().unwrap().chars().count() <= 500);
}

#[tokio::test]
async fn test_saved_files_can_be_listed_and_loaded() {
    let server = create_test_server();

    for problem in ["Null pointer exception in parser", "Slow query on orders table"] {
        let result = call(
            &server,
            "capture_learning",
            json!({"problem_description": problem, "project_context": "shop"}),
        )
        .await;
        assert_eq!(result["success"], true);
    }

    let store = KnowledgeStore::new(server.knowledge_dir.path());
    let files = store.list().await.unwrap();
    assert_eq!(files.len(), 2);

    let mut triggers = Vec::new();
    for file in &files {
        let log = store.load(file).await.unwrap();
        assert_eq!(log.project, "shop");
        assert_eq!(log.entries.len(), 1);
        triggers.push(log.entries[0].trigger.clone());
    }
    triggers.sort();
    assert_eq!(triggers, vec!["error", "performance"]);
}
