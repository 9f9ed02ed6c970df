//! Learning capture tools
//!
//! External projects send debugging experiences here. Each capture is
//! turned into structured learning entries, written to a markdown session
//! log and pushed to the knowledge service for later retrieval.

use crate::context::ServerContext;
use crate::error::{BridgeError, Result};
use crate::mcp::registry::{parse_args, ToolDefinition, ToolModule};
use crate::metacognition::extract::{default_session_experience, extract_experiences};
use crate::metacognition::formatter::create_learning_entries;
use crate::metacognition::storage::StorageOutcome;
use crate::services::StoreKnowledgeRequest;
use crate::types::{DebuggingExperience, EntryVersion, LearningEntry, SessionData};
use crate::utils::string::{take_chars, truncate_at_char_boundary};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

pub const LEARNING_CAPTURE_SOURCE: &str = "learning_capture";
pub const SESSION_CAPTURE_SOURCE: &str = "session_capture";

/// Appended to searches so only captured learnings match
const LEARNING_SOURCE_FILTER: &str =
    "[source:learning_capture OR source:session_capture OR source:metacognition]";

/// Characters of transcript included in session documents
const TRANSCRIPT_PREVIEW_CHARS: usize = 1000;

/// Characters of content returned per search hit
const SEARCH_PREVIEW_CHARS: usize = 500;

pub struct LearningTools;

fn unknown() -> String {
    "unknown".to_string()
}

fn debugging() -> String {
    "debugging".to_string()
}

fn five() -> usize {
    5
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaptureLearningArgs {
    problem_description: String,
    #[serde(default)]
    investigation_steps: Option<Vec<String>>,
    #[serde(default)]
    solution_applied: Option<String>,
    #[serde(default)]
    outcome: Option<String>,
    #[serde(default = "unknown")]
    project_context: String,
    #[serde(default)]
    additional_context: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaptureSessionArgs {
    session_content: String,
    #[serde(default = "unknown")]
    project_name: String,
    #[serde(default = "debugging")]
    session_type: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchLearningArgs {
    query: String,
    #[serde(default)]
    project_filter: Option<String>,
    #[serde(default = "five")]
    max_results: usize,
}

#[async_trait]
impl ToolModule for LearningTools {
    fn name(&self) -> &'static str {
        "learning"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                "capture_learning",
                "Capture a debugging experience and store it in the knowledge base as a structured learning entry.",
                json!({
                    "type": "object",
                    "properties": {
                        "problem_description": {"type": "string", "description": "Description of the problem encountered"},
                        "investigation_steps": {"type": "array", "items": {"type": "string"}, "description": "Steps taken to investigate"},
                        "solution_applied": {"type": "string", "description": "The solution that was applied"},
                        "outcome": {"type": "string", "description": "The result of applying the solution"},
                        "project_context": {"type": "string", "default": "unknown", "description": "Name or context of the project"},
                        "additional_context": {"type": "object", "description": "Additional metadata stored with the entry"}
                    },
                    "required": ["problem_description"]
                }),
            ),
            ToolDefinition::new(
                "capture_session_learning",
                "Capture learning from a full session transcript, extracting debugging experiences automatically.",
                json!({
                    "type": "object",
                    "properties": {
                        "session_content": {"type": "string", "description": "Full session transcript or conversation"},
                        "project_name": {"type": "string", "default": "unknown"},
                        "session_type": {"type": "string", "default": "debugging", "description": "debugging, development or analysis"},
                        "tags": {"type": "array", "items": {"type": "string"}}
                    },
                    "required": ["session_content"]
                }),
            ),
            ToolDefinition::new(
                "search_learning",
                "Search captured debugging knowledge.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "Search query for debugging experiences"},
                        "project_filter": {"type": "string", "description": "Only return learnings from this project"},
                        "max_results": {"type": "integer", "default": 5}
                    },
                    "required": ["query"]
                }),
            ),
        ]
    }

    async fn call(&self, tool: &str, ctx: &ServerContext, args: Value) -> Result<Value> {
        match tool {
            "capture_learning" => capture_learning(ctx, parse_args(tool, args)?).await,
            "capture_session_learning" => {
                capture_session_learning(ctx, parse_args(tool, args)?).await
            }
            "search_learning" => search_learning(ctx, parse_args(tool, args)?).await,
            _ => Err(BridgeError::ToolNotFound(tool.to_string())),
        }
    }
}

fn non_empty(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn session_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

async fn capture_learning(ctx: &ServerContext, args: CaptureLearningArgs) -> Result<Value> {
    info!("Capturing learning for project: {}", args.project_context);

    let now = Local::now();
    let project = args.project_context;
    let session_id = format!("external-{}-{}", project, session_stamp(&now));
    let solution_applied = args.solution_applied.clone().unwrap_or_default();
    let additional_context = args.additional_context.unwrap_or_default();

    let experience = DebuggingExperience {
        problem_description: args.problem_description.clone(),
        investigation_steps: args
            .investigation_steps
            .filter(|steps| !steps.is_empty())
            .unwrap_or_else(|| {
                vec![
                    "Identified the problem".to_string(),
                    "Investigated potential causes".to_string(),
                    "Applied solution".to_string(),
                ]
            }),
        solution_applied: non_empty(args.solution_applied, "Solution applied to resolve the issue"),
        outcome: non_empty(args.outcome, "Issue resolved successfully"),
    };

    let mut session = SessionData::new(session_id.clone(), project.clone(), vec![experience]);
    session.timestamp = now.to_rfc3339();
    session.additional_context = additional_context.clone();

    let entries = create_learning_entries(&session, EntryVersion::V2);
    if entries.is_empty() {
        return Ok(json!({
            "success": false,
            "error": "Failed to create learning entries from provided data"
        }));
    }

    let markdown_file = match ctx.store.save(&entries, &session_id, &project).await {
        Ok(path) => path.display().to_string(),
        Err(e) => {
            error!("capture_learning failed: {}", e);
            return Ok(json!({
                "success": false,
                "error": format!("Failed to capture learning: {}", e)
            }));
        }
    };

    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in &entries {
        let (title, content) =
            capture_document(entry, &session, &args.problem_description, &solution_applied);

        let mut metadata = Map::new();
        metadata.insert("session_id".into(), json!(session_id));
        metadata.insert("entry_id".into(), json!(entry.id));
        metadata.insert("project_context".into(), json!(project));
        metadata.insert("trigger".into(), json!(entry.trigger));
        metadata.insert("timestamp".into(), json!(session.timestamp));
        metadata.insert("markdown_file".into(), json!(markdown_file));
        metadata.extend(additional_context.clone());

        let request = StoreKnowledgeRequest {
            content,
            title,
            source_type: LEARNING_CAPTURE_SOURCE.to_string(),
            metadata,
        };
        outcomes.push(store_entry(ctx, entry, request).await);
    }

    info!("Learning capture complete: {} entries", entries.len());
    Ok(json!({
        "success": true,
        "session_id": session_id,
        "entries_created": entries.len(),
        "markdown_file": markdown_file,
        "knowledge_storage": outcomes,
        "message": format!("Successfully captured learning from {}", project),
    }))
}

async fn capture_session_learning(ctx: &ServerContext, args: CaptureSessionArgs) -> Result<Value> {
    info!("Processing session content for project: {}", args.project_name);

    let mut experiences = extract_experiences(&args.session_content);
    if experiences.is_empty() {
        experiences.push(default_session_experience(&args.session_type));
    }
    let experiences_found = experiences.len();

    let now = Local::now();
    let project = args.project_name;
    let tags = args.tags.unwrap_or_default();
    let session_id = format!("session-{}-{}", project, session_stamp(&now));

    let mut session = SessionData::new(session_id.clone(), project.clone(), experiences);
    session.timestamp = now.to_rfc3339();
    session.session_type = Some(args.session_type.clone());
    session.tags = tags.clone();

    let entries = create_learning_entries(&session, EntryVersion::V2);
    let markdown_file = match ctx.store.save(&entries, &session_id, &project).await {
        Ok(path) => path.display().to_string(),
        Err(e) => {
            error!("capture_session_learning failed: {}", e);
            return Ok(json!({
                "success": false,
                "error": format!("Failed to capture session learning: {}", e)
            }));
        }
    };

    let header = [
        format!("# Session Learning: {}", project),
        format!("**Type**: {}", args.session_type),
        format!("**Session ID**: {}", session_id),
        format!(
            "**Tags**: {}",
            if tags.is_empty() { "none".to_string() } else { tags.join(", ") }
        ),
        String::new(),
        "## Session Context".to_string(),
        truncate_at_char_boundary(&args.session_content, TRANSCRIPT_PREVIEW_CHARS),
        String::new(),
    ]
    .join("\n");

    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in &entries {
        let title = format!(
            "Session Learning: {}",
            entry.title.as_deref().unwrap_or(&project)
        );

        let mut metadata = Map::new();
        metadata.insert("session_id".into(), json!(session_id));
        metadata.insert("project_name".into(), json!(project));
        metadata.insert("session_type".into(), json!(args.session_type));
        metadata.insert("tags".into(), json!(tags));
        metadata.insert("timestamp".into(), json!(session.timestamp));

        let request = StoreKnowledgeRequest {
            content: format!("{}\n{}", header, entry_summary(entry)),
            title,
            source_type: SESSION_CAPTURE_SOURCE.to_string(),
            metadata,
        };
        outcomes.push(store_entry(ctx, entry, request).await);
    }

    info!("Session learning captured: {} experiences", experiences_found);
    Ok(json!({
        "success": true,
        "session_id": session_id,
        "experiences_found": experiences_found,
        "entries_created": entries.len(),
        "markdown_file": markdown_file,
        "knowledge_storage": outcomes,
    }))
}

async fn search_learning(ctx: &ServerContext, args: SearchLearningArgs) -> Result<Value> {
    let mut search_query = args.query.clone();
    if let Some(filter) = &args.project_filter {
        search_query = format!("{} project:{}", search_query, filter);
    }
    search_query = format!("{} {}", search_query, LEARNING_SOURCE_FILTER);

    let response = match ctx
        .knowledge
        .search_knowledge(search_query, args.max_results)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            error!("search_learning failed: {}", e);
            return Ok(json!({
                "success": false,
                "error": format!("Search failed: {}", e)
            }));
        }
    };

    let results: Vec<Value> = response
        .get("results")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .map(|hit| {
                    let content = hit.get("content").and_then(Value::as_str).unwrap_or("");
                    json!({
                        "content": take_chars(content, SEARCH_PREVIEW_CHARS),
                        "title": hit.get("title").and_then(Value::as_str).unwrap_or(""),
                        "metadata": hit.get("metadata").cloned().unwrap_or_else(|| json!({})),
                        "score": hit.get("score").cloned().unwrap_or_else(|| json!(0)),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(json!({
        "success": true,
        "query": args.query,
        "project_filter": args.project_filter,
        "results_count": results.len(),
        "results": results,
    }))
}

async fn store_entry(
    ctx: &ServerContext,
    entry: &LearningEntry,
    request: StoreKnowledgeRequest,
) -> StorageOutcome {
    match ctx.knowledge.store_knowledge(request).await {
        Ok(stored) => StorageOutcome {
            entry_id: entry.id.clone(),
            document_id: stored.document_id,
            status: "stored".to_string(),
            error: None,
        },
        Err(e) => {
            warn!("Failed to store entry {}: {}", entry.id, e);
            StorageOutcome {
                entry_id: entry.id.clone(),
                document_id: None,
                status: "failed".to_string(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Title and markdown body stored for a captured experience
fn capture_document(
    entry: &LearningEntry,
    session: &SessionData,
    problem: &str,
    solution_applied: &str,
) -> (String, String) {
    let title = match &entry.synopsis {
        Some(synopsis) => synopsis.title.clone(),
        None => format!("Learning: {}", take_chars(problem, 80)),
    };
    let synthesis = &entry.knowledge_synthesis;
    let solution = if solution_applied.is_empty() {
        entry.resolution.solution.as_str()
    } else {
        solution_applied
    };

    let mut parts = vec![
        format!("# {}", title),
        format!("**Project**: {}", session.project_context),
        format!("**Session**: {}", session.session_id),
        format!("**Timestamp**: {}", entry.timestamp),
        String::new(),
        "## Problem".to_string(),
        problem.to_string(),
        String::new(),
        "## Investigation".to_string(),
    ];
    parts.extend(
        entry
            .debug_journey
            .investigation_path
            .iter()
            .map(|step| format!("- {}", step)),
    );
    parts.extend([
        String::new(),
        "## Solution".to_string(),
        solution.to_string(),
        String::new(),
        "## Key Learnings".to_string(),
        format!("- **Domain**: {}", synthesis.domain_principle),
        format!("- **Universal**: {}", synthesis.universal_principle),
        format!("- **Pattern**: {}", synthesis.pattern_recognition),
        String::new(),
        "---".to_string(),
        format!("Tags: learning, debugging, {}", session.project_context),
    ]);

    (title, parts.join("\n"))
}

/// Situation, resolution and synthesis as a compact markdown block
fn entry_summary(entry: &LearningEntry) -> String {
    let s = &entry.situation;
    let r = &entry.resolution;
    let k = &entry.knowledge_synthesis;
    [
        "## Situation".to_string(),
        format!("- Goal: {}", s.goal),
        format!("- Action: {}", s.action_taken),
        format!("- Expected: {}", s.expected_result),
        format!("- Actual: {}", s.actual_result),
        String::new(),
        "## Resolution".to_string(),
        format!("- Root Cause: {}", r.root_cause),
        format!("- Solution: {}", r.solution),
        format!("- Verification: {}", r.verification),
        String::new(),
        "## Knowledge Synthesis".to_string(),
        format!("- Domain: {}", k.domain_principle),
        format!("- Universal: {}", k.universal_principle),
        format!("- Pattern: {}", k.pattern_recognition),
        String::new(),
    ]
    .join("\n")
}
