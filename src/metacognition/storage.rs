//! Learning file storage
//!
//! Learning entries are written as markdown session logs under the
//! knowledge directory, and rendered as standalone documents when pushed
//! to the external knowledge base.

use crate::error::{BridgeError, Result};
use crate::services::{KnowledgeService, StoreKnowledgeRequest};
use crate::types::LearningEntry;
use crate::utils::string::take_chars;
use chrono::{Local, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::{json, Map};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};
use uuid::Uuid;

/// Source type recorded for entries pushed by the storage layer
pub const METACOGNITION_SOURCE: &str = "metacognition";

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Where a learning file for a session would be written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearningFilePaths {
    pub absolute: PathBuf,
    pub relative: PathBuf,
    pub filename: String,
}

/// Header and entry summaries read back from a learning file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LearningLog {
    pub session_id: String,
    pub project: String,
    pub start_time: String,
    pub entries: Vec<LoggedEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoggedEntry {
    pub id: String,
    pub timestamp: String,
    pub trigger: String,
}

/// A learning entry rendered for the knowledge base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeDocument {
    pub title: String,
    pub content: String,
}

/// Result of pushing one entry to the knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageOutcome {
    pub entry_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Markdown learning files under one directory
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    dir: PathBuf,
}

impl KnowledgeStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths the learning file for `session_id` would use, without
    /// touching the filesystem.
    pub fn paths(&self, session_id: &str) -> LearningFilePaths {
        let filename = learning_filename(session_timestamp(session_id));
        let relative = self.dir.join(&filename);
        let absolute = absolutize(&relative);
        LearningFilePaths {
            absolute,
            relative,
            filename,
        }
    }

    /// Write the session log and return its absolute path.
    ///
    /// An existing file with the same name is never overwritten; a `-N`
    /// suffix is added instead.
    pub async fn save(
        &self,
        entries: &[LearningEntry],
        session_id: &str,
        project: &str,
    ) -> Result<PathBuf> {
        if entries.is_empty() {
            return Err(BridgeError::Validation(
                "No learning entries provided to save".to_string(),
            ));
        }

        fs::create_dir_all(&self.dir).await?;

        let started = session_timestamp(session_id);
        let stem = format!("learning-{}", started.format(TIMESTAMP_FORMAT));
        let mut path = self.dir.join(format!("{}.md", stem));
        let mut suffix = 1;
        while fs::try_exists(&path).await? {
            path = self.dir.join(format!("{}-{}.md", stem, suffix));
            suffix += 1;
        }

        let content = render_session_log(
            session_id,
            project,
            &started.format("%Y-%m-%dT%H:%M:%S").to_string(),
            entries,
        );
        fs::write(&path, content).await?;

        let absolute = absolutize(&path);
        info!("Saved learning file: {}", absolute.display());
        Ok(absolute)
    }

    /// All learning files in the directory, sorted by name
    pub async fn list(&self) -> Result<Vec<PathBuf>> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_learning_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("learning-") && name.ends_with(".md"));
            if is_learning_file && path.is_file() {
                files.push(absolutize(&path));
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read a learning file back.
    ///
    /// Relative paths are tried as given, then inside the store directory.
    pub async fn load(&self, path: &Path) -> Result<LearningLog> {
        let candidate = if path.is_relative() && !fs::try_exists(path).await? {
            self.dir.join(path)
        } else {
            path.to_path_buf()
        };
        let content = fs::read_to_string(&candidate).await?;
        Ok(parse_session_log(&content))
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn learning_filename(timestamp: NaiveDateTime) -> String {
    format!("learning-{}.md", timestamp.format(TIMESTAMP_FORMAT))
}

/// Today's date combined with the `HHMMSS` suffix of the session id, or
/// the current time when the suffix is not a time.
pub fn session_timestamp(session_id: &str) -> NaiveDateTime {
    let now = Local::now().naive_local();
    session_id
        .rsplit('-')
        .next()
        .and_then(|suffix| NaiveTime::parse_from_str(suffix, "%H%M%S").ok())
        .map(|time| now.date().and_time(time))
        .unwrap_or(now)
}

/// Render the markdown session log
pub fn render_session_log(
    session_id: &str,
    project: &str,
    start_time: &str,
    entries: &[LearningEntry],
) -> String {
    let mut lines = vec![
        "# Session Learning Log".to_string(),
        format!("**Session ID**: {}", session_id),
        format!("**Project**: {}", project),
        format!("**Start Time**: {}", start_time),
        String::new(),
    ];

    for (index, entry) in entries.iter().enumerate() {
        render_log_entry(&mut lines, entry, index + 1);
        if index + 1 < entries.len() {
            lines.push("---".to_string());
            lines.push(String::new());
        }
    }

    lines.join("\n")
}

fn render_log_entry(lines: &mut Vec<String>, entry: &LearningEntry, number: usize) {
    lines.push(format!("## Learning Entry {}", number));
    lines.push(format!("**ID**: {}", entry.id));
    lines.push(format!("**Timestamp**: {}", entry.timestamp));
    lines.push(format!("**Trigger**: {}", entry.trigger));
    lines.push(String::new());

    let situation = &entry.situation;
    lines.push("### Situation".to_string());
    lines.push(format!("**Goal**: {}", situation.goal));
    lines.push(format!("**Action Taken**: {}", situation.action_taken));
    lines.push(format!("**Expected Result**: {}", situation.expected_result));
    lines.push(format!("**Actual Result**: {}", situation.actual_result));
    lines.push(String::new());

    let journey = &entry.debug_journey;
    lines.push("### Debug Journey".to_string());
    lines.push(format!("**Initial Hypothesis**: {}", journey.initial_hypothesis));
    lines.push("**Investigation Path**:".to_string());
    if journey.investigation_path.is_empty() {
        lines.push("1. Investigation steps not documented".to_string());
    } else {
        for (i, step) in journey.investigation_path.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, step));
        }
    }
    lines.push(String::new());

    lines.push("**Dead Ends**:".to_string());
    if journey.dead_ends.is_empty() {
        lines.push("- No dead ends documented".to_string());
    } else {
        lines.extend(journey.dead_ends.iter().map(|d| format!("- {}", d)));
    }
    lines.push(String::new());

    let resolution = &entry.resolution;
    lines.push("### Resolution".to_string());
    lines.push(format!("**Root Cause**: {}", resolution.root_cause));
    lines.push(format!("**Solution**: {}", resolution.solution));
    lines.push(format!("**Verification**: {}", resolution.verification));
    lines.push(String::new());

    let synthesis = &entry.knowledge_synthesis;
    lines.push("### Knowledge Synthesis".to_string());
    lines.push(format!("**Domain Principle**: {}", synthesis.domain_principle));
    lines.push(format!(
        "**Universal Principle**: {}",
        synthesis.universal_principle
    ));
    lines.push(format!(
        "**Pattern Recognition**: {}",
        synthesis.pattern_recognition
    ));
    lines.push(format!("**Mental Model**: {}", synthesis.mental_model));
    lines.push(String::new());

    if let Some(synopsis) = &entry.synopsis {
        let b = &synopsis.bullets;
        lines.push("### Quick Reference Synopsis".to_string());
        lines.push(format!("- **Symptoms**: {}", b.symptoms));
        lines.push(format!("- **Context**: {}", b.context));
        lines.push(format!("- **Root Cause**: {}", b.root_cause));
        lines.push(format!("- **Fix**: {}", b.fix));
        lines.push(format!("- **Applies When**: {}", b.applies_when));
        lines.push(String::new());
    }
}

/// Parse the header fields and per-entry id, timestamp and trigger
pub fn parse_session_log(content: &str) -> LearningLog {
    let mut log = LearningLog::default();
    let mut current: Option<LoggedEntry> = None;

    for line in content.lines() {
        if line.starts_with("## Learning Entry ") {
            if let Some(entry) = current.take() {
                log.entries.push(entry);
            }
            current = Some(LoggedEntry::default());
            continue;
        }

        match current.as_mut() {
            None => {
                if let Some(value) = field_value(line, "Session ID") {
                    log.session_id = value;
                } else if let Some(value) = field_value(line, "Project") {
                    log.project = value;
                } else if let Some(value) = field_value(line, "Start Time") {
                    log.start_time = value;
                }
            }
            Some(entry) => {
                if let Some(value) = field_value(line, "ID") {
                    entry.id = value;
                } else if let Some(value) = field_value(line, "Timestamp") {
                    entry.timestamp = value;
                } else if let Some(value) = field_value(line, "Trigger") {
                    entry.trigger = value;
                }
            }
        }
    }

    if let Some(entry) = current {
        log.entries.push(entry);
    }
    log
}

fn field_value(line: &str, field: &str) -> Option<String> {
    line.strip_prefix(&format!("**{}**:", field))
        .map(|rest| rest.trim().to_string())
}

/// Render one entry as a searchable knowledge-base document
pub fn render_knowledge_document(entry: &LearningEntry, session_id: &str) -> KnowledgeDocument {
    let title = entry
        .synopsis
        .as_ref()
        .and_then(|synopsis| {
            entry
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| Some(synopsis.title.clone()).filter(|t| !t.is_empty()))
        })
        .unwrap_or_else(|| {
            take_chars(&format!("Debug: {}", entry.situation.goal), 120).to_string()
        });

    let situation = &entry.situation;
    let journey = &entry.debug_journey;
    let resolution = &entry.resolution;
    let synthesis = &entry.knowledge_synthesis;

    let mut parts = vec![
        format!("# {}", title),
        format!("**Session**: {}", session_id),
        format!("**Entry ID**: {}", entry.id),
        format!("**Timestamp**: {}", entry.timestamp),
        format!("**Trigger**: {}", entry.trigger),
        String::new(),
        "## Problem Context".to_string(),
        format!("**Goal**: {}", situation.goal),
        format!("**Action Taken**: {}", situation.action_taken),
        format!("**Expected Result**: {}", situation.expected_result),
        format!("**Actual Result**: {}", situation.actual_result),
        String::new(),
        "## Investigation Process".to_string(),
        format!("**Initial Hypothesis**: {}", journey.initial_hypothesis),
        String::new(),
        "**Investigation Steps**:".to_string(),
    ];
    parts.extend(journey.investigation_path.iter().map(|s| format!("- {}", s)));

    parts.push(String::new());
    parts.push("**Dead Ends Encountered**:".to_string());
    parts.extend(journey.dead_ends.iter().map(|d| format!("- {}", d)));

    parts.extend([
        String::new(),
        "## Resolution".to_string(),
        format!("**Root Cause**: {}", resolution.root_cause),
        format!("**Solution**: {}", resolution.solution),
        format!("**Verification**: {}", resolution.verification),
        String::new(),
        "## Key Learnings".to_string(),
        format!("**Domain Principle**: {}", synthesis.domain_principle),
        format!("**Universal Principle**: {}", synthesis.universal_principle),
        format!("**Pattern Recognition**: {}", synthesis.pattern_recognition),
        format!("**Mental Model**: {}", synthesis.mental_model),
    ]);

    if let Some(synopsis) = &entry.synopsis {
        let b = &synopsis.bullets;
        parts.extend([
            String::new(),
            "## Quick Reference".to_string(),
            format!("- **Symptoms**: {}", b.symptoms),
            format!("- **Context**: {}", b.context),
            format!("- **Root Cause**: {}", b.root_cause),
            format!("- **Fix**: {}", b.fix),
            format!("- **Applies When**: {}", b.applies_when),
        ]);
    }

    parts.extend([
        String::new(),
        "---".to_string(),
        format!(
            "Tags: debugging, {}, metacognition, learning, knowledge-base",
            entry.trigger
        ),
        "Source: Meta-Cognition Layer".to_string(),
        format!("Version: {}", entry.version),
    ]);

    KnowledgeDocument {
        title,
        content: parts.join("\n"),
    }
}

/// Push every entry to the knowledge base; failures are reported per entry
pub async fn store_in_knowledge_base(
    entries: &[LearningEntry],
    session_id: &str,
    service: &dyn KnowledgeService,
) -> Vec<StorageOutcome> {
    let mut outcomes = Vec::with_capacity(entries.len());

    for entry in entries {
        let document = render_knowledge_document(entry, session_id);
        let mut metadata = Map::new();
        metadata.insert("session_id".into(), json!(session_id));
        metadata.insert("entry_id".into(), json!(entry.id));
        metadata.insert("trigger".into(), json!(entry.trigger));
        metadata.insert("timestamp".into(), json!(entry.timestamp));
        metadata.insert("version".into(), json!(entry.version));
        metadata.insert("has_synopsis".into(), json!(entry.synopsis.is_some()));

        let request = StoreKnowledgeRequest {
            content: document.content,
            title: document.title,
            source_type: METACOGNITION_SOURCE.to_string(),
            metadata,
        };

        match service.store_knowledge(request).await {
            Ok(stored) => {
                info!("Stored entry {} in knowledge base", entry.id);
                outcomes.push(StorageOutcome {
                    entry_id: entry.id.clone(),
                    document_id: Some(
                        stored
                            .document_id
                            .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    ),
                    status: "success".to_string(),
                    error: None,
                });
            }
            Err(e) => {
                error!("Failed to store entry {}: {}", entry.id, e);
                outcomes.push(StorageOutcome {
                    entry_id: entry.id.clone(),
                    document_id: None,
                    status: "failed".to_string(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    outcomes
}
