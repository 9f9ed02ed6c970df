//! Core data types for learning capture
//!
//! Experiences come in from tools or transcripts, are grouped into a
//! [`SessionData`], and are turned into [`LearningEntry`] records by the
//! formatter. Nothing here is persisted except as rendered markdown.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Raw debugging experience as reported by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebuggingExperience {
    pub problem_description: String,
    #[serde(default)]
    pub investigation_steps: Vec<String>,
    #[serde(default)]
    pub solution_applied: String,
    #[serde(default)]
    pub outcome: String,
}

/// A batch of experiences captured from one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    /// Timestamp-based identifier, e.g. `external-myapp-20250101-120000`
    pub session_id: String,

    /// ISO-8601 creation time
    pub timestamp: String,

    pub project_context: String,

    pub debugging_experiences: Vec<DebuggingExperience>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_type: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub additional_context: Map<String, Value>,
}

impl SessionData {
    /// New session stamped with the current local time
    pub fn new(
        session_id: impl Into<String>,
        project_context: impl Into<String>,
        debugging_experiences: Vec<DebuggingExperience>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: Local::now().to_rfc3339(),
            project_context: project_context.into(),
            debugging_experiences,
            session_type: None,
            tags: Vec::new(),
            additional_context: Map::new(),
        }
    }
}

/// What kind of event prompted the learning entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Error,
    Performance,
    Investigation,
    Optimization,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Error => "error",
            Trigger::Performance => "performance",
            Trigger::Investigation => "investigation",
            Trigger::Optimization => "optimization",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Situation {
    pub goal: String,
    pub action_taken: String,
    pub expected_result: String,
    pub actual_result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugJourney {
    pub initial_hypothesis: String,
    pub investigation_path: Vec<String>,
    pub dead_ends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub root_cause: String,
    pub solution: String,
    pub verification: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSynthesis {
    pub domain_principle: String,
    pub universal_principle: String,
    pub pattern_recognition: String,
    pub mental_model: String,
}

/// The five fixed synopsis bullets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynopsisBullets {
    pub symptoms: String,
    pub context: String,
    pub root_cause: String,
    pub fix: String,
    pub applies_when: String,
}

impl SynopsisBullets {
    /// Total whitespace-separated words across all bullets
    pub fn word_count(&self) -> usize {
        self.iter().map(|(_, text)| text.split_whitespace().count()).sum()
    }

    /// Bullets in their canonical order
    pub fn iter(&self) -> impl Iterator<Item = (BulletField, &str)> {
        BulletField::ALL
            .into_iter()
            .map(move |field| (field, self.get(field)))
    }

    pub fn get(&self, field: BulletField) -> &str {
        match field {
            BulletField::Symptoms => &self.symptoms,
            BulletField::Context => &self.context,
            BulletField::RootCause => &self.root_cause,
            BulletField::Fix => &self.fix,
            BulletField::AppliesWhen => &self.applies_when,
        }
    }

    pub fn get_mut(&mut self, field: BulletField) -> &mut String {
        match field {
            BulletField::Symptoms => &mut self.symptoms,
            BulletField::Context => &mut self.context,
            BulletField::RootCause => &mut self.root_cause,
            BulletField::Fix => &mut self.fix,
            BulletField::AppliesWhen => &mut self.applies_when,
        }
    }
}

/// Names of the synopsis bullets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletField {
    Symptoms,
    Context,
    RootCause,
    Fix,
    AppliesWhen,
}

impl BulletField {
    pub const ALL: [BulletField; 5] = [
        BulletField::Symptoms,
        BulletField::Context,
        BulletField::RootCause,
        BulletField::Fix,
        BulletField::AppliesWhen,
    ];
}

/// Title plus bullets, used as a quick reference and for embeddings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synopsis {
    pub title: String,
    pub bullets: SynopsisBullets,
}

/// Text prepared for each embedding field of the knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingFields {
    pub title: String,
    pub synopsis: String,
    pub debug_journey: String,
    pub root_cause: String,
    pub solution: String,
    pub pattern_recognition: String,
}

/// Output format generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryVersion {
    /// Core sections only
    V1,
    /// Core sections plus synopsis, title and embedding fields
    V2,
}

impl EntryVersion {
    pub fn number(&self) -> u8 {
        match self {
            EntryVersion::V1 => 1,
            EntryVersion::V2 => 2,
        }
    }
}

/// A structured learning entry derived from one debugging experience
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEntry {
    /// `L001`, `L002`, ... within a session
    pub id: String,
    pub timestamp: String,
    pub trigger: Trigger,
    pub situation: Situation,
    pub debug_journey: DebugJourney,
    pub resolution: Resolution,
    pub knowledge_synthesis: KnowledgeSynthesis,
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<Synopsis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_fields: Option<EmbeddingFields>,
}
