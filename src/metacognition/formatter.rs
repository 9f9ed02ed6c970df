//! Learning entry construction
//!
//! Turns raw debugging experiences into structured [`LearningEntry`] records.
//! Every section is filled by fixed keyword heuristics; there is no model in
//! the loop, so the same input always yields the same entry.

use super::synopsis::SynopsisGenerator;
use crate::types::{
    DebugJourney, DebuggingExperience, EmbeddingFields, EntryVersion, KnowledgeSynthesis,
    LearningEntry, Resolution, SessionData, Situation, Synopsis, Trigger,
};
use crate::utils::string::{capitalize, contains_any};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static STEP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(step \d+:?|then|next)\s*").expect("valid step prefix regex"));

/// Build one learning entry per experience in the session.
///
/// Entry ids are `L001`, `L002`, ... in experience order. With
/// [`EntryVersion::V2`] every entry carries the same session-level synopsis,
/// title and embedding fields, all derived from the first experience.
pub fn create_learning_entries(session: &SessionData, version: EntryVersion) -> Vec<LearningEntry> {
    let enrichment = match version {
        EntryVersion::V2 => {
            let generator = SynopsisGenerator::new();
            Some((
                generator.synopsis_for_session(session),
                generator.embedding_fields_for_session(session),
            ))
        }
        EntryVersion::V1 => None,
    };

    let entries: Vec<LearningEntry> = session
        .debugging_experiences
        .iter()
        .enumerate()
        .map(|(i, experience)| {
            let mut entry = build_entry(experience, format!("L{:03}", i + 1), session.timestamp.clone());
            if let Some((synopsis, embedding_fields)) = &enrichment {
                apply_v2(&mut entry, synopsis.clone(), Some(embedding_fields.clone()));
            }
            entry
        })
        .collect();

    debug!(
        "Created {} learning entries for session {}",
        entries.len(),
        session.session_id
    );
    entries
}

/// Build a single entry without session context.
///
/// V2 entries get a synopsis generated from the entry itself and no
/// embedding fields.
pub fn create_learning_entry(
    experience: &DebuggingExperience,
    id: impl Into<String>,
    timestamp: impl Into<String>,
    version: EntryVersion,
) -> LearningEntry {
    let mut entry = build_entry(experience, id.into(), timestamp.into());
    if version == EntryVersion::V2 {
        let synopsis = SynopsisGenerator::new().generate_synopsis(&entry);
        apply_v2(&mut entry, synopsis, None);
    }
    entry
}

fn build_entry(experience: &DebuggingExperience, id: String, timestamp: String) -> LearningEntry {
    let problem = experience.problem_description.as_str();
    let steps = experience.investigation_steps.as_slice();
    let solution = experience.solution_applied.as_str();
    let outcome = experience.outcome.as_str();

    LearningEntry {
        id,
        timestamp,
        trigger: determine_trigger(problem),
        situation: extract_situation(problem, steps),
        debug_journey: extract_debug_journey(steps, solution),
        resolution: extract_resolution(solution, outcome),
        knowledge_synthesis: extract_knowledge_synthesis(problem, solution, steps),
        version: EntryVersion::V1.number(),
        synopsis: None,
        title: None,
        embedding_fields: None,
    }
}

fn apply_v2(entry: &mut LearningEntry, synopsis: Synopsis, embedding_fields: Option<EmbeddingFields>) {
    entry.version = EntryVersion::V2.number();
    entry.title = Some(synopsis.title.clone());
    entry.synopsis = Some(synopsis);
    entry.embedding_fields = embedding_fields;
}

/// Classify the problem description by keyword
pub fn determine_trigger(problem: &str) -> Trigger {
    let lower = problem.to_lowercase();

    if contains_any(&lower, &["error", "exception", "failed", "crash", "bug"]) {
        Trigger::Error
    } else if contains_any(&lower, &["slow", "performance", "timeout", "lag"]) {
        Trigger::Performance
    } else if contains_any(&lower, &["unexpected", "weird", "strange", "odd"]) {
        Trigger::Investigation
    } else if contains_any(&lower, &["optimization", "improvement", "enhancement"]) {
        Trigger::Optimization
    } else {
        Trigger::Investigation
    }
}

fn extract_situation(problem: &str, steps: &[String]) -> Situation {
    let (expected_result, actual_result) = infer_expected_vs_actual(problem);
    Situation {
        goal: infer_goal(problem),
        action_taken: extract_action_taken(steps),
        expected_result,
        actual_result,
    }
}

fn extract_debug_journey(steps: &[String], solution: &str) -> DebugJourney {
    DebugJourney {
        initial_hypothesis: extract_initial_hypothesis(steps),
        investigation_path: clean_investigation_steps(steps),
        dead_ends: identify_dead_ends(steps, solution),
    }
}

fn extract_resolution(solution: &str, outcome: &str) -> Resolution {
    Resolution {
        root_cause: infer_root_cause(solution),
        solution: if solution.is_empty() {
            "Applied systematic debugging approach".to_string()
        } else {
            solution.to_string()
        },
        verification: extract_verification(outcome),
    }
}

fn extract_knowledge_synthesis(problem: &str, solution: &str, steps: &[String]) -> KnowledgeSynthesis {
    KnowledgeSynthesis {
        domain_principle: extract_domain_principle(problem, solution),
        universal_principle: extract_universal_principle(steps),
        pattern_recognition: extract_pattern_recognition(problem),
        mental_model: extract_mental_model(solution),
    }
}

fn infer_goal(problem: &str) -> String {
    let lower = problem.to_lowercase();
    if lower.contains("project") {
        "Set up and configure project environment properly"
    } else if contains_any(&lower, &["install", "dependencies"]) {
        "Install and manage project dependencies correctly"
    } else if contains_any(&lower, &["import", "module"]) {
        "Import and use modules correctly in the application"
    } else {
        "Resolve the identified issue and restore expected functionality"
    }
    .to_string()
}

fn extract_action_taken(steps: &[String]) -> String {
    match steps.first() {
        Some(first) => {
            let lower = first.to_lowercase();
            if lower.contains("check") {
                format!("Investigated the issue by {}", lower)
            } else {
                format!("Began debugging by {}", lower)
            }
        }
        None => "Initiated systematic debugging process".to_string(),
    }
}

fn infer_expected_vs_actual(problem: &str) -> (String, String) {
    let lower = problem.to_lowercase();
    if contains_any(&lower, &["missing", "not found"]) {
        (
            "Required files/modules should be accessible and functional".to_string(),
            "Files/modules were not found or not accessible from current context".to_string(),
        )
    } else if lower.contains("dependencies") {
        (
            "All dependencies should be installed and available".to_string(),
            "Dependencies were not installed or not available".to_string(),
        )
    } else {
        let actual = if problem.is_empty() {
            "Encountered unexpected behavior".to_string()
        } else {
            problem.to_string()
        };
        (
            "System should function as intended without errors".to_string(),
            actual,
        )
    }
}

fn extract_initial_hypothesis(steps: &[String]) -> String {
    match steps.first() {
        Some(first) if first.to_lowercase().contains("check") => {
            format!("Initial assumption was related to {}", first.to_lowercase())
        }
        Some(first) => format!("First hypothesis: {}", first),
        None => "Initial hypothesis based on error symptoms and common patterns".to_string(),
    }
}

/// Strip `step N:`, `then` and `next` prefixes and normalise casing
pub fn clean_investigation_steps(steps: &[String]) -> Vec<String> {
    let cleaned: Vec<String> = steps
        .iter()
        .map(|step| STEP_PREFIX.replace(step, "").trim().to_string())
        .filter(|step| !step.is_empty())
        .map(|step| capitalize(&step))
        .collect();

    if cleaned.is_empty() {
        vec!["Analyzed the problem systematically".to_string()]
    } else {
        cleaned
    }
}

/// Non-final steps that tried something unrelated to the eventual solution
pub fn identify_dead_ends(steps: &[String], solution: &str) -> Vec<String> {
    let solution_lower = solution.to_lowercase();
    let keywords: Vec<&str> = solution_lower.split_whitespace().collect();

    let considered = steps.len().saturating_sub(1);
    let dead_ends: Vec<String> = steps[..considered]
        .iter()
        .map(|step| step.to_lowercase())
        .filter(|step| !keywords.iter().any(|keyword| step.contains(keyword)))
        .filter(|step| contains_any(step, &["tried", "attempted", "checked", "tested"]))
        .map(|step| format!("Investigated {} but this wasn't the root cause", step))
        .collect();

    if dead_ends.is_empty() {
        vec!["Initial troubleshooting approaches required refinement".to_string()]
    } else {
        dead_ends
    }
}

fn infer_root_cause(solution: &str) -> String {
    let lower = solution.to_lowercase();
    if lower.contains("virtual environment") {
        "Missing or incorrectly configured virtual environment".to_string()
    } else if lower.contains("install") {
        "Missing dependencies or incorrect installation".to_string()
    } else if contains_any(&lower, &["path", "directory"]) {
        "Incorrect working directory or path configuration".to_string()
    } else if lower.contains("permissions") {
        "File or directory permission issues".to_string()
    } else {
        format!("Root cause addressed by: {}", solution)
    }
}

fn extract_verification(outcome: &str) -> String {
    let lower = outcome.to_lowercase();
    if lower.contains("successfully") {
        "Confirmed resolution by testing the previously failing scenario".to_string()
    } else if lower.contains("resolved") {
        "Verified fix by reproducing original conditions".to_string()
    } else {
        format!("Validation method: {}", outcome)
    }
}

fn extract_domain_principle(problem: &str, solution: &str) -> String {
    let combined = format!("{} {}", problem, solution).to_lowercase();
    if contains_any(&combined, &["python", "pip", "venv", "import", "module", ".py"]) {
        "Python import system requires proper working directory and module path configuration"
    } else if contains_any(&combined, &["javascript", "node", "npm"]) {
        "JavaScript projects require proper dependency installation via npm/yarn"
    } else if combined.contains("git") {
        "Version control operations require understanding of Git workflow and commands"
    } else {
        "Technology-specific configuration and setup patterns are crucial for success"
    }
    .to_string()
}

fn extract_universal_principle(steps: &[String]) -> String {
    let steps_text = steps.join(" ").to_lowercase();

    if contains_any(&steps_text, &["working directory", "context", "path"]) {
        "Understanding the execution context is essential when resolving import or path-related issues"
    } else if steps_text.contains("systematic") || steps.len() > 3 {
        "Systematic investigation yields better debugging outcomes than ad hoc troubleshooting"
    } else if steps_text.contains("check") {
        "Verify assumptions before proceeding with complex solutions"
    } else {
        "Understanding the problem context is essential before applying solutions"
    }
    .to_string()
}

fn extract_pattern_recognition(problem: &str) -> String {
    let lower = problem.to_lowercase();
    if lower.contains("not found") {
        "'Not found' errors often indicate path, environment, or dependency issues"
    } else if lower.contains("missing") {
        "Missing component errors suggest setup or configuration problems"
    } else {
        "Error patterns provide clues about the category and likely solutions"
    }
    .to_string()
}

fn extract_mental_model(solution: &str) -> String {
    let lower = solution.to_lowercase();
    if lower.contains("environment") {
        "Development environments are isolated contexts with their own dependencies"
    } else if lower.contains("path") {
        "File system navigation and context matter for resource accessibility"
    } else {
        "Debugging is a systematic process of hypothesis testing and validation"
    }
    .to_string()
}
