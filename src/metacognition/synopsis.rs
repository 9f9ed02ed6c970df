//! Synopsis generation for learning entries
//!
//! A synopsis is a title (at most 120 characters) and five fixed bullets:
//! symptoms, context, root cause, fix and when the knowledge applies. The
//! generator steers the combined bullet length towards 120..=200 words so
//! the text is a useful unit for embedding.

use crate::types::{
    BulletField, DebugJourney, DebuggingExperience, EmbeddingFields, KnowledgeSynthesis,
    LearningEntry, SessionData, Situation, Synopsis, SynopsisBullets,
};
use crate::utils::string::{contains_any, take_chars};
use once_cell::sync::Lazy;
use regex::Regex;

/// Lower bound of the synopsis word range
pub const MIN_SYNOPSIS_WORDS: usize = 120;

/// Upper bound of the synopsis word range
pub const MAX_SYNOPSIS_WORDS: usize = 200;

/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 120;

/// Bullets are never trimmed below this many words
const MIN_BULLET_WORDS: usize = 5;

static TITLE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid title punctuation regex"));

const ACTION_VERBS: [&str; 8] = [
    "use", "run", "install", "set", "configure", "change", "add", "remove",
];

/// Builds [`Synopsis`] and [`EmbeddingFields`] values
#[derive(Debug, Clone, Default)]
pub struct SynopsisGenerator;

impl SynopsisGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Synopsis derived from an already-built learning entry
    pub fn generate_synopsis(&self, entry: &LearningEntry) -> Synopsis {
        let bullets = SynopsisBullets {
            symptoms: entry.situation.actual_result.clone(),
            context: self.context_bullet(&entry.situation, &entry.debug_journey),
            root_cause: entry.resolution.root_cause.clone(),
            fix: entry.resolution.solution.clone(),
            applies_when: self.applicability_bullet(&entry.knowledge_synthesis),
        };

        Synopsis {
            title: self.title_from_entry(entry),
            bullets: self.adjust_word_count(bullets),
        }
    }

    /// Synopsis for one experience, using the session for context
    pub fn synopsis_for_experience(
        &self,
        experience: &DebuggingExperience,
        session: &SessionData,
    ) -> Synopsis {
        let bullets = SynopsisBullets {
            symptoms: extract_symptoms(experience),
            context: extract_context(experience, session),
            root_cause: extract_root_cause(experience),
            fix: extract_fix(experience),
            applies_when: extract_applicability(experience),
        };

        Synopsis {
            title: self.title_from_problem(&experience.problem_description),
            bullets: self.adjust_word_count(bullets),
        }
    }

    /// Synopsis for the session's first experience, or a default one
    pub fn synopsis_for_session(&self, session: &SessionData) -> Synopsis {
        match session.debugging_experiences.first() {
            Some(experience) => self.synopsis_for_experience(experience, session),
            None => default_synopsis(),
        }
    }

    /// Content for each embedding field, derived from one experience
    pub fn embedding_fields_for_experience(
        &self,
        experience: &DebuggingExperience,
        session: &SessionData,
    ) -> EmbeddingFields {
        let synopsis = self.synopsis_for_experience(experience, session);
        let solution = non_empty_or(&experience.solution_applied, "Solution implementation needed");

        EmbeddingFields {
            synopsis: format_synopsis_for_embedding(&synopsis),
            title: synopsis.title,
            debug_journey: format_debug_journey(experience),
            root_cause: non_empty_or(&experience.solution_applied, "Root cause analysis needed"),
            solution,
            pattern_recognition: extract_pattern(experience),
        }
    }

    /// Embedding content for the session's first experience, or defaults
    pub fn embedding_fields_for_session(&self, session: &SessionData) -> EmbeddingFields {
        match session.debugging_experiences.first() {
            Some(experience) => self.embedding_fields_for_experience(experience, session),
            None => default_embedding_fields(),
        }
    }

    fn title_from_entry(&self, entry: &LearningEntry) -> String {
        let actual = &entry.situation.actual_result;
        let actual_lower = actual.to_lowercase();

        let title = if contains_any(&actual_lower, &["error", "failed"]) {
            format!("{} Error: {}", infer_domain(entry), take_chars(actual, 60))
        } else {
            format!("Resolve: {}", take_chars(&entry.situation.goal, 70))
        };

        if title.chars().count() > MAX_TITLE_CHARS {
            format!("{}...", take_chars(&title, MAX_TITLE_CHARS - 3))
        } else {
            title
        }
    }

    /// Title from the problem text: punctuation removed, cut at a word
    /// boundary when longer than the limit.
    pub fn title_from_problem(&self, problem: &str) -> String {
        let clean = TITLE_PUNCTUATION.replace_all(problem, "").to_string();
        if clean.trim().is_empty() {
            return "Debugging Session Learning".to_string();
        }
        if clean.chars().count() <= MAX_TITLE_CHARS {
            return clean;
        }

        let limit = MAX_TITLE_CHARS - 3;
        let mut title = String::new();
        for word in clean.split_whitespace() {
            // the separating space is counted even before the first word
            if title.chars().count() + 1 + word.chars().count() > limit {
                break;
            }
            if !title.is_empty() {
                title.push(' ');
            }
            title.push_str(word);
        }
        format!("{}...", title)
    }

    fn context_bullet(&self, situation: &Situation, _journey: &DebugJourney) -> String {
        let mut parts = Vec::new();
        if !situation.action_taken.is_empty() {
            parts.push(format!("While {}", situation.action_taken.to_lowercase()));
        }

        let goal = situation.goal.to_lowercase();
        let environment = if contains_any(&goal, &["python", "import"]) {
            "in Python development environment"
        } else if contains_any(&goal, &["javascript", "node"]) {
            "in JavaScript/Node.js environment"
        } else if contains_any(&goal, &["database", "sql"]) {
            "in database environment"
        } else {
            "in development environment"
        };
        parts.push(environment.to_string());

        parts.join(" ")
    }

    fn applicability_bullet(&self, synthesis: &KnowledgeSynthesis) -> String {
        let pattern = &synthesis.pattern_recognition;
        if pattern.to_lowercase().contains("when") {
            return pattern.clone();
        }
        if !synthesis.domain_principle.is_empty() {
            return format!(
                "When encountering similar {}",
                synthesis.domain_principle.to_lowercase()
            );
        }
        "When facing similar debugging challenges".to_string()
    }

    /// Pull the bullets' combined word count towards the allowed range
    pub fn adjust_word_count(&self, bullets: SynopsisBullets) -> SynopsisBullets {
        let words = bullets.word_count();
        if words < MIN_SYNOPSIS_WORDS {
            expand_bullets(bullets, MIN_SYNOPSIS_WORDS - words)
        } else if words > MAX_SYNOPSIS_WORDS {
            compress_bullets(bullets, words - MAX_SYNOPSIS_WORDS)
        } else {
            bullets
        }
    }
}

fn expand_bullets(mut bullets: SynopsisBullets, words_needed: usize) -> SynopsisBullets {
    if words_needed / BulletField::ALL.len() == 0 {
        return bullets;
    }

    for field in BulletField::ALL {
        let suffix = match field {
            BulletField::Symptoms => " with detailed error context",
            BulletField::Context => " during development workflow",
            BulletField::RootCause => " through systematic analysis",
            BulletField::Fix => " with verification steps",
            BulletField::AppliesWhen => " in similar scenarios",
        };
        bullets.get_mut(field).push_str(suffix);
    }
    bullets
}

fn compress_bullets(mut bullets: SynopsisBullets, mut words_to_remove: usize) -> SynopsisBullets {
    while words_to_remove > 0 {
        // first field wins ties, matching canonical bullet order
        let longest = BulletField::ALL
            .into_iter()
            .rev()
            .max_by_key(|field| bullets.get(*field).split_whitespace().count())
            .unwrap_or(BulletField::Symptoms);

        let words: Vec<&str> = bullets.get(longest).split_whitespace().collect();
        if words.len() <= MIN_BULLET_WORDS {
            break;
        }
        let shortened = words[..words.len() - 1].join(" ");
        *bullets.get_mut(longest) = shortened;
        words_to_remove -= 1;
    }
    bullets
}

fn extract_symptoms(experience: &DebuggingExperience) -> String {
    let problem = &experience.problem_description;
    if problem.to_lowercase().contains("error") {
        format!("Encountered {}", problem.to_lowercase())
    } else {
        non_empty_or(problem, "Issue encountered during operation")
    }
}

fn extract_context(experience: &DebuggingExperience, session: &SessionData) -> String {
    if !session.project_context.is_empty() {
        return format!("Working in {} environment", session.project_context);
    }

    let problem = experience.problem_description.to_lowercase();
    if contains_any(&problem, &["python", "import"]) {
        "Python development environment".to_string()
    } else if contains_any(&problem, &["javascript", "node"]) {
        "JavaScript/Node.js environment".to_string()
    } else {
        "Development environment".to_string()
    }
}

fn extract_root_cause(experience: &DebuggingExperience) -> String {
    let solution = experience.solution_applied.to_lowercase();
    if solution.contains("directory") {
        "Working directory or path configuration issue"
    } else if solution.contains("install") {
        "Missing or incorrect dependency installation"
    } else if solution.contains("permission") {
        "File or directory permission restriction"
    } else {
        "Root cause identified through systematic debugging"
    }
    .to_string()
}

fn extract_fix(experience: &DebuggingExperience) -> String {
    let solution = &experience.solution_applied;
    if solution.is_empty() {
        return "Apply systematic debugging approach".to_string();
    }
    let lower = solution.to_lowercase();
    if ACTION_VERBS.iter().any(|verb| lower.starts_with(verb)) {
        solution.clone()
    } else {
        format!("Apply {}", lower)
    }
}

fn extract_applicability(experience: &DebuggingExperience) -> String {
    let problem = experience.problem_description.to_lowercase();
    if problem.contains("not found") {
        "When files exist but are not found by the system"
    } else if problem.contains("error") && problem.contains("import") {
        "When import statements fail despite proper installation"
    } else if problem.contains("permission") {
        "When encountering file or directory access restrictions"
    } else {
        "When facing similar configuration or environment issues"
    }
    .to_string()
}

fn format_synopsis_for_embedding(synopsis: &Synopsis) -> String {
    let b = &synopsis.bullets;
    format!(
        "Problem: {} Context: {} Cause: {} Solution: {} Use: {}",
        b.symptoms, b.context, b.root_cause, b.fix, b.applies_when
    )
}

fn format_debug_journey(experience: &DebuggingExperience) -> String {
    if experience.investigation_steps.is_empty() {
        "Systematic investigation approach".to_string()
    } else {
        experience.investigation_steps.join(" → ")
    }
}

fn extract_pattern(experience: &DebuggingExperience) -> String {
    let problem = experience.problem_description.to_lowercase();
    let solution = experience.solution_applied.to_lowercase();
    if problem.contains("file") && solution.contains("directory") {
        "File accessibility issues often relate to working directory context"
    } else if problem.contains("import") {
        "Import errors typically indicate path or environment configuration problems"
    } else {
        "Debugging requires systematic hypothesis testing and validation"
    }
    .to_string()
}

fn infer_domain(entry: &LearningEntry) -> &'static str {
    let text = serde_json::to_string(entry)
        .unwrap_or_default()
        .to_lowercase();
    if contains_any(&text, &["python", "import"]) {
        "Python"
    } else if contains_any(&text, &["javascript", "node"]) {
        "JavaScript"
    } else if contains_any(&text, &["sql", "database"]) {
        "Database"
    } else {
        "System"
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Synopsis used when a session carries no experiences
pub fn default_synopsis() -> Synopsis {
    Synopsis {
        title: "Learning Session Analysis".to_string(),
        bullets: SynopsisBullets {
            symptoms: "Issue encountered during session".to_string(),
            context: "Development environment".to_string(),
            root_cause: "Root cause analysis needed".to_string(),
            fix: "Solution implementation needed".to_string(),
            applies_when: "When facing similar challenges".to_string(),
        },
    }
}

/// Embedding content used when a session carries no experiences
pub fn default_embedding_fields() -> EmbeddingFields {
    EmbeddingFields {
        title: "Learning Session Analysis".to_string(),
        synopsis: "Problem: Issue encountered Context: Development environment Cause: Analysis needed Solution: Implementation needed Use: Similar challenges".to_string(),
        debug_journey: "Systematic investigation approach".to_string(),
        root_cause: "Root cause analysis needed".to_string(),
        solution: "Solution implementation needed".to_string(),
        pattern_recognition: "Debugging requires systematic approach".to_string(),
    }
}
