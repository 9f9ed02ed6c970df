//! Session analysis
//!
//! Builds a [`SessionData`] either from a transcript or, when none is given,
//! from a few checks against the project directory layout.

use crate::types::{DebuggingExperience, SessionData};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

static ERROR_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| keyword_patterns(&["error", "exception", "failed", "bug"]));

static FIX_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| keyword_patterns(&["fixed", "resolved", "solution"]));

fn keyword_patterns(keywords: &[&str]) -> Vec<Regex> {
    keywords
        .iter()
        .map(|keyword| {
            Regex::new(&format!(r"(?im){}[:\s]+(.*?)(?:\n|$)", keyword))
                .expect("valid keyword pattern")
        })
        .collect()
}

/// Analyze a session transcript, or the project directory when no
/// transcript is available.
pub fn analyze_session(content: Option<&str>, project_dir: &Path) -> SessionData {
    let session_id = format!("session-{}", Local::now().format("%Y%m%d-%H%M%S"));
    let project = project_context(project_dir);

    let experiences = match content {
        Some(text) => parse_transcript(text),
        None => {
            let found = project_structure_experiences(project_dir);
            if found.is_empty() {
                vec![default_experience()]
            } else {
                found
            }
        }
    };

    debug!(
        "Analyzed session {} for {}: {} experiences",
        session_id,
        project,
        experiences.len()
    );
    SessionData::new(session_id, project, experiences)
}

fn project_context(project_dir: &Path) -> String {
    let resolved = project_dir
        .canonicalize()
        .unwrap_or_else(|_| project_dir.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("project-{}", Local::now().format("%Y%m%d")))
}

fn parse_transcript(content: &str) -> Vec<DebuggingExperience> {
    let mut experiences = Vec::new();

    for pattern in ERROR_PATTERNS.iter() {
        for captures in pattern.captures_iter(content) {
            let description = captures.get(1).map_or("", |m| m.as_str().trim());
            if description.is_empty() {
                continue;
            }
            experiences.push(experience(
                description,
                &["Identified error message", "Analyzed stack trace", "Investigated root cause"],
                "Applied targeted fix",
                "Error resolved",
            ));
        }
    }

    for pattern in FIX_PATTERNS.iter() {
        for captures in pattern.captures_iter(content) {
            let solution = captures.get(1).map_or("", |m| m.as_str().trim());
            if solution.is_empty() || experiences.iter().any(|e| e.solution_applied == solution) {
                continue;
            }
            experiences.push(experience(
                "Issue requiring resolution",
                &["Analyzed problem", "Identified solution"],
                solution,
                "Successfully applied",
            ));
        }
    }

    experiences
}

fn project_structure_experiences(dir: &Path) -> Vec<DebuggingExperience> {
    let mut experiences = Vec::new();

    if dir.join("package.json").exists() && !dir.join("node_modules").exists() {
        experiences.push(experience(
            "JavaScript project with package.json but no node_modules",
            &[
                "Found package.json configuration file",
                "Checked for node_modules directory",
                "Identified missing dependencies installation",
            ],
            "Run npm install or yarn install to install dependencies",
            "Dependencies installed and project ready for development",
        ));
    }

    if has_python_sources(dir)
        && dir.join("requirements.txt").exists()
        && !dir.join("venv").exists()
        && !dir.join(".venv").exists()
    {
        experiences.push(experience(
            "Python project with requirements.txt but no visible virtual environment",
            &[
                "Noticed requirements.txt file in project",
                "Checked for virtual environment directories",
                "Identified potential dependency management issue",
            ],
            "Recommend creating and activating virtual environment",
            "Better dependency isolation and management",
        ));
    }

    if dir.join(".git").join("index").exists() {
        experiences.push(experience(
            "Active Git repository detected",
            &["Checked Git repository status", "Identified version control setup"],
            "Ensure changes are committed and pushed",
            "Version control properly managed",
        ));
    }

    experiences
}

fn has_python_sources(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries.flatten().any(|entry| {
                entry.path().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "py")
            })
        })
        .unwrap_or(false)
}

fn default_experience() -> DebuggingExperience {
    experience(
        "Session analysis and structured learning capture",
        &[
            "Reviewed current session context",
            "Identified opportunities for knowledge extraction",
            "Analyzed patterns in problem-solving approaches",
            "Structured insights for future retrieval",
        ],
        "Implemented systematic learning capture process",
        "Successfully extracted and structured session insights",
    )
}

fn experience(problem: &str, steps: &[&str], solution: &str, outcome: &str) -> DebuggingExperience {
    DebuggingExperience {
        problem_description: problem.to_string(),
        investigation_steps: steps.iter().map(|s| s.to_string()).collect(),
        solution_applied: solution.to_string(),
        outcome: outcome.to_string(),
    }
}
