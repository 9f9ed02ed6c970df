//! Experience extraction from free-form session transcripts

use crate::types::DebuggingExperience;
use crate::utils::string::char_window;
use once_cell::sync::Lazy;
use regex::Regex;

/// At most this many experiences are pulled from one transcript
pub const MAX_EXPERIENCES: usize = 5;

/// Descriptions must be longer than this to count
const MIN_DESCRIPTION_CHARS: usize = 10;

/// How far past a problem line to look for its solution, in characters
const SOLUTION_WINDOW: usize = 500;

static PROBLEM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["error", "exception", "failed", "issue", "problem"]
        .iter()
        .map(|keyword| {
            Regex::new(&format!(r"(?im){}[:\s]+(.*?)(?:\n|$)", keyword))
                .expect("valid problem pattern")
        })
        .collect()
});

static SOLUTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)fixed[:\s]+(.*?)(?:\n|$)",
        r"(?i)solution[:\s]+(.*?)(?:\n|$)",
        r"(?i)resolved[:\s]+(.*?)(?:\n|$)",
        r"(?i)by\s+(.*?)(?:\n|$)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid solution pattern"))
    .collect()
});

/// Pull debugging experiences out of a transcript.
///
/// Patterns are tried in order (error, exception, failed, issue, problem)
/// and extraction stops once [`MAX_EXPERIENCES`] are found.
pub fn extract_experiences(content: &str) -> Vec<DebuggingExperience> {
    let mut experiences = Vec::new();

    for pattern in PROBLEM_PATTERNS.iter() {
        for captures in pattern.captures_iter(content) {
            let (Some(whole), Some(group)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let description = group.as_str().trim();
            if description.chars().count() <= MIN_DESCRIPTION_CHARS {
                continue;
            }

            let solution = find_nearby_solution(content, whole.start())
                .unwrap_or_else(|| "Applied appropriate fix".to_string());

            experiences.push(DebuggingExperience {
                problem_description: description.to_string(),
                investigation_steps: vec![
                    "Identified the error".to_string(),
                    "Analyzed the context".to_string(),
                    "Investigated potential causes".to_string(),
                ],
                solution_applied: solution,
                outcome: "Issue resolved".to_string(),
            });

            if experiences.len() >= MAX_EXPERIENCES {
                return experiences;
            }
        }
    }

    experiences
}

/// First solution-like phrase in the window following `position`
pub fn find_nearby_solution(content: &str, position: usize) -> Option<String> {
    let window = char_window(content, position, SOLUTION_WINDOW);

    SOLUTION_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(window)
            .and_then(|captures| captures.get(1))
            .map(|group| group.as_str().trim().to_string())
    })
}

/// Experience used when a transcript yields nothing
pub fn default_session_experience(session_type: &str) -> DebuggingExperience {
    DebuggingExperience {
        problem_description: format!("Session learning from {} session", session_type),
        investigation_steps: vec![
            "Analyzed session content".to_string(),
            "Extracted key insights".to_string(),
            "Identified patterns and solutions".to_string(),
        ],
        solution_applied: "Captured session knowledge for future reference".to_string(),
        outcome: "Session learning successfully extracted".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_error_with_nearby_solution() {
        let transcript = "Running tests\nError: connection refused on port 5432\n\
                          Checked the config.\nFixed: started the postgres container\n";
        let experiences = extract_experiences(transcript);

        assert_eq!(experiences.len(), 1);
        assert_eq!(
            experiences[0].problem_description,
            "connection refused on port 5432"
        );
        assert_eq!(
            experiences[0].solution_applied,
            "started the postgres container"
        );
        assert_eq!(experiences[0].outcome, "Issue resolved");
    }

    #[test]
    fn test_short_descriptions_ignored() {
        let experiences = extract_experiences("error: oops\nproblem: tiny");
        assert!(experiences.is_empty());
    }

    #[test]
    fn test_missing_solution_uses_placeholder() {
        let experiences = extract_experiences("Exception: NullPointerException in handler");
        assert_eq!(experiences.len(), 1);
        assert_eq!(experiences[0].solution_applied, "Applied appropriate fix");
    }

    #[test]
    fn test_at_most_five_experiences() {
        let transcript = (0..8)
            .map(|i| format!("error: something broke in module number {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(extract_experiences(&transcript).len(), MAX_EXPERIENCES);
    }

    #[test]
    fn test_solution_window_is_bounded() {
        let mut transcript = String::from("error: the build pipeline exploded\n");
        transcript.push_str(&"x".repeat(600));
        transcript.push_str("\nfixed: too far away\n");
        let experiences = extract_experiences(&transcript);
        assert_eq!(experiences[0].solution_applied, "Applied appropriate fix");
    }

    #[test]
    fn test_solution_window_handles_multibyte_text() {
        let transcript = format!("error: unicode → trouble here\n{}resolved: ok", "é".repeat(300));
        let experiences = extract_experiences(&transcript);
        assert_eq!(experiences[0].solution_applied, "ok");
    }

    #[test]
    fn test_solution_window_is_measured_in_characters() {
        // 400 two-byte characters: well inside 500 characters, past 500 bytes
        let transcript = format!(
            "error: the cache layer rejected writes\n{}\nfixed: raised the write quota\n",
            "ü".repeat(400)
        );
        assert!(transcript.find("fixed").unwrap() > SOLUTION_WINDOW);

        let experiences = extract_experiences(&transcript);
        assert_eq!(experiences[0].solution_applied, "raised the write quota");
        assert_eq!(
            find_nearby_solution(&transcript, 0).as_deref(),
            Some("raised the write quota")
        );
    }

    #[test]
    fn test_default_session_experience() {
        let experience = default_session_experience("refactoring");
        assert_eq!(
            experience.problem_description,
            "Session learning from refactoring session"
        );
        assert_eq!(experience.investigation_steps.len(), 3);
    }
}
