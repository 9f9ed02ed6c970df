//! String utility functions for safe UTF-8 text manipulation

/// Safely truncate a string at a character boundary, adding ellipsis if truncated.
///
/// Unlike naive byte slicing (`&s[..n]`), this never splits a multi-byte
/// UTF-8 character.
///
/// # Examples
/// ```
/// use learnbridge_core::utils::string::truncate_at_char_boundary;
///
/// assert_eq!(truncate_at_char_boundary("hello world", 5), "hello...");
/// assert_eq!(truncate_at_char_boundary("hello", 10), "hello");
/// assert_eq!(truncate_at_char_boundary("héllo wörld", 7), "héllo w...");
/// ```
pub fn truncate_at_char_boundary(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", take_chars(s, max_chars))
    }
}

/// First `max_chars` characters of `s`, without any marker
pub fn take_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Slice of at most `len` characters starting at byte `start`. A start
/// inside a character moves forward to the next boundary.
pub fn char_window(s: &str, start: usize, len: usize) -> &str {
    let mut begin = start.min(s.len());
    while !s.is_char_boundary(begin) {
        begin += 1;
    }
    let rest = &s[begin..];
    let end = rest
        .char_indices()
        .nth(len)
        .map_or(rest.len(), |(offset, _)| offset);
    &rest[..end]
}

/// Upper-case the first character and lower-case the rest
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// True when `haystack` contains any of `needles`
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii_short() {
        assert_eq!(truncate_at_char_boundary("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_ascii_exact() {
        assert_eq!(truncate_at_char_boundary("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_empty() {
        assert_eq!(truncate_at_char_boundary("", 5), "");
    }

    #[test]
    fn test_truncate_multibyte_arrow() {
        let text = "Phase 4.1→4.2 complete";
        let result = truncate_at_char_boundary(text, 10);
        assert_eq!(result, "Phase 4.1→...");
    }

    #[test]
    fn test_take_chars_emoji() {
        assert_eq!(take_chars("🎉🎊🎈", 2), "🎉🎊");
        assert_eq!(take_chars("abc", 10), "abc");
    }

    #[test]
    fn test_char_window_counts_characters() {
        let text = "ab→cd";
        // '→' occupies bytes 2..5
        assert_eq!(char_window(text, 0, 3), "ab→");
        assert_eq!(char_window(text, 3, 10), "cd");
        assert_eq!(char_window(text, 2, 2), "→c");
        assert_eq!(char_window(text, 100, 10), "");
        assert_eq!(char_window("éééé", 0, 2), "éé");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("checked LOGS"), "Checked logs");
        assert_eq!(capitalize(""), "");
    }
}
