//! Shared utility functions
//!
//! Spelling suggestions for unknown identifiers and methods.

/// Maximum edit distance for a "did you mean" suggestion.
pub const SUGGESTION_THRESHOLD: usize = 2;

/// Calculate Levenshtein edit distance between two strings, ignoring ASCII case.
/// Uses O(min(m,n)) space with two-row optimization.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().map(|c| c.to_ascii_uppercase()).collect();
    let b_chars: Vec<char> = b.chars().map(|c| c.to_ascii_uppercase()).collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Find the closest candidate within `threshold` edits.
///
/// Ties keep the first candidate seen, so callers control priority by order.
pub fn find_similar_name<I, S>(name: &str, candidates: I, threshold: usize) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<(usize, String)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if candidate.eq_ignore_ascii_case(name) {
            continue;
        }
        let distance = levenshtein_distance(name, candidate);
        if distance > threshold {
            continue;
        }
        if best.as_ref().is_none_or(|(d, _)| distance < *d) {
            best = Some((distance, candidate.to_string()));
        }
    }
    best.map(|(_, name)| name)
}

/// Variable storage key: the name without its type suffix (`a$` and `a` share a slot).
pub fn strip_type_suffix(name: &str) -> &str {
    name.strip_suffix(['$', '%', '!', '&']).unwrap_or(name)
}

/// Format a "did you mean" suffix for an error message.
pub fn format_suggestion_hint(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein_distance("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_ignores_case() {
        assert_eq!(levenshtein_distance("Length", "LENGTH"), 0);
    }

    #[test]
    fn test_levenshtein_empty_strings() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", "xyz"), 3);
    }

    #[test]
    fn test_levenshtein_single_edit() {
        assert_eq!(levenshtein_distance("cat", "bat"), 1);
        assert_eq!(levenshtein_distance("cat", "cats"), 1);
        assert_eq!(levenshtein_distance("cats", "cat"), 1);
    }

    #[test]
    fn test_find_similar_picks_closest() {
        let names = ["Length", "Lerp", "Normalize"];
        assert_eq!(find_similar_name("Lenght", names, 2).as_deref(), Some("Length"));
    }

    #[test]
    fn test_find_similar_respects_threshold() {
        let names = ["Normalize"];
        assert_eq!(find_similar_name("Len", names, SUGGESTION_THRESHOLD), None);
    }

    #[test]
    fn test_find_similar_skips_exact_name() {
        let names = ["len", "lens"];
        assert_eq!(find_similar_name("LEN", names, 2).as_deref(), Some("lens"));
    }

    #[test]
    fn test_strip_type_suffix() {
        assert_eq!(strip_type_suffix("name$"), "name");
        assert_eq!(strip_type_suffix("n%"), "n");
        assert_eq!(strip_type_suffix("x#1"), "x#1");
        assert_eq!(strip_type_suffix("plain"), "plain");
    }

    #[test]
    fn test_format_suggestion_hint() {
        assert_eq!(format_suggestion_hint(Some("x")), " (did you mean 'x'?)");
        assert_eq!(format_suggestion_hint(None), "");
    }
}
