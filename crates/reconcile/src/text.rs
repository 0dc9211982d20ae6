//! Description normalisation shared by the duplicate detector.

/// Lowercase alphanumeric words joined by single spaces.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The first `len` characters of the normalised text.
pub fn fragment(s: &str, len: usize) -> String {
    let normalized = normalize(s);
    normalized.chars().take(len).collect::<String>().trim_end().to_string()
}

/// Edit-distance similarity of two already-normalised strings, in [0.0, 1.0].
pub fn similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(a, b) as f32 / max_len as f32)
}

/// Levenshtein distance over chars, two rows of working space.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    // Keep the shorter string in the inner loop.
    let (a, b) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if a.is_empty() {
        return b.len();
    }

    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut curr = vec![0usize; a.len() + 1];

    for (j, cb) in b.iter().enumerate() {
        curr[0] = j + 1;
        for (i, ca) in a.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[i + 1] = (prev[i + 1] + 1).min(curr[i] + 1).min(prev[i] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[a.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_case_and_punctuation() {
        assert_eq!(normalize("  REWE  Sagt-Danke//1234 "), "rewe sagt danke 1234");
    }

    #[test]
    fn fragment_truncates_on_chars() {
        assert_eq!(fragment("Überweisung Miete März", 11), "überweisung");
        assert_eq!(fragment("AB CD", 3), "ab");
    }

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("cat", "bat"), 1);
        assert_eq!(levenshtein_distance("abcd", "abc"), 1);
        assert_eq!(
            levenshtein_distance("amazon", "amzn"),
            levenshtein_distance("amzn", "amazon")
        );
    }

    #[test]
    fn distance_counts_chars_not_bytes() {
        assert_eq!(levenshtein_distance("märz", "marz"), 1);
    }

    #[test]
    fn similarity_range() {
        assert_eq!(similarity("rewe", "rewe"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert!(similarity("amazon", "starbucks") < 0.5);
        assert!(similarity("rewe sagt danke 1234", "rewe sagt danke 1235") >= 0.9);
    }
}
