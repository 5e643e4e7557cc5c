//! Word-level text similarity shared by the quality auditor's description checks

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\b\w+\b").expect("word regex"));

/// Lower-cased word tokens in order of appearance
pub fn words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Similarity of two free texts in [0, 1]
///
/// `0.7 × Jaccard(word sets) + 0.3 × positional overlap`, where positional
/// overlap is the number of positions holding the same word in both texts
/// divided by the longer word count.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let wa = words(a);
    let wb = words(b);

    match (wa.is_empty(), wb.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let set_a: HashSet<&str> = wa.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = wb.iter().map(String::as_str).collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    let jaccard = intersection as f64 / union as f64;

    let aligned = wa.iter().zip(&wb).filter(|(x, y)| x == y).count();
    let positional = aligned as f64 / wa.len().max(wb.len()) as f64;

    (0.7 * jaccard + 0.3 * positional).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts() {
        let s = "High-performance HTTP server and reverse proxy";
        assert!((text_similarity(s, s) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_case_and_punctuation_ignored() {
        let sim = text_similarity("Fast web server.", "fast WEB server");
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_texts() {
        assert_eq!(text_similarity("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // words: [a, b, c] vs [a, b, d]; jaccard 2/4, positional 2/3
        let sim = text_similarity("a b c", "a b d");
        let expected = 0.7 * 0.5 + 0.3 * (2.0 / 3.0);
        assert!((sim - expected).abs() < 1e-9);
    }

    #[test]
    fn test_empty_texts() {
        assert_eq!(text_similarity("", ""), 1.0);
        assert_eq!(text_similarity("", "something"), 0.0);
        assert_eq!(text_similarity("...", "word"), 0.0);
    }
}
