// src/matching/string_metrics.rs - Edit distance and derived similarity percentages
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid punctuation pattern"));

/// Levenshtein distance over chars; insertion, deletion and substitution
/// each cost 1.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// `(max_len - distance) / max_len * 100`. Two empty strings are a perfect
/// match by convention.
pub fn similarity_percent(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let distance = edit_distance(a, b);
    ((max_len - distance) as f64 / max_len as f64) * 100.0
}

/// Lowercases, drops punctuation and collapses whitespace runs to a single
/// space.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and trim only. Used for codes where punctuation is significant.
pub fn normalize_code(s: &str) -> String {
    s.trim().to_lowercase()
}

/// 100 when both values normalize to the same string, otherwise 0.
pub fn exact_match_score(a: &str, b: &str) -> f64 {
    if normalize_code(a) == normalize_code(b) {
        100.0
    } else {
        0.0
    }
}

/// Percentage of the distinct words of the shorter side that also appear
/// on the other side.
pub fn word_overlap_percent(a: &str, b: &str) -> f64 {
    let a_norm = normalize(a);
    let b_norm = normalize(b);
    let words_a: HashSet<&str> = a_norm.split_whitespace().collect();
    let words_b: HashSet<&str> = b_norm.split_whitespace().collect();

    match (words_a.is_empty(), words_b.is_empty()) {
        (true, true) => return 100.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let shared = words_a.intersection(&words_b).count();
    let smaller = words_a.len().min(words_b.len());
    (shared as f64 / smaller as f64) * 100.0
}
