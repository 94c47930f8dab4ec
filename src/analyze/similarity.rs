// src/analyze/similarity.rs
//! Headline similarity: Jaccard index over significant word sets.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Anything that is neither a word character nor whitespace (Unicode-aware).
static RE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation regex"));

/// Lower-cased, punctuation-free tokens longer than 2 characters.
pub fn significant_tokens(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    let clean = RE_PUNCT.replace_all(&lower, "");
    clean
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity in [0, 1] between two headlines; 0 when neither has a qualifying token.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    jaccard(&significant_tokens(a), &significant_tokens(b))
}

/// Jaccard index of two precomputed token sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}
