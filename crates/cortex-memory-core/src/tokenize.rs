//! Canonical tokenizer, stop words, and Jaccard similarity.
//!
//! Used by the quality gate, dedup check, contradiction detection, hot-topic
//! extraction, and consolidation. Keeping it in one place is what makes
//! invariant 3 ("at most one active item per (kind, normalized-intent)")
//! hold across every caller (spec §9 design notes).

use std::collections::HashSet;

/// Tokens shorter than this are dropped entirely (noise: "a", "to", "is").
const MIN_TOKEN_LEN: usize = 3;

/// Small stop-word set. Deliberately short: the gate and dedup logic only
/// need enough filtering to keep Jaccard meaningful, not a full NLP list.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "this", "that", "with", "from",
    "have", "has", "had", "not", "but", "you", "your", "our", "their", "its",
    "will", "would", "should", "could", "can", "all", "any", "some", "when",
    "than", "then", "them", "they", "use", "used", "using", "into", "over",
    "about", "also", "just", "what", "which", "who", "how", "why",
];

/// Lowercase, strip punctuation, drop tokens ≤2 chars, drop stop words.
///
/// This is the single canonical tokenizer referenced throughout the engine.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() > MIN_TOKEN_LEN - 1)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Tokenize into a deduplicated set, for similarity computations.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Jaccard similarity: |A ∩ B| / |A ∪ B| over stop-word-filtered lowercase
/// token sets. Returns 0.0 if both sets are empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);
    jaccard_similarity_sets(&set_a, &set_b)
}

/// Jaccard similarity over already-tokenized sets (avoids re-tokenizing when
/// comparing one item against many others, as consolidation does).
pub fn jaccard_similarity_sets(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

const AFFIRMATION_MARKERS: &[&str] = &["use ", "always "];
const NEGATION_MARKERS: &[&str] = &["never ", "avoid ", "don't ", "do not ", "stop using", "no longer"];

fn has_affirmation(text: &str) -> bool {
    let lower = text.to_lowercase();
    AFFIRMATION_MARKERS.iter().any(|m| lower.contains(m))
}

fn has_negation(text: &str) -> bool {
    let lower = text.to_lowercase();
    NEGATION_MARKERS.iter().any(|m| lower.contains(m))
}

/// True when one text reads as an affirmation ("use X", "always X") and the
/// other as its negation ("never X", "avoid X") — the narrow contradiction
/// pattern shared by the dedup check and contradiction detection.
pub fn mutually_exclusive(a: &str, b: &str) -> bool {
    (has_affirmation(a) && has_negation(b)) || (has_negation(a) && has_affirmation(b))
}

/// Split an identifier-like token on camelCase and snake_case boundaries.
///
/// Used by the fallback embedding hasher to recover word-level features from
/// code-flavored content ("getUserById" -> ["get", "user", "by", "id"]).
pub fn split_identifier(token: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in token.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        }
        prev_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts.retain(|p| !p.is_empty());
    if parts.is_empty() {
        vec![token.to_lowercase()]
    } else {
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_short_and_stop_tokens() {
        let toks = tokenize("Use the Zod validator for schema validation");
        assert!(!toks.contains(&"the".to_string()));
        assert!(!toks.contains(&"for".to_string()));
        assert!(toks.contains(&"zod".to_string()));
        assert!(toks.contains(&"validator".to_string()));
    }

    #[test]
    fn jaccard_identical_is_one() {
        let s = "always use const never var in this codebase";
        assert!((jaccard_similarity(s, s) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn jaccard_disjoint_is_zero() {
        assert_eq!(jaccard_similarity("apples oranges bananas", "xylophone zeppelin"), 0.0);
    }

    #[test]
    fn jaccard_empty_both_is_zero() {
        assert_eq!(jaccard_similarity("a to is", "a to is"), 0.0);
    }

    #[test]
    fn splits_camel_and_snake_case() {
        assert_eq!(split_identifier("getUserById"), vec!["get", "user", "by", "id"]);
        assert_eq!(split_identifier("max_retry_count"), vec!["max", "retry", "count"]);
        assert_eq!(split_identifier("simple"), vec!["simple"]);
    }

    #[test]
    fn detects_use_vs_never_pattern() {
        assert!(mutually_exclusive("Always use tabs for indentation", "Never use tabs for indentation"));
        assert!(mutually_exclusive("Avoid global state in reducers", "Use global state in reducers"));
    }

    #[test]
    fn agreeing_intents_are_not_contradictions() {
        assert!(!mutually_exclusive("Always use tabs for indentation", "Use tabs for all files"));
    }
}
