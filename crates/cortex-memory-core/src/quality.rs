//! Quality gate: a pure predicate run before persistence (spec §4.3).
//!
//! Rejection surfaces the specific triggering rule so the caller sees a
//! structured reason rather than a generic "invalid" message. Dedup is
//! handled separately by the caller (storage layer): this module only
//! classifies "would this be a useful item to store", it never touches
//! the database.

use crate::tokenize;

/// Content length bounds enforced at the quality-gate layer (spec §4.3,
/// §8 boundary behaviors: 14 chars rejected, 15 accepted, 500 accepted).
pub const MIN_CONTENT_LEN: usize = 15;
pub const MAX_CONTENT_LEN: usize = 500;

/// A single character repeating more than this many times consecutively
/// is treated as noise ("AAAAAAAAAA...").
const MAX_CONSECUTIVE_REPEAT: usize = 8;

/// All-caps content longer than this is rejected as shouting/boilerplate.
const ALL_CAPS_MIN_LEN: usize = 20;

/// Known-generic phrases that carry no retrievable signal.
const GENERIC_BLACKLIST: &[&str] = &[
    "use best practices",
    "follow conventions",
    "handle errors",
    "write clean code",
    "follow best practices",
    "make it more robust",
    "improve code quality",
];

/// The rule that caused a quality-gate rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionRule {
    TooShort,
    TooLong,
    GenericBlacklist,
    AllCapsShouting,
    RepeatedCharacter,
    BareUrlOrWhitespace,
}

impl RejectionRule {
    pub fn message(&self) -> &'static str {
        match self {
            RejectionRule::TooShort => "content is shorter than 15 characters",
            RejectionRule::TooLong => "content exceeds 500 characters",
            RejectionRule::GenericBlacklist => "content matches a known-generic blacklisted phrase",
            RejectionRule::AllCapsShouting => "content is all-caps and longer than 20 characters",
            RejectionRule::RepeatedCharacter => "a single character repeats more than 8 times consecutively",
            RejectionRule::BareUrlOrWhitespace => "content is a bare URL or whitespace-only",
        }
    }
}

/// Check `content` against every quality rule, returning the first rule it
/// violates (rules are checked in a fixed order so rejections are
/// deterministic).
pub fn check(content: &str) -> Result<(), RejectionRule> {
    let trimmed = content.trim();

    if trimmed.is_empty() || is_whitespace_only(content) || is_bare_url(trimmed) {
        return Err(RejectionRule::BareUrlOrWhitespace);
    }
    if trimmed.chars().count() < MIN_CONTENT_LEN {
        return Err(RejectionRule::TooShort);
    }
    if trimmed.chars().count() > MAX_CONTENT_LEN {
        return Err(RejectionRule::TooLong);
    }
    if matches_generic_blacklist(trimmed) {
        return Err(RejectionRule::GenericBlacklist);
    }
    if is_all_caps_shouting(trimmed) {
        return Err(RejectionRule::AllCapsShouting);
    }
    if has_excessive_repeat(trimmed) {
        return Err(RejectionRule::RepeatedCharacter);
    }
    Ok(())
}

fn is_whitespace_only(content: &str) -> bool {
    !content.is_empty() && content.trim().is_empty()
}

fn is_bare_url(trimmed: &str) -> bool {
    let single_token = trimmed.split_whitespace().count() == 1;
    single_token && (trimmed.starts_with("http://") || trimmed.starts_with("https://") || trimmed.starts_with("www."))
}

fn matches_generic_blacklist(trimmed: &str) -> bool {
    let lower = trimmed.to_lowercase();
    GENERIC_BLACKLIST.iter().any(|phrase| lower.contains(phrase))
}

fn is_all_caps_shouting(trimmed: &str) -> bool {
    let letters: String = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    letters.chars().count() > ALL_CAPS_MIN_LEN && letters.chars().all(|c| c.is_uppercase())
}

fn has_excessive_repeat(trimmed: &str) -> bool {
    let mut run_char = None;
    let mut run_len = 0usize;
    for c in trimmed.chars() {
        if Some(c) == run_char {
            run_len += 1;
        } else {
            run_char = Some(c);
            run_len = 1;
        }
        if run_len > MAX_CONSECUTIVE_REPEAT {
            return true;
        }
    }
    false
}

/// Jaccard threshold above which two active items of the same kind are
/// considered duplicates ("dedup, not reject" — spec §4.3).
pub const DEDUP_JACCARD_THRESHOLD: f64 = 0.7;

/// True when `a` and `b` are similar enough to be treated as the same
/// observation for dedup purposes.
///
/// Bag-of-words similarity alone isn't enough: "always use const, never var"
/// and "always use var, never const" share every token and would otherwise
/// register as a 1.0 match, silently swallowing what is actually a
/// contradiction (spec §8 scenario 2). Mutually-exclusive pairs are excluded
/// here so they fall through to contradiction detection instead.
pub fn is_duplicate_intent(a: &str, b: &str) -> bool {
    tokenize::jaccard_similarity(a, b) >= DEDUP_JACCARD_THRESHOLD && !tokenize::mutually_exclusive(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_14_vs_15_chars() {
        let fourteen = "a".repeat(14);
        let fifteen = "a".repeat(15);
        assert_eq!(check(&fourteen), Err(RejectionRule::TooShort));
        assert!(check(&fifteen).is_ok());
    }

    /// Builds a non-repeating, non-blacklisted sentence of exactly `len` chars.
    fn filler_of_len(len: usize) -> String {
        let words = [
            "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel",
            "india", "juliet", "kilo", "lima", "mike", "november", "oscar", "papa",
        ];
        let mut s = String::new();
        let mut i = 0;
        while s.chars().count() < len {
            if !s.is_empty() {
                s.push(' ');
            }
            s.push_str(words[i % words.len()]);
            i += 1;
        }
        s.chars().take(len).collect()
    }

    #[test]
    fn boundary_500_accepted_501_rejected() {
        let five_hundred = filler_of_len(500);
        assert_eq!(five_hundred.chars().count(), 500);
        assert!(check(&five_hundred).is_ok());

        let over = filler_of_len(501);
        assert_eq!(check(&over), Err(RejectionRule::TooLong));
    }

    #[test]
    fn rejects_generic_blacklist_case_insensitive() {
        assert_eq!(
            check("Please USE BEST PRACTICES when writing this function"),
            Err(RejectionRule::GenericBlacklist)
        );
    }

    #[test]
    fn rejects_all_caps_shouting() {
        assert_eq!(
            check("THIS IS A VERY LOUD MESSAGE ABOUT SOMETHING IMPORTANT"),
            Err(RejectionRule::AllCapsShouting)
        );
    }

    #[test]
    fn rejects_repeated_character() {
        assert_eq!(
            check("loooooooooooooooooook at this please fix it"),
            Err(RejectionRule::RepeatedCharacter)
        );
    }

    #[test]
    fn rejects_bare_url() {
        assert_eq!(
            check("https://example.com/some/long/path/that/is/long/enough"),
            Err(RejectionRule::BareUrlOrWhitespace)
        );
    }

    #[test]
    fn rejects_whitespace_only() {
        assert_eq!(check("                         "), Err(RejectionRule::BareUrlOrWhitespace));
    }

    #[test]
    fn accepts_reasonable_content() {
        assert!(check("Always use Zod for schema validation in this project, never Joi").is_ok());
    }

    #[test]
    fn dedup_similar_intents() {
        assert!(is_duplicate_intent(
            "Always use functional components in React",
            "Always use functional components in React apps"
        ));
    }
}
