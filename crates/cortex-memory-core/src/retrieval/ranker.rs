//! Ranker (spec §4.6): applies kind, access, recency, file-affinity,
//! attention, and confidence-decay multipliers on top of the fused score,
//! then stable-sorts the result.

use crate::aging::effective_importance;
use crate::memory::Kind;

use super::FusedHit;

const DAY_MS: i64 = 86_400_000;
const WEEK_MS: i64 = 7 * DAY_MS;

fn kind_boost(kind: Kind) -> f64 {
    match kind {
        Kind::Correction => 1.5,
        Kind::Decision => 1.3,
        Kind::Convention => 1.2,
        Kind::BugFix => 1.1,
        Kind::Insight => 1.0,
        Kind::Dependency => 0.8,
        Kind::FailedSuggestion | Kind::ProvenPattern => 1.0,
    }
}

fn access_boost(access_count: u32) -> f64 {
    1.0 + 0.1 * access_count as f64
}

fn recency_boost(timestamp: i64, now_ms: i64) -> f64 {
    let age = now_ms - timestamp;
    if age < DAY_MS {
        1.5
    } else if age < WEEK_MS {
        1.2
    } else {
        1.0
    }
}

fn file_affinity_boost(related_files: &[String], current_file: Option<&str>) -> f64 {
    match current_file {
        Some(current) => {
            let matches = related_files.iter().any(|f| f.contains(current) || current.contains(f.as_str()));
            if matches {
                1.5
            } else {
                1.0
            }
        }
        None => 1.0,
    }
}

/// Inferred intent of the current request (spec §4.6.1), derived from the
/// raw query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionMode {
    Debugging,
    Refactoring,
    Review,
    Coding,
}

const DEBUGGING_KEYWORDS: &[&str] = &["fix", "bug", "crash", "error", "broken", "issue", "regression"];
const REFACTORING_KEYWORDS: &[&str] = &["refactor", "rewrite", "restructure", "clean"];
const REVIEW_KEYWORDS: &[&str] = &["review", "audit", "check"];

impl AttentionMode {
    /// Classify from the raw query text. Falls back to `Coding` when no
    /// keyword class matches (spec §4.6.1).
    pub fn from_query(query: &str) -> Self {
        let lower = query.to_lowercase();
        let has_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if has_any(DEBUGGING_KEYWORDS) {
            AttentionMode::Debugging
        } else if has_any(REFACTORING_KEYWORDS) {
            AttentionMode::Refactoring
        } else if has_any(REVIEW_KEYWORDS) {
            AttentionMode::Review
        } else {
            AttentionMode::Coding
        }
    }

    /// Extra per-kind multiplier this mode applies on top of the base kind
    /// boost (spec §4.6.1).
    fn extra_boost(&self, kind: Kind) -> f64 {
        match (self, kind) {
            (AttentionMode::Debugging, Kind::BugFix) => 1.4,
            (AttentionMode::Debugging, Kind::Correction) => 1.1,
            (AttentionMode::Refactoring, Kind::Convention) => 1.3,
            (AttentionMode::Refactoring, Kind::ProvenPattern) => 1.2,
            (AttentionMode::Review, Kind::Correction) => 1.2,
            (AttentionMode::Review, Kind::Decision) => 1.1,
            (AttentionMode::Coding, Kind::Convention) => 1.2,
            (AttentionMode::Coding, Kind::Decision) => 1.1,
            _ => 1.0,
        }
    }
}

/// Stateless scorer; all inputs are passed per-call.
pub struct Ranker;

impl Ranker {
    /// Re-score and stable-sort a fused hit list (spec §4.6). `query` drives
    /// attention-mode inference; `current_file` drives file affinity.
    pub fn rank(
        mut hits: Vec<FusedHit>,
        query: &str,
        current_file: Option<&str>,
        now_ms: i64,
    ) -> Vec<FusedHit> {
        let mode = AttentionMode::from_query(query);

        for hit in &mut hits {
            let item = &hit.item;
            let multiplier = kind_boost(item.kind)
                * access_boost(item.access_count)
                * recency_boost(item.timestamp, now_ms)
                * file_affinity_boost(&item.related_files, current_file)
                * mode.extra_boost(item.kind)
                * effective_importance(item, now_ms);
            hit.score *= multiplier;
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.item.timestamp.cmp(&a.item.timestamp))
                .then_with(|| a.item.id.cmp(&b.item.id))
        });

        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debugging_mode_favors_bug_fixes() {
        let mode = AttentionMode::from_query("why is this crashing?");
        assert_eq!(mode, AttentionMode::Debugging);
        assert!(mode.extra_boost(Kind::BugFix) > mode.extra_boost(Kind::Convention));
    }

    #[test]
    fn default_mode_is_coding() {
        assert_eq!(AttentionMode::from_query("add a new endpoint"), AttentionMode::Coding);
    }

    #[test]
    fn file_affinity_matches_substring_either_way() {
        let files = vec!["src/auth/login.rs".to_string()];
        assert_eq!(file_affinity_boost(&files, Some("login.rs")), 1.5);
        assert_eq!(file_affinity_boost(&files, Some("unrelated.rs")), 1.0);
    }
}
