//! `Item`: the atomic persisted observation.

use serde::{Deserialize, Serialize};

use super::UNKNOWN_OUTCOME;

/// Item category. Governs the kind-boost multiplier applied by the ranker
/// (§4.6) and several aging-engine rules (§4.7).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    Correction,
    Decision,
    Convention,
    BugFix,
    Insight,
    FailedSuggestion,
    ProvenPattern,
    Dependency,
}

impl Kind {
    /// Stable lowercase identifier, used as the FTS/tag-adjacent string form
    /// and for parsing tool arguments at the RPC boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Correction => "correction",
            Kind::Decision => "decision",
            Kind::Convention => "convention",
            Kind::BugFix => "bug_fix",
            Kind::Insight => "insight",
            Kind::FailedSuggestion => "failed_suggestion",
            Kind::ProvenPattern => "proven_pattern",
            Kind::Dependency => "dependency",
        }
    }

    /// Parse from a case-insensitive name; unknown names fall back to
    /// `Insight` (the least consequential kind boost), matching the
    /// teacher's `NodeType::parse_name` fallback convention.
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "correction" => Kind::Correction,
            "decision" => Kind::Decision,
            "convention" => Kind::Convention,
            "bug_fix" | "bugfix" => Kind::BugFix,
            "insight" => Kind::Insight,
            "failed_suggestion" | "failedsuggestion" => Kind::FailedSuggestion,
            "proven_pattern" | "provenpattern" => Kind::ProvenPattern,
            "dependency" => Kind::Dependency,
            _ => Kind::Insight,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The atomic persisted observation (spec §3).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub kind: Kind,
    /// Short normalized statement, 1-300 chars. The primary searchable string.
    pub intent: String,
    /// Verb-form restatement, 0-500 chars.
    #[serde(default)]
    pub action: String,
    pub reason: Option<String>,
    pub impact: Option<String>,
    /// Defaults to `"unknown"` (spec §3) rather than `None`.
    pub outcome: String,
    #[serde(default)]
    pub related_files: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: i64,
    pub timestamp: i64,
    pub confidence: f64,
    pub importance: f64,
    pub access_count: u32,
    pub last_accessed: i64,
    pub is_active: bool,
    pub superseded_by: Option<String>,
    pub source_event_id: Option<i64>,
}

impl Item {
    /// Normalized (lowercased, trimmed) intent, used as the dedup/uniqueness key.
    pub fn normalized_intent(&self) -> String {
        normalize_intent(&self.intent)
    }
}

/// Lowercase + collapse whitespace, for the (kind, normalized-intent) uniqueness key.
pub fn normalize_intent(intent: &str) -> String {
    intent.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Caller-supplied fields for `MemoryStore::add`. Everything else (`id`,
/// `created_at`, `access_count`, `is_active`, ...) is assigned at insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub kind: Kind,
    pub intent: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub related_files: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Caller-supplied event time; defaults to "now" if absent.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub source_event_id: Option<i64>,
}

fn default_confidence() -> f64 {
    0.8
}

impl NewItem {
    pub fn outcome_or_unknown(&self) -> String {
        self.outcome.clone().unwrap_or_else(|| UNKNOWN_OUTCOME.to_string())
    }
}

/// Partial field replacement for `MemoryStore::update` (spec §4.4). `None`
/// leaves a field untouched; `Some` replaces it outright.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    pub intent: Option<String>,
    pub action: Option<String>,
    pub reason: Option<String>,
    pub impact: Option<String>,
    pub outcome: Option<String>,
    pub related_files: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub confidence: Option<f64>,
    pub importance: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_as_str() {
        for k in [
            Kind::Correction,
            Kind::Decision,
            Kind::Convention,
            Kind::BugFix,
            Kind::Insight,
            Kind::FailedSuggestion,
            Kind::ProvenPattern,
            Kind::Dependency,
        ] {
            assert_eq!(Kind::parse_name(k.as_str()), k);
        }
    }

    #[test]
    fn unknown_kind_falls_back_to_insight() {
        assert_eq!(Kind::parse_name("nonsense"), Kind::Insight);
    }

    #[test]
    fn normalize_intent_collapses_whitespace_and_case() {
        assert_eq!(normalize_intent("  Always   Use Zod  "), "always use zod");
    }
}
