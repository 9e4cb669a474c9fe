//! `Edge`: a directed, typed relation between two items.

use serde::{Deserialize, Serialize};

/// Relation type for an edge. The triple (source, target, relation) is
/// unique (spec §3 invariant 5).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    RelatedTo,
    SupersededBy,
    ReplacedBy,
    CausedBy,
    Contradicts,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::RelatedTo => "related_to",
            Relation::SupersededBy => "superseded_by",
            Relation::ReplacedBy => "replaced_by",
            Relation::CausedBy => "caused_by",
            Relation::Contradicts => "contradicts",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "related_to" => Some(Relation::RelatedTo),
            "superseded_by" => Some(Relation::SupersededBy),
            "replaced_by" => Some(Relation::ReplacedBy),
            "caused_by" => Some(Relation::CausedBy),
            "contradicts" => Some(Relation::Contradicts),
            _ => None,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge between two items. Edges do not cascade-delete when an
/// item is deactivated (spec §3): they remain readable so graph history
/// survives soft-deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub relation: Relation,
    pub weight: f64,
    pub timestamp: i64,
}
