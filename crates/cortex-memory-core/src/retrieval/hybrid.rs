//! Query expansion, parallel fan-out, and weighted fusion (spec §4.5).

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::embeddings::Embedder;
use crate::error::Result;
use crate::memory::Item;
use crate::storage::Storage;

use super::FilterSet;

const MAX_EXPANDED_TERMS: usize = 8;
const FTS_WEIGHT: f64 = 0.35;
const VECTOR_WEIGHT: f64 = 0.50;
const FILE_WEIGHT: f64 = 0.15;

/// Synonym classes: every term in a group expands to every other term in
/// that group (the reverse mapping the spec calls for falls out for free).
static SYNONYM_GROUPS: &[&[&str]] = &[
    &["auth", "authentication", "login", "signin"],
    &["db", "database", "sql", "postgres", "mongodb"],
    &["error", "bug", "fix", "issue", "crash"],
    &["api", "endpoint", "route", "rest", "graphql"],
];

static SYNONYMS: LazyLock<HashMap<&'static str, Vec<&'static str>>> = LazyLock::new(|| {
    let mut map: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for group in SYNONYM_GROUPS {
        for term in *group {
            let others: Vec<&'static str> = group.iter().copied().filter(|t| t != term).collect();
            map.insert(term, others);
        }
    }
    map
});

/// Expand a raw query into at most `MAX_EXPANDED_TERMS` whitespace-tokenized,
/// lowercased, synonym-widened terms (spec §4.5 step 1).
fn expand_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for token in query.split_whitespace() {
        let lower = token.to_lowercase();
        if lower.chars().count() <= 2 {
            continue;
        }
        if seen.insert(lower.clone()) {
            terms.push(lower.clone());
        }
        if let Some(synonyms) = SYNONYMS.get(lower.as_str()) {
            for syn in synonyms {
                if terms.len() >= MAX_EXPANDED_TERMS {
                    break;
                }
                if seen.insert(syn.to_string()) {
                    terms.push(syn.to_string());
                }
            }
        }
        if terms.len() >= MAX_EXPANDED_TERMS {
            break;
        }
    }
    terms.truncate(MAX_EXPANDED_TERMS);
    terms
}

fn fts_or_query(terms: &[String]) -> String {
    terms.join(" OR ")
}

/// Request parameters for `HybridRetriever::search` (spec §4.5 inputs).
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub query: String,
    pub current_file: Option<String>,
    pub max_results: usize,
    pub filters: FilterSet,
}

/// One item surviving fusion, with its combined score and the union of the
/// sub-search methods that surfaced it.
#[derive(Debug, Clone)]
pub struct FusedHit {
    pub item: Item,
    pub score: f64,
    pub match_methods: Vec<String>,
}

/// Deterministic merge layer: never applies boosts beyond source-weighting
/// (spec §4.5). Ranking happens downstream in `Ranker`.
pub struct HybridRetriever;

impl HybridRetriever {
    /// Run query expansion, fan out to FTS/vector/file sub-searches, fuse
    /// by weighted score, and apply the filter set. `embedder` is optional:
    /// when absent (or embedding fails), vector search is simply skipped.
    pub fn search(
        storage: &Storage,
        embedder: Option<&dyn Embedder>,
        request: &RetrievalRequest,
    ) -> Result<Vec<FusedHit>> {
        let max_results = request.max_results.min(50).max(1);
        let fanout_limit = max_results * 2;

        let expanded = expand_terms(&request.query);
        let fts_query = if expanded.is_empty() { request.query.clone() } else { fts_or_query(&expanded) };

        let mut fts_hits = storage.search_fts(&fts_query, fanout_limit)?;
        if fts_hits.is_empty() && !expanded.is_empty() {
            // Expansion produced no hits; re-run with the original query
            // rather than leaving the caller with nothing (spec §4.5 step 1).
            fts_hits = storage.search_fts(&request.query, fanout_limit)?;
        }

        let vector_hits = match embedder {
            Some(e) => match e.embed(&request.query) {
                Ok(vec) => storage.search_vector(&vec, fanout_limit)?,
                Err(_) => Vec::new(),
            },
            None => Vec::new(),
        };

        let file_hits = match &request.current_file {
            Some(path) => storage.get_by_file(path, fanout_limit)?,
            None => Vec::new(),
        };

        let mut fused: HashMap<String, FusedHit> = HashMap::new();

        for hit in fts_hits {
            let entry = fused.entry(hit.item.id.clone()).or_insert_with(|| FusedHit {
                item: hit.item.clone(),
                score: 0.0,
                match_methods: Vec::new(),
            });
            entry.score += hit.score * FTS_WEIGHT;
            if !entry.match_methods.iter().any(|m| m == "fts") {
                entry.match_methods.push("fts".to_string());
            }
        }

        for hit in vector_hits {
            let entry = fused.entry(hit.item.id.clone()).or_insert_with(|| FusedHit {
                item: hit.item.clone(),
                score: 0.0,
                match_methods: Vec::new(),
            });
            entry.score += hit.score * VECTOR_WEIGHT;
            if !entry.match_methods.iter().any(|m| m == "vector") {
                entry.match_methods.push("vector".to_string());
            }
        }

        for (rank, item) in file_hits.into_iter().enumerate() {
            // File-scoped recency has no intrinsic score; weight by rank
            // position so the most-recent file-affine item scores highest.
            let recency_score = 1.0 - (rank as f64 / fanout_limit.max(1) as f64);
            let entry = fused
                .entry(item.id.clone())
                .or_insert_with(|| FusedHit { item: item.clone(), score: 0.0, match_methods: Vec::new() });
            entry.score += recency_score * FILE_WEIGHT;
            if !entry.match_methods.iter().any(|m| m == "file") {
                entry.match_methods.push("file".to_string());
            }
        }

        let mut results: Vec<FusedHit> =
            fused.into_values().filter(|hit| request.filters.passes(&hit.item)).collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.item.timestamp.cmp(&a.item.timestamp))
                .then_with(|| a.item.id.cmp(&b.item.id))
        });

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_synonym_group() {
        let terms = expand_terms("auth error");
        assert!(terms.contains(&"auth".to_string()));
        assert!(terms.contains(&"login".to_string()));
        assert!(terms.contains(&"bug".to_string()));
    }

    #[test]
    fn drops_short_tokens() {
        let terms = expand_terms("a to db");
        assert!(!terms.contains(&"a".to_string()));
        assert!(!terms.contains(&"to".to_string()));
        assert!(terms.contains(&"db".to_string()));
    }

    #[test]
    fn caps_at_eight_terms() {
        let terms = expand_terms("auth db error api");
        assert!(terms.len() <= MAX_EXPANDED_TERMS);
    }
}
