//! `recall_memory`: hybrid search + rank, with reinforcement touch and
//! 1-hop graph enrichment on the results (spec §2, §4.9, §6).

use std::sync::Arc;

use cortex_memory_core::retrieval::{FilterSet, RetrievalRequest};
use cortex_memory_core::Engine;
use serde_json::{json, Value};

use super::{args_or_empty, optional_str, optional_usize, require_str};

const MAX_QUERY_LEN: usize = 1000;
const DEFAULT_MAX_RESULTS: usize = 10;
const MAX_MAX_RESULTS: usize = 50;
/// How many top hits get 1-hop neighbor enrichment (spec §2 read path).
const ENRICH_TOP_N: usize = 3;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "maxLength": MAX_QUERY_LEN },
            "maxResults": { "type": "integer", "minimum": 1, "maximum": MAX_MAX_RESULTS },
            "currentFile": { "type": "string" }
        },
        "required": ["query"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let query = require_str(&args, "query")?;
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(format!("query exceeds {} characters", MAX_QUERY_LEN));
    }
    let max_results = optional_usize(&args, "maxResults").unwrap_or(DEFAULT_MAX_RESULTS).min(MAX_MAX_RESULTS).max(1);
    let current_file = optional_str(&args, "currentFile").map(str::to_string);

    let now_ms = chrono::Utc::now().timestamp_millis();
    let request = RetrievalRequest {
        query: query.to_string(),
        current_file,
        max_results,
        filters: FilterSet::default(),
    };

    let hits = engine.recall(&request, now_ms).map_err(|e| e.to_string())?;

    let mut results = Vec::with_capacity(hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        let _ = engine.storage().touch(&hit.item.id);

        let related = if rank < ENRICH_TOP_N {
            engine
                .storage()
                .get_related(&hit.item.id, 1, 3)
                .unwrap_or_default()
                .into_iter()
                .map(|(item, hops)| json!({ "item": item, "hops": hops }))
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        results.push(json!({
            "item": hit.item,
            "score": hit.score,
            "matchMethods": hit.match_methods,
            "related": related,
        }));
    }

    Ok(json!({
        "query": query,
        "count": results.len(),
        "results": results,
    }))
}
