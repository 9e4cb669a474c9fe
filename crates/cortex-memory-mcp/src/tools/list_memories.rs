//! `list_memories`: active items grouped by kind (spec §6).

use std::sync::Arc;

use cortex_memory_core::memory::Kind;
use cortex_memory_core::Engine;
use serde_json::{json, Value};

use super::{args_or_empty, optional_str, optional_usize};

const DEFAULT_LIMIT: usize = 20;

const ALL_KINDS: &[Kind] = &[
    Kind::Correction,
    Kind::Decision,
    Kind::Convention,
    Kind::BugFix,
    Kind::Insight,
    Kind::FailedSuggestion,
    Kind::ProvenPattern,
    Kind::Dependency,
];

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string" },
            "limit": { "type": "integer", "minimum": 1 }
        }
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let limit = optional_usize(&args, "limit").unwrap_or(DEFAULT_LIMIT);
    let requested_kind = optional_str(&args, "type").map(Kind::parse_name);

    let kinds: Vec<Kind> = match requested_kind {
        Some(k) => vec![k],
        None => ALL_KINDS.to_vec(),
    };

    let mut groups = serde_json::Map::new();
    let mut total = 0usize;
    for kind in kinds {
        let items = engine.storage().get_by_kind(kind, limit).map_err(|e| e.to_string())?;
        if items.is_empty() {
            continue;
        }
        total += items.len();
        groups.insert(kind.as_str().to_string(), json!(items));
    }

    Ok(json!({
        "totalCount": total,
        "groups": Value::Object(groups),
    }))
}
