//! `verify_code`: checks a code snippet against stored corrections and
//! conventions via full-text search (spec §1 Non-goals: scanner plumbing
//! specified only by the interface it feeds into the store).

use std::sync::Arc;

use cortex_memory_core::memory::Kind;
use cortex_memory_core::Engine;
use serde_json::{json, Value};

use super::{args_or_empty, require_str};

const MATCH_LIMIT: usize = 10;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": { "type": "string" },
            "language": { "type": "string" }
        },
        "required": ["code"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let code = require_str(&args, "code")?;

    let hits = engine.storage().search_fts(code, MATCH_LIMIT).map_err(|e| e.to_string())?;
    let relevant: Vec<_> = hits
        .into_iter()
        .filter(|hit| matches!(hit.item.kind, Kind::Correction | Kind::Convention | Kind::BugFix))
        .map(|hit| json!({ "item": hit.item, "score": hit.score }))
        .collect();

    Ok(json!({
        "checked": true,
        "potentialViolations": relevant,
    }))
}
