//! `verify_files`: surfaces file-scoped memories relevant to a set of paths
//! (spec §1 Non-goals: scanner plumbing specified only by the interface it
//! feeds into the store).

use std::sync::Arc;

use cortex_memory_core::Engine;
use serde_json::{json, Value};

use super::args_or_empty;

const PER_FILE_LIMIT: usize = 10;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "files": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["files"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let files = args
        .get("files")
        .and_then(|v| v.as_array())
        .ok_or_else(|| "missing required argument 'files'".to_string())?;

    let mut by_file = serde_json::Map::new();
    for file in files {
        let Some(path) = file.as_str() else { continue };
        let items = engine.storage().get_by_file(path, PER_FILE_LIMIT).map_err(|e| e.to_string())?;
        by_file.insert(path.to_string(), json!(items));
    }

    Ok(json!({ "byFile": Value::Object(by_file) }))
}
