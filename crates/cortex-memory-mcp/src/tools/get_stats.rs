//! `get_stats`: basic counts and version info (spec §6).

use std::sync::Arc;

use cortex_memory_core::Engine;
use serde_json::{json, Value};

pub fn schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub async fn execute(engine: &Arc<Engine>, _arguments: Option<Value>) -> Result<Value, String> {
    let active = engine.storage().active_count().map_err(|e| e.to_string())?;
    let total = engine.storage().total_count().map_err(|e| e.to_string())?;

    Ok(json!({
        "version": cortex_memory_core::VERSION,
        "activeCount": active,
        "totalCount": total,
        "workspaceRoot": engine.workspace_root().display().to_string(),
    }))
}
