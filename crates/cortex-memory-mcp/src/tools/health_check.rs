//! `health_check`: the one tool that must answer even in degraded mode
//! (spec §7) — it takes the engine as `Option` rather than the common
//! `Arc<Engine>` shape every other tool uses, because the whole point of
//! this tool is to stay reachable when the engine failed to construct.

use std::sync::Arc;

use cortex_memory_core::Engine;
use serde_json::{json, Value};

pub fn schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub async fn execute(engine: Option<&Arc<Engine>>, init_error: Option<&str>) -> Value {
    match engine {
        Some(engine) => {
            let active = engine.storage().active_count().ok();
            let total = engine.storage().total_count().ok();
            json!({
                "status": "healthy",
                "version": cortex_memory_core::VERSION,
                "activeCount": active,
                "totalCount": total,
            })
        }
        None => json!({
            "status": "degraded",
            "version": cortex_memory_core::VERSION,
            "reason": init_error.unwrap_or("storage failed to initialize"),
        }),
    }
}
