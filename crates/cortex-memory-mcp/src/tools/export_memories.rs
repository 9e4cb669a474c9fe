//! `export_memories`: produces the versioned export bundle (spec §6).

use std::sync::Arc;

use cortex_memory_core::Engine;
use serde_json::{json, Value};

/// Bundle format version (spec §6). Bumping this is a breaking change for
/// `import_memories`.
pub const BUNDLE_VERSION: u32 = 1;

pub fn schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub async fn execute(engine: &Arc<Engine>, _arguments: Option<Value>) -> Result<Value, String> {
    let items = engine.storage().all_active().map_err(|e| e.to_string())?;

    let memories: Vec<Value> = items
        .iter()
        .map(|item| {
            let timestamp_iso = chrono::DateTime::from_timestamp_millis(item.timestamp)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default();
            json!({
                "id": item.id,
                "type": item.kind.as_str(),
                "intent": item.intent,
                "action": item.action,
                "reason": item.reason,
                "tags": item.tags,
                "relatedFiles": item.related_files,
                "confidence": item.confidence,
                "importance": item.importance,
                "accessCount": item.access_count,
                "createdAt": item.created_at,
                "timestamp": timestamp_iso,
            })
        })
        .collect();

    Ok(json!({
        "version": BUNDLE_VERSION,
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "memoryCount": memories.len(),
        "memories": memories,
    }))
}
