//! `import_memories`: idempotent import of an export bundle, keyed on
//! `(type, lowercased-intent)` (spec §6). Rejects unknown bundle versions;
//! otherwise errors are counted, never raised.

use std::collections::HashSet;
use std::sync::Arc;

use cortex_memory_core::memory::{normalize_intent, Kind, NewItem};
use cortex_memory_core::Engine;
use serde_json::Value;

use super::args_or_empty;
use super::export_memories::BUNDLE_VERSION;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "data": { "type": "object" }
        },
        "required": ["data"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let data = args.get("data").ok_or_else(|| "missing required argument 'data'".to_string())?;

    let version = data.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
    if version != BUNDLE_VERSION as u64 {
        return Err(format!("unknown export bundle version: {}", version));
    }

    let memories = data.get("memories").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    // Pre-load the existing (kind, normalized-intent) keys once so the
    // idempotency check doesn't re-scan storage per incoming memory.
    let mut existing: HashSet<(Kind, String)> = HashSet::new();
    for item in engine.storage().all_active().map_err(|e| e.to_string())? {
        existing.insert((item.kind, item.normalized_intent()));
    }

    let mut imported = 0usize;
    let mut skipped = 0usize;
    let mut errors = 0usize;

    for memory in memories {
        let Some(kind_str) = memory.get("type").and_then(|v| v.as_str()) else {
            errors += 1;
            continue;
        };
        let Some(intent) = memory.get("intent").and_then(|v| v.as_str()) else {
            errors += 1;
            continue;
        };
        let kind = Kind::parse_name(kind_str);
        let key = (kind, normalize_intent(intent));
        if existing.contains(&key) {
            skipped += 1;
            continue;
        }

        let new_item = NewItem {
            kind,
            intent: intent.to_string(),
            action: memory.get("action").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            reason: memory.get("reason").and_then(|v| v.as_str()).map(str::to_string),
            impact: None,
            outcome: None,
            related_files: memory
                .get("relatedFiles")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            tags: memory
                .get("tags")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            timestamp: memory.get("createdAt").and_then(|v| v.as_i64()),
            confidence: memory.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.8),
            source_event_id: None,
        };

        match engine.storage().add(new_item) {
            Ok(outcome) => {
                if let Some(importance) = memory.get("importance").and_then(|v| v.as_f64()) {
                    let _ = engine.storage().set_importance(&outcome.item.id, importance);
                }
                if let Some(access_count) = memory.get("accessCount").and_then(|v| v.as_u64()) {
                    let _ = engine.storage().add_access_count(&outcome.item.id, access_count as i64);
                }
                if !outcome.deduplicated {
                    Engine::schedule_embedding(engine, outcome.item.id.clone(), outcome.item.intent.clone());
                }
                existing.insert(key);
                imported += 1;
            }
            Err(_) => errors += 1,
        }
    }

    Ok(serde_json::json!({
        "imported": imported,
        "skipped": skipped,
        "errors": errors,
    }))
}
