//! `store_memory`: explicit, typed item creation through the Quality Gate
//! and contradiction detection (spec §4.3, §4.8.2, §6).

use std::sync::Arc;

use cortex_memory_core::aging::check_contradiction;
use cortex_memory_core::memory::{Kind, NewItem};
use cortex_memory_core::{quality, Engine};
use serde_json::{json, Value};

use super::{args_or_empty, optional_str, optional_str_vec, require_str};

/// The adapter-level boundary for `store_memory` specifically (spec §4.3);
/// the Quality Gate's own 500-char ceiling still applies beneath it.
const ADAPTER_MAX_CONTENT_LEN: usize = 5000;

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": { "type": "string" },
            "content": { "type": "string", "maxLength": ADAPTER_MAX_CONTENT_LEN },
            "reason": { "type": "string" },
            "files": { "type": "array", "items": { "type": "string" } },
            "tags": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["type", "content"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    engine.check_rate_limit(Some(cortex_memory_core::engine::RateLimitKind::Store)).map_err(|e| e.to_string())?;

    let args = args_or_empty(arguments);
    let type_str = require_str(&args, "type")?;
    let content = require_str(&args, "content")?;
    if content.chars().count() > ADAPTER_MAX_CONTENT_LEN {
        return Err(format!("content exceeds {} characters", ADAPTER_MAX_CONTENT_LEN));
    }
    quality::check(content).map_err(|rule| rule.message().to_string())?;

    let kind = Kind::parse_name(type_str);
    let reason = optional_str(&args, "reason").map(str::to_string);
    let files = optional_str_vec(&args, "files");
    let tags = optional_str_vec(&args, "tags");

    let new_item = NewItem {
        kind,
        intent: content.to_string(),
        action: String::new(),
        reason,
        impact: None,
        outcome: None,
        related_files: files,
        tags,
        timestamp: None,
        confidence: 0.8,
        source_event_id: None,
    };

    let outcome = engine.storage().add(new_item).map_err(|e| e.to_string())?;

    let mut note = None;
    if !outcome.deduplicated {
        Engine::schedule_embedding(engine, outcome.item.id.clone(), outcome.item.intent.clone());
        if let Some(contradiction) = check_contradiction(engine.storage(), &outcome.item).map_err(|e| e.to_string())? {
            note = Some(format!(
                "Superseded conflicting memory: \"{}\"",
                contradiction.older.intent
            ));
        }
    }

    Ok(json!({
        "id": outcome.item.id,
        "deduplicated": outcome.deduplicated,
        "item": outcome.item,
        "note": note,
    }))
}
