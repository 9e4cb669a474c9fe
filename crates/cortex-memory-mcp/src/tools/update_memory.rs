//! `update_memory`: replace an item's content by creating a new item and
//! deactivating the original with a SUPERSEDED_BY edge (spec §6).

use std::sync::Arc;

use cortex_memory_core::memory::{Edge, NewItem, Relation};
use cortex_memory_core::{quality, Engine, Error};
use serde_json::{json, Value};

use super::{args_or_empty, optional_str, require_str};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "content": { "type": "string" },
            "reason": { "type": "string" }
        },
        "required": ["id", "content"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let id = require_str(&args, "id")?;
    let content = require_str(&args, "content")?;
    let reason = optional_str(&args, "reason").map(str::to_string);

    quality::check(content).map_err(|rule| rule.message().to_string())?;

    let original = engine
        .storage()
        .get(id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| Error::NotFound(id.to_string()).to_string())?;
    if !original.is_active {
        return Err(format!("item '{}' is not active", id));
    }

    let new_item = NewItem {
        kind: original.kind,
        intent: content.to_string(),
        action: original.action.clone(),
        reason: reason.or_else(|| original.reason.clone()),
        impact: original.impact.clone(),
        outcome: Some(original.outcome.clone()),
        related_files: original.related_files.clone(),
        tags: original.tags.clone(),
        timestamp: None,
        confidence: original.confidence,
        source_event_id: original.source_event_id,
    };

    let outcome = engine.storage().add(new_item).map_err(|e| e.to_string())?;
    if !outcome.deduplicated {
        Engine::schedule_embedding(engine, outcome.item.id.clone(), outcome.item.intent.clone());
    }

    engine.storage().deactivate(&original.id, Some(&outcome.item.id)).map_err(|e| e.to_string())?;
    engine
        .storage()
        .add_edge(&Edge {
            source_id: original.id.clone(),
            target_id: outcome.item.id.clone(),
            relation: Relation::SupersededBy,
            weight: 1.0,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
        .map_err(|e| e.to_string())?;

    Ok(json!({
        "replacedId": original.id,
        "newItem": outcome.item,
    }))
}
