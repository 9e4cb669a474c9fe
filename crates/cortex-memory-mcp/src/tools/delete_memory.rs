//! `delete_memory`: soft-delete by deactivation, no supersession edge
//! (spec §6).

use std::sync::Arc;

use cortex_memory_core::{Engine, Error};
use serde_json::{json, Value};

use super::{args_or_empty, optional_str, require_str};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "reason": { "type": "string" }
        },
        "required": ["id"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let id = require_str(&args, "id")?;
    let reason = optional_str(&args, "reason");

    let item = engine
        .storage()
        .get(id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| Error::NotFound(id.to_string()).to_string())?;
    if !item.is_active {
        return Err(format!("item '{}' is already inactive", id));
    }

    engine.storage().deactivate(id, None).map_err(|e| e.to_string())?;

    Ok(json!({
        "deletedId": id,
        "reason": reason,
    }))
}
