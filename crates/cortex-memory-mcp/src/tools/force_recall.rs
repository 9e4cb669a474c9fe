//! `force_recall`: invokes the Context Assembler directly (spec §4.8, §6).

use std::sync::Arc;

use cortex_memory_core::context::AssembleRequest;
use cortex_memory_core::Engine;
use serde_json::{json, Value};

use super::{args_or_empty, optional_str, require_str};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "topic": { "type": "string" },
            "currentFile": { "type": "string" }
        },
        "required": ["topic"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let topic = require_str(&args, "topic")?;
    let current_file = optional_str(&args, "currentFile").map(str::to_string);

    let now_ms = chrono::Utc::now().timestamp_millis();
    let request = AssembleRequest { topic: Some(topic.to_string()), current_file };
    let context = engine.context(&request, now_ms);

    Ok(json!({ "context": context }))
}
