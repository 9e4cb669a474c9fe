//! `get_context`: session-start variant of the Context Assembler call —
//! unlike `force_recall`, `topic` is optional (spec §4.9, §6).

use std::sync::Arc;

use cortex_memory_core::context::AssembleRequest;
use cortex_memory_core::Engine;
use serde_json::{json, Value};

use super::{args_or_empty, optional_str};

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "topic": { "type": "string" },
            "currentFile": { "type": "string" }
        }
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    let args = args_or_empty(arguments);
    let topic = optional_str(&args, "topic").map(str::to_string);
    let current_file = optional_str(&args, "currentFile").map(str::to_string);

    let now_ms = chrono::Utc::now().timestamp_millis();
    let request = AssembleRequest { topic, current_file };
    let context = engine.context(&request, now_ms);

    Ok(json!({ "context": context }))
}
