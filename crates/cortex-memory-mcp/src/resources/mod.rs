//! The one dynamic resource exposed over `resources/read` (spec §4.9): a
//! "brain context" URI that returns the Context Assembler's own output, the
//! same text a `force_recall`/`get_context` tool call would produce, but
//! reachable through the resource half of the protocol rather than a tool
//! call.

use std::sync::Arc;

use cortex_memory_core::context::AssembleRequest;
use cortex_memory_core::Engine;

pub const BRAIN_CONTEXT_URI: &str = "memory://context";

pub fn read(engine: &Arc<Engine>, uri: &str) -> Result<String, String> {
    if uri != BRAIN_CONTEXT_URI {
        return Err(format!("unknown resource uri: {}", uri));
    }
    let now_ms = chrono::Utc::now().timestamp_millis();
    Ok(engine.context(&AssembleRequest::default(), now_ms))
}
