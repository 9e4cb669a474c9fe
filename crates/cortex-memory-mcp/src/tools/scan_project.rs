//! `scan_project`: exposes the same gitignore-aware workspace scanner that
//! feeds the Context Assembler's L11/L12 sections (spec §1 Non-goals: "only
//! specified by the interface they feed into the store").

use std::sync::Arc;

use cortex_memory_core::context::{detect_architecture, scan_exports};
use cortex_memory_core::Engine;
use serde_json::{json, Value};

pub fn schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub async fn execute(engine: &Arc<Engine>, _arguments: Option<Value>) -> Result<Value, String> {
    let exports = scan_exports(engine.workspace_root());
    let architecture = detect_architecture(engine.workspace_root());

    Ok(json!({
        "exportsByDirectory": exports,
        "architecture": {
            "entryPoints": architecture.entry_points,
            "leafNodes": architecture.leaf_nodes,
            "circularDeps": architecture.circular_deps,
            "apiEndpoints": architecture.api_endpoints,
        },
    }))
}
