//! One module per tool (spec §4.9, §6), each exporting `schema() -> Value`
//! and `execute(engine, arguments) -> Result<Value, String>` — the
//! teacher's per-tool module shape, generalized from `Arc<Storage>` to
//! `Arc<Engine>`.

pub mod auto_learn;
pub mod delete_memory;
pub mod export_memories;
pub mod force_recall;
pub mod get_context;
pub mod get_stats;
pub mod health_check;
pub mod import_memories;
pub mod list_memories;
pub mod quick_store;
pub mod recall_memory;
pub mod scan_project;
pub mod store_memory;
pub mod update_memory;
pub mod verify_code;
pub mod verify_files;

use serde_json::Value;

/// Pull a required string field out of the tool arguments object.
pub fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required argument '{}'", key))
}

/// Pull an optional string field, trimmed of surrounding whitespace.
pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

pub fn optional_usize(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|n| n as usize)
}

pub fn optional_str_vec(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub fn args_or_empty(args: Option<Value>) -> Value {
    args.unwrap_or_else(|| serde_json::json!({}))
}
