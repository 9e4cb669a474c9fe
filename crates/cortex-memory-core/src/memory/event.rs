//! `Event`: append-only log of raw inputs that items are derived from.

use serde::{Deserialize, Serialize};

/// A raw input event. Never mutated after insertion except `processed`
/// transitioning 0 -> 1 (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub event_type: String,
    pub source: String,
    pub content: String,
    pub diff: Option<String>,
    pub file: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: i64,
    pub processed: bool,
}

/// Fields supplied by the caller when logging a new event; `id` and
/// `processed` are assigned by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub event_type: String,
    pub source: String,
    pub content: String,
    #[serde(default)]
    pub diff: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}
