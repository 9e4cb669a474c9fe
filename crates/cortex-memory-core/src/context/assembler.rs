//! The Context Assembler (spec §4.8): the central orchestrator for the
//! "start of conversation" call. Produces one text blob composed of
//! independently-failing sections, capped at 12,000 characters.

use std::path::Path;

use crate::embeddings::Embedder;
use crate::storage::Storage;

use super::sections;

/// Hard cap on the assembled context size (spec §4.8).
pub const MAX_CONTEXT_CHARS: usize = 12_000;

const TRUNCATION_MARKER: &str =
    "\n\n[context truncated — use a targeted recall_memory call for anything not shown above]";

/// Inputs to one assembly pass.
#[derive(Debug, Clone, Default)]
pub struct AssembleRequest {
    pub topic: Option<String>,
    pub current_file: Option<String>,
}

/// Build the full L0-L12 context blob. Individual section failures are
/// swallowed (spec: "each section's absence is silent").
pub fn assemble(
    storage: &Storage,
    embedder: Option<&dyn Embedder>,
    workspace_root: &Path,
    request: &AssembleRequest,
    now_ms: i64,
) -> String {
    let topic = request.topic.as_deref();
    let current_file = request.current_file.as_deref();

    // L1 has no textual output; it just runs maintenance side effects.
    sections::run_l1_maintenance(storage, now_ms);

    let parts: Vec<Option<String>> = vec![
        sections::build_l0_session_boundary(storage, topic, now_ms),
        sections::build_l2_attention_label(topic),
        sections::build_l3_recent_sessions(storage),
        sections::build_l4_hot_corrections(storage),
        sections::build_l5_core_context(storage, now_ms),
        sections::build_l6_anticipation(storage, current_file),
        sections::build_l7_temporal(storage, now_ms),
        sections::build_l8_workspace_state(workspace_root),
        sections::build_l8_5_git_memory(storage, workspace_root, now_ms),
        sections::build_l9_topic_search(storage, embedder, topic, now_ms),
        sections::build_l10_knowledge_gaps(storage, workspace_root),
        sections::build_l11_export_map(workspace_root),
        sections::build_l12_architecture_graph(workspace_root),
    ];

    let body = parts.into_iter().flatten().collect::<Vec<_>>().join("\n\n");

    if body.len() <= MAX_CONTEXT_CHARS {
        return body;
    }

    let budget = MAX_CONTEXT_CHARS.saturating_sub(TRUNCATION_MARKER.len());
    let mut cut = budget.min(body.len());
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &body[..cut], TRUNCATION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Kind, NewItem};

    #[test]
    fn assembles_without_panicking_on_an_empty_store() {
        let storage = Storage::open_in_memory().expect("open");
        let dir = tempfile::tempdir().expect("tempdir");
        let request = AssembleRequest { topic: Some("auth bug".to_string()), current_file: None };
        let text = assemble(&storage, None, dir.path(), &request, 0);
        assert!(text.contains("mode: debugging"));
    }

    #[test]
    fn includes_core_context_once_items_exist() {
        let storage = Storage::open_in_memory().expect("open");
        storage
            .add(NewItem {
                kind: Kind::Decision,
                intent: "Use Postgres for the primary datastore".to_string(),
                action: String::new(),
                reason: None,
                impact: None,
                outcome: None,
                related_files: vec![],
                tags: vec![],
                timestamp: None,
                confidence: 0.8,
                source_event_id: None,
            })
            .expect("add");

        let dir = tempfile::tempdir().expect("tempdir");
        let request = AssembleRequest::default();
        let text = assemble(&storage, None, dir.path(), &request, 0);
        assert!(text.contains("Postgres"));
    }
}
