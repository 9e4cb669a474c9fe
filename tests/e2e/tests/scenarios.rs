//! End-to-end scenarios from spec §8: cross-session recall and contradiction
//! resolution exercised against the same on-disk store a real adapter would
//! use (open, act, close, reopen).

use cortex_memory_core::aging::check_contradiction;
use cortex_memory_core::context::AssembleRequest;
use cortex_memory_core::memory::{Kind, NewItem, Relation};
use cortex_memory_core::retrieval::{FilterSet, RetrievalRequest};
use cortex_memory_core::{Engine, Storage};
use tempfile::TempDir;

fn new_item(kind: Kind, intent: &str) -> NewItem {
    NewItem {
        kind,
        intent: intent.to_string(),
        action: String::new(),
        reason: None,
        impact: None,
        outcome: None,
        related_files: Vec::new(),
        tags: Vec::new(),
        timestamp: None,
        confidence: 0.8,
        source_event_id: None,
    }
}

#[test]
fn cross_session_recall_survives_a_close_and_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let db_path = dir.path().join("cognitive.db");

    {
        let storage = Storage::open(&db_path).expect("open storage, session 1");
        storage
            .add(new_item(
                Kind::Convention,
                "Always use Zod for schema validation in this project. Never use Joi or manual validation.",
            ))
            .expect("store survives the quality gate");
        storage.close().expect("wal checkpoint on session close");
    }

    let storage = Storage::open(&db_path).expect("reopen storage, session 2");
    let engine = Engine::with_storage(dir.path().to_path_buf(), storage).expect("engine");

    let request = RetrievalRequest {
        query: "user signup schema validation".to_string(),
        current_file: None,
        max_results: 10,
        filters: FilterSet::default(),
    };
    let hits = engine.force_recall(&request, 1_700_000_000_000).expect("recall");

    assert!(
        hits.iter().any(|h| h.item.intent.contains("Zod")),
        "the item stored in session 1 should surface in session 2's recall"
    );
}

#[test]
fn contradiction_deactivates_the_older_item_and_links_superseded_by() {
    let (engine, _dir) = test_engine();

    let first = engine
        .storage()
        .add(new_item(Kind::Correction, "Always use const, never var"))
        .expect("first store");
    assert!(!first.deduplicated);

    let second = engine
        .storage()
        .add(new_item(Kind::Correction, "Always use var, never const"))
        .expect("second store");
    assert!(!second.deduplicated);

    let contradiction = check_contradiction(engine.storage(), &second.item)
        .expect("contradiction check runs")
        .expect("a contradiction is detected");

    assert_eq!(contradiction.older.id, first.item.id);
    assert_eq!(contradiction.newer_id, second.item.id);

    let reloaded_first = engine.storage().get(&first.item.id).unwrap().expect("still readable");
    assert!(!reloaded_first.is_active);
    assert_eq!(reloaded_first.superseded_by.as_deref(), Some(second.item.id.as_str()));

    let edges = engine.storage().edges_from(&first.item.id).unwrap();
    assert!(edges.iter().any(|e| e.relation == Relation::SupersededBy && e.target_id == second.item.id));
}

#[test]
fn context_assembly_never_exceeds_the_character_cap() {
    let (engine, _dir) = test_engine();

    for i in 0..30 {
        engine
            .storage()
            .add(new_item(Kind::Insight, &format!("Insight entry number {i} about subsystem behavior under load")))
            .ok();
    }

    let blob = engine.context(&AssembleRequest::default(), 1_700_000_000_000);
    assert!(blob.chars().count() <= cortex_memory_core::context::MAX_CONTEXT_CHARS);
}

fn test_engine() -> (Engine, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let storage = Storage::open(&dir.path().join("cognitive.db")).expect("open storage");
    let engine = Engine::with_storage(dir.path().to_path_buf(), storage).expect("engine");
    (engine, dir)
}
