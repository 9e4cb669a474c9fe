//! Storage-level lifecycle properties (spec §8 invariants + round-trip laws).

use cortex_memory_core::memory::{Kind, NewItem};
use cortex_memory_core::quality;
use cortex_memory_core::Storage;
use tempfile::TempDir;

fn open_store() -> (Storage, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let storage = Storage::open(&dir.path().join("cognitive.db")).expect("open storage");
    (storage, dir)
}

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
fn stored_item_confidence_and_importance_stay_in_bounds() {
    let (storage, _dir) = open_store();
    let outcome = storage.add(new_item(Kind::Insight, "Bundle size matters for cold start latency")).unwrap();
    assert!(outcome.item.confidence >= 0.0 && outcome.item.confidence <= 1.0);
    assert!(outcome.item.importance >= 0.1 && outcome.item.importance <= 1.0);
}

#[test]
fn deactivate_is_idempotent_and_decrements_active_count_by_at_most_one() {
    let (storage, _dir) = open_store();
    let outcome = storage.add(new_item(Kind::Insight, "Use the platform clipboard API, not a polyfill")).unwrap();
    let before = storage.active_count().unwrap();

    storage.deactivate(&outcome.item.id, None).unwrap();
    let after_first = storage.active_count().unwrap();
    storage.deactivate(&outcome.item.id, None).unwrap();
    let after_second = storage.active_count().unwrap();

    assert_eq!(before - after_first, 1);
    assert_eq!(after_first, after_second);

    let reloaded = storage.get(&outcome.item.id).unwrap().expect("item still readable");
    assert!(!reloaded.is_active);
}

#[test]
fn superseded_by_target_always_resolves() {
    let (storage, _dir) = open_store();
    let newer = storage.add(new_item(Kind::Correction, "Always validate input at the API boundary")).unwrap();
    let older = storage.add(new_item(Kind::Correction, "Never validate input twice across layers")).unwrap();

    storage.deactivate(&older.item.id, Some(&newer.item.id)).unwrap();

    let reloaded = storage.get(&older.item.id).unwrap().expect("item exists");
    let target_id = reloaded.superseded_by.expect("superseded_by set");
    assert!(storage.get(&target_id).unwrap().is_some());
}

#[test]
fn at_most_one_active_item_per_kind_and_normalized_intent() {
    let (storage, _dir) = open_store();
    let first = storage.add(new_item(Kind::Convention, "Always use functional components in React")).unwrap();
    let second = storage.add(new_item(Kind::Convention, "Always use functional components in React apps")).unwrap();

    assert_eq!(first.item.id, second.item.id);
    assert!(second.deduplicated);
    assert_eq!(storage.active_count().unwrap(), 1);
}

#[test]
fn kind_differentiates_duplicate_detection() {
    let (storage, _dir) = open_store();
    let as_convention = storage.add(new_item(Kind::Convention, "Always use functional components in React")).unwrap();
    let as_decision = storage.add(new_item(Kind::Decision, "Always use functional components in React")).unwrap();

    assert_ne!(as_convention.item.id, as_decision.item.id);
    assert_eq!(storage.active_count().unwrap(), 2);
}

#[test]
fn dedup_returns_the_same_id_on_repeated_calls() {
    let (storage, _dir) = open_store();
    let first = storage.add(new_item(Kind::Insight, "Cache the parsed config, parsing it is expensive")).unwrap();
    let second = storage.add(new_item(Kind::Insight, "Cache the parsed config since parsing it is expensive")).unwrap();
    let third = storage.add(new_item(Kind::Insight, "Cache the parsed config, parsing it is expensive")).unwrap();

    assert_eq!(first.item.id, second.item.id);
    assert_eq!(second.item.id, third.item.id);
}

#[test]
fn fts_index_stays_in_sync_with_the_active_set() {
    let (storage, _dir) = open_store();
    let outcome = storage.add(new_item(Kind::Insight, "The retry queue backs off exponentially on 503 responses")).unwrap();

    let hits = storage.search_fts("backs OR exponentially", 10).unwrap();
    assert!(hits.iter().any(|h| h.item.id == outcome.item.id));

    storage.deactivate(&outcome.item.id, None).unwrap();
    let hits_after = storage.search_fts("backs OR exponentially", 10).unwrap();
    assert!(!hits_after.iter().any(|h| h.item.id == outcome.item.id));
}

#[test]
fn content_boundary_fourteen_chars_rejected_fifteen_accepted() {
    assert!(quality::check("short content").is_err());
    assert!(quality::check("a short intent.").is_ok());
}

/// Builds prose of exactly `len` characters out of a repeating phrase whose
/// words never repeat back-to-back, so it clears both the length and the
/// repeated-character rules on its own.
fn prose_of_len(len: usize) -> String {
    let words = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel"];
    let mut out = String::with_capacity(len + 8);
    let mut i = 0;
    while out.chars().count() < len {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(words[i % words.len()]);
        i += 1;
    }
    out.chars().take(len).collect()
}

#[test]
fn content_boundary_five_hundred_accepted_above_rejected() {
    let at_limit = prose_of_len(500);
    let over_limit = prose_of_len(501);
    assert_eq!(at_limit.chars().count(), 500);
    assert_eq!(over_limit.chars().count(), 501);
    assert!(quality::check(&at_limit).is_ok());
    assert!(quality::check(&over_limit).is_err());
}
