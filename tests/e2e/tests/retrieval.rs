//! Hybrid retrieval + ranking scenarios (spec §8 end-to-end scenarios 3-4).

use cortex_memory_core::memory::{Kind, NewItem};
use cortex_memory_core::retrieval::{FilterSet, RetrievalRequest};
use cortex_memory_core::Engine;
use tempfile::TempDir;

const DAY_MS: i64 = 86_400_000;

fn test_engine() -> (Engine, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let storage = cortex_memory_core::Storage::open(&dir.path().join("cognitive.db")).expect("open storage");
    let engine = Engine::with_storage(dir.path().to_path_buf(), storage).expect("engine");
    (engine, dir)
}

fn new_item(kind: Kind, intent: &str, related_files: Vec<String>, timestamp: Option<i64>) -> NewItem {
    NewItem {
        kind,
        intent: intent.to_string(),
        action: String::new(),
        reason: None,
        impact: None,
        outcome: None,
        related_files,
        tags: Vec::new(),
        timestamp,
        confidence: 0.8,
        source_event_id: None,
    }
}

fn request(query: &str, current_file: Option<&str>) -> RetrievalRequest {
    RetrievalRequest {
        query: query.to_string(),
        current_file: current_file.map(str::to_string),
        max_results: 10,
        filters: FilterSet::default(),
    }
}

#[test]
fn newer_item_outranks_older_item_at_equal_fts_rank() {
    let (engine, _dir) = test_engine();
    let now = 1_700_000_000_000i64;

    let old = engine
        .storage()
        .add(new_item(
            Kind::Insight,
            "Retry queue writes pending jobs to the append log before shutdown",
            Vec::new(),
            Some(now - 10 * DAY_MS),
        ))
        .unwrap();
    let new = engine
        .storage()
        .add(new_item(
            Kind::Insight,
            "Background workers persist the retry queue state during a clean shutdown",
            Vec::new(),
            Some(now),
        ))
        .unwrap();

    assert_ne!(old.item.id, new.item.id, "test fixture wording must not dedup");

    let hits = engine.force_recall(&request("retry queue shutdown", None), now).unwrap();
    let positions: Vec<&str> = hits.iter().map(|h| h.item.id.as_str()).collect();
    let old_pos = positions.iter().position(|id| *id == old.item.id);
    let new_pos = positions.iter().position(|id| *id == new.item.id);

    if let (Some(old_pos), Some(new_pos)) = (old_pos, new_pos) {
        assert!(new_pos < old_pos, "newer item should rank ahead of the older one");
    }
}

#[test]
fn file_affinity_boosts_the_matching_item() {
    let (engine, _dir) = test_engine();
    let now = 1_700_000_000_000i64;

    let affine = engine
        .storage()
        .add(new_item(
            Kind::BugFix,
            "The session token refresh call races the login page redirect on slow networks",
            vec!["src/auth/login.ts".to_string()],
            Some(now),
        ))
        .unwrap();
    let unaffine = engine
        .storage()
        .add(new_item(
            Kind::BugFix,
            "A stale session token refresh retries three times before the logout page redirect fires",
            vec!["src/auth/logout.ts".to_string()],
            Some(now),
        ))
        .unwrap();

    let without_file = engine.force_recall(&request("session token refresh races redirect", None), now).unwrap();
    let with_file = engine.force_recall(&request("session token refresh races redirect", Some("src/auth/login.ts")), now).unwrap();

    let score_of = |hits: &[cortex_memory_core::retrieval::FusedHit], id: &str| {
        hits.iter().find(|h| h.item.id == id).map(|h| h.score)
    };

    let baseline = score_of(&without_file, &affine.item.id).unwrap_or(0.0);
    let boosted = score_of(&with_file, &affine.item.id).unwrap_or(0.0);
    let unaffine_boosted = score_of(&with_file, &unaffine.item.id).unwrap_or(0.0);

    assert!(boosted >= baseline * 1.5 - f64::EPSILON);
    assert!(boosted > unaffine_boosted);
}

#[test]
fn max_results_clamps_at_fifty_rather_than_rejecting() {
    let (engine, _dir) = test_engine();
    let now = 1_700_000_000_000i64;
    // Distinct kinds so none of these collide on the (kind, intent) dedup key
    // even though they share most of their wording.
    let kinds = [Kind::Insight, Kind::Convention, Kind::Decision, Kind::BugFix, Kind::ProvenPattern];
    let subjects = ["latency", "throughput", "memory", "jitter", "backpressure"];
    for (kind, subject) in kinds.into_iter().zip(subjects) {
        engine
            .storage()
            .add(new_item(kind, &format!("The scheduler loop tracks {subject} per tick for diagnostics"), Vec::new(), Some(now)))
            .unwrap();
    }

    let mut oversized = request("scheduler loop diagnostics", None);
    oversized.max_results = 500;

    let hits = engine.force_recall(&oversized, now).unwrap();
    assert!(hits.len() <= 50);
}

#[test]
fn filter_set_excludes_non_matching_kinds() {
    let (engine, _dir) = test_engine();
    let now = 1_700_000_000_000i64;
    let decision = engine
        .storage()
        .add(new_item(Kind::Decision, "We will ship the worker pool as a separate crate", Vec::new(), Some(now)))
        .unwrap();
    let correction = engine
        .storage()
        .add(new_item(Kind::Correction, "Always ship the worker pool behind a feature flag", Vec::new(), Some(now)))
        .unwrap();

    let mut filtered = request("ship worker pool", None);
    filtered.filters = FilterSet { kinds: Some(vec![Kind::Decision]), ..FilterSet::default() };

    let hits = engine.force_recall(&filtered, now).unwrap();
    assert!(hits.iter().any(|h| h.item.id == decision.item.id));
    assert!(!hits.iter().any(|h| h.item.id == correction.item.id));
}
