//! Contradiction detection (spec §4.8.2), triggered on every store.
//!
//! Narrow by design: two active items of the same kind whose intents
//! overlap heavily (Jaccard ≥0.5 on non-stopword tokens) and where one
//! reads as an affirmation ("use X", "always X") and the other as its
//! negation ("never X", "avoid X"). Broader contradiction detection is out
//! of scope — this only catches the pattern the spec names.

use crate::error::Result;
use crate::memory::{Edge, Item, Relation};
use crate::storage::Storage;
use crate::tokenize::{self, mutually_exclusive};

/// Jaccard threshold for "these two intents are about the same thing"
/// (spec §9 open question: resolved as a tunable const here).
pub const JACCARD_THRESHOLD: f64 = 0.5;

/// A detected contradiction: `older` is the item that loses (deactivated,
/// superseded by `newer`).
#[derive(Debug, Clone)]
pub struct Contradiction {
    pub older: Item,
    pub newer_id: String,
}

/// Scan active items of `new_item`'s kind for a contradiction, and if found,
/// deactivate the older item with a SUPERSEDED_BY edge. Returns the
/// contradiction (if any) so the caller can surface a note in the store
/// response.
pub fn check_contradiction(storage: &Storage, new_item: &Item) -> Result<Option<Contradiction>> {
    let candidates = storage.get_by_kind(new_item.kind, 200)?;

    for candidate in candidates {
        if candidate.id == new_item.id {
            continue;
        }
        if tokenize::jaccard_similarity(&candidate.intent, &new_item.intent) < JACCARD_THRESHOLD {
            continue;
        }
        if !mutually_exclusive(&candidate.intent, &new_item.intent) {
            continue;
        }

        let (older, newer_id) = if candidate.timestamp <= new_item.timestamp {
            (candidate, new_item.id.clone())
        } else {
            // `new_item` is itself chronologically the older of the two
            // (a backfilled timestamp); still the one that loses.
            (new_item.clone(), candidate.id.clone())
        };

        storage.deactivate(&older.id, Some(&newer_id))?;
        storage.add_edge(&Edge {
            source_id: older.id.clone(),
            target_id: newer_id.clone(),
            relation: Relation::SupersededBy,
            weight: 1.0,
            timestamp: new_item.timestamp,
        })?;

        return Ok(Some(Contradiction { older, newer_id }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Kind, NewItem};
    use crate::storage::Storage;

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
    fn flags_the_const_vs_var_contradiction_and_supersedes_the_older_one() {
        let storage = Storage::open_in_memory().expect("open storage");
        let first = storage.add(new_item(Kind::Correction, "Always use const, never var")).unwrap();
        let second = storage.add(new_item(Kind::Correction, "Always use var, never const")).unwrap();
        assert!(!second.deduplicated, "mutually-exclusive intents must not be deduplicated");

        let contradiction = check_contradiction(&storage, &second.item).unwrap().expect("contradiction detected");
        assert_eq!(contradiction.older.id, first.item.id);

        let reloaded = storage.get(&first.item.id).unwrap().unwrap();
        assert!(!reloaded.is_active);
    }
}
