//! Effective importance (spec §4.7.1): a pure function of an item's current
//! state, used both by the Ranker (as the confidence-decay boost) and by
//! maintenance passes that persist the recomputed value.

use crate::error::Result;
use crate::memory::Item;
use crate::storage::Storage;

const DECAY_RATE: f64 = 0.02;
const MAX_ACCESS_BOOST: f64 = 2.0;
const ACCESS_BOOST_RATE: f64 = 0.1;
const RECENT_DAY_BOOST: f64 = 1.3;
const RECENT_WEEK_BOOST: f64 = 1.1;
const MIN_IMPORTANCE: f64 = 0.1;
const MAX_IMPORTANCE: f64 = 1.0;

/// Persist only when the recomputed value differs from the stored one by
/// more than this (spec §4.7.1) — avoids a write storm from recall-time
/// recomputation.
const PERSIST_THRESHOLD: f64 = 0.05;

const DAY_MS: i64 = 86_400_000;

/// `effective_importance = base * decay * access_boost * recency_boost`,
/// clamped to `[0.1, 1.0]`.
pub fn effective_importance(item: &Item, now_ms: i64) -> f64 {
    let age_days = ((now_ms - item.created_at).max(0) as f64) / DAY_MS as f64;
    let decay = 1.0 / (1.0 + age_days * DECAY_RATE);
    let access_boost = (1.0 + ACCESS_BOOST_RATE * item.access_count as f64).min(MAX_ACCESS_BOOST);

    let since_access_days = ((now_ms - item.last_accessed).max(0) as f64) / DAY_MS as f64;
    let recency_boost = if since_access_days < 1.0 {
        RECENT_DAY_BOOST
    } else if since_access_days < 7.0 {
        RECENT_WEEK_BOOST
    } else {
        1.0
    };

    (item.importance * decay * access_boost * recency_boost).clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
}

/// Recompute and persist `item`'s importance only if the delta clears
/// `PERSIST_THRESHOLD` (spec §4.7.1).
pub fn maybe_persist_importance(storage: &Storage, item: &Item, now_ms: i64) -> Result<()> {
    let new_value = effective_importance(item, now_ms);
    if (new_value - item.importance).abs() > PERSIST_THRESHOLD {
        storage.set_importance(&item.id, new_value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_item() -> Item {
        Item {
            id: "x".to_string(),
            kind: crate::memory::Kind::Insight,
            intent: "test".to_string(),
            action: String::new(),
            reason: None,
            impact: None,
            outcome: "unknown".to_string(),
            related_files: vec![],
            tags: vec![],
            created_at: 0,
            timestamp: 0,
            confidence: 0.8,
            importance: 1.0,
            access_count: 0,
            last_accessed: 0,
            is_active: true,
            superseded_by: None,
            source_event_id: None,
        }
    }

    #[test]
    fn fresh_item_has_full_importance() {
        let item = base_item();
        let importance = effective_importance(&item, 0);
        assert!((importance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn old_unaccessed_item_decays_but_floors_at_point_one() {
        let mut item = base_item();
        item.importance = 0.2;
        let ninety_days = 90 * DAY_MS;
        let importance = effective_importance(&item, ninety_days);
        assert!(importance >= MIN_IMPORTANCE);
        assert!(importance < 0.2);
    }

    #[test]
    fn access_count_boosts_importance() {
        let mut low_access = base_item();
        low_access.importance = 0.5;
        let mut high_access = base_item();
        high_access.importance = 0.5;
        high_access.access_count = 20;

        let ten_days = 10 * DAY_MS;
        assert!(effective_importance(&high_access, ten_days) >= effective_importance(&low_access, ten_days));
    }
}
