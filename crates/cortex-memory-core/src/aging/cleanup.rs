//! Cleanup (spec §4.7.2): deactivate stale items, enforce the active-item
//! cap, and merge items that turned out to have identical intents.

use std::collections::HashMap;

use crate::error::Result;
use crate::memory::{normalize_intent, Kind};
use crate::storage::Storage;

use super::ACTIVE_ITEM_CAP;

const INSIGHT_STALE_DAYS: i64 = 14;
const ANY_KIND_STALE_DAYS: i64 = 30;
const DAY_MS: i64 = 86_400_000;
const MERGE_IMPORTANCE_STEP: f64 = 0.05;

/// Summary of one cleanup pass, mainly useful for `get_stats`/logging.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub stale_insights_deactivated: usize,
    pub stale_any_kind_deactivated: usize,
    pub evicted_for_cap: usize,
    pub merged_groups: usize,
}

/// Run every cleanup sub-policy once. Idempotent: running it again with no
/// new activity produces an all-zero report.
pub fn run_cleanup(storage: &Storage, now_ms: i64) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    deactivate_stale(storage, now_ms, &mut report)?;
    enforce_cap(storage, &mut report)?;
    merge_identical_intents(storage, &mut report)?;

    Ok(report)
}

fn deactivate_stale(storage: &Storage, now_ms: i64, report: &mut CleanupReport) -> Result<()> {
    for item in storage.all_active()? {
        if item.access_count != 0 {
            continue;
        }
        let age_days = (now_ms - item.created_at) / DAY_MS;

        if age_days >= ANY_KIND_STALE_DAYS {
            storage.deactivate(&item.id, None)?;
            report.stale_any_kind_deactivated += 1;
        } else if item.kind == Kind::Insight && age_days >= INSIGHT_STALE_DAYS {
            storage.deactivate(&item.id, None)?;
            report.stale_insights_deactivated += 1;
        }
    }
    Ok(())
}

fn enforce_cap(storage: &Storage, report: &mut CleanupReport) -> Result<()> {
    let mut active = storage.all_active()?;
    if active.len() <= ACTIVE_ITEM_CAP {
        return Ok(());
    }

    active.sort_by(|a, b| a.importance.partial_cmp(&b.importance).unwrap_or(std::cmp::Ordering::Equal));
    let overflow = active.len() - ACTIVE_ITEM_CAP;
    for item in active.into_iter().take(overflow) {
        storage.deactivate(&item.id, None)?;
        report.evicted_for_cap += 1;
    }
    Ok(())
}

fn merge_identical_intents(storage: &Storage, report: &mut CleanupReport) -> Result<()> {
    let mut active = storage.all_active()?;
    // Deterministic tie-break: scan in timestamp-ascending order (spec §9
    // reproducibility note) so which member survives a tie is stable.
    active.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut groups: HashMap<(Kind, String), Vec<usize>> = HashMap::new();
    for (idx, item) in active.iter().enumerate() {
        groups.entry((item.kind, normalize_intent(&item.intent))).or_default().push(idx);
    }

    for indices in groups.into_values() {
        if indices.len() < 2 {
            continue;
        }

        let survivor_idx = indices
            .iter()
            .copied()
            .max_by(|&a, &b| {
                active[a].importance.partial_cmp(&active[b].importance).unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("group is non-empty");

        let survivor_id = active[survivor_idx].id.clone();
        let extra_access: i64 =
            indices.iter().filter(|&&i| i != survivor_idx).map(|&i| active[i].access_count as i64).sum();
        let bumped_importance =
            (active[survivor_idx].importance + MERGE_IMPORTANCE_STEP * (indices.len() - 1) as f64).min(1.0);

        storage.set_importance(&survivor_id, bumped_importance)?;
        if extra_access > 0 {
            storage.add_access_count(&survivor_id, extra_access)?;
        }

        for &idx in &indices {
            if idx == survivor_idx {
                continue;
            }
            storage.deactivate(&active[idx].id, Some(&survivor_id))?;
        }

        report.merged_groups += 1;
    }

    Ok(())
}
