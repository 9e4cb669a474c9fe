//! Consolidation (spec §4.7.3): once a kind's active set grows large enough
//! to be noisy, group intent-overlapping items and fold each group into a
//! single synthesized item.

use std::collections::HashMap;

use crate::error::Result;
use crate::memory::{Edge, Item, Kind, NewItem, Relation};
use crate::storage::Storage;
use crate::tokenize;

use super::CONSOLIDATION_MIN_ACTIVE;

/// Jaccard threshold for grouping items around a seed during consolidation.
const GROUP_JACCARD_THRESHOLD: f64 = 0.5;

/// Minimum group size worth synthesizing a merged item for.
const MIN_GROUP_SIZE: usize = 3;

const MERGED_IMPORTANCE_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Default)]
pub struct ConsolidationReport {
    pub groups_merged: usize,
    pub items_folded: usize,
}

/// Run one consolidation pass. Only kinds with at least 3 active items are
/// considered, and only when the total active count clears
/// `CONSOLIDATION_MIN_ACTIVE`.
pub fn run_consolidation(storage: &Storage, now_ms: i64) -> Result<ConsolidationReport> {
    let mut report = ConsolidationReport::default();

    let mut active = storage.all_active()?;
    if active.len() <= CONSOLIDATION_MIN_ACTIVE {
        return Ok(report);
    }

    // Reproducibility: always scan oldest-first within a kind so which item
    // becomes a group's seed is deterministic across runs.
    active.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut by_kind: HashMap<Kind, Vec<Item>> = HashMap::new();
    for item in active {
        by_kind.entry(item.kind).or_default().push(item);
    }

    for (kind, items) in by_kind {
        if items.len() < MIN_GROUP_SIZE {
            continue;
        }
        consolidate_kind(storage, kind, items, now_ms, &mut report)?;
    }

    Ok(report)
}

fn consolidate_kind(
    storage: &Storage,
    kind: Kind,
    items: Vec<Item>,
    now_ms: i64,
    report: &mut ConsolidationReport,
) -> Result<()> {
    let token_sets: Vec<_> = items.iter().map(|item| tokenize::token_set(&item.intent)).collect();
    let mut consumed = vec![false; items.len()];

    for seed_idx in 0..items.len() {
        if consumed[seed_idx] {
            continue;
        }

        let mut group = vec![seed_idx];
        for other_idx in (seed_idx + 1)..items.len() {
            if consumed[other_idx] {
                continue;
            }
            let similarity = tokenize::jaccard_similarity_sets(&token_sets[seed_idx], &token_sets[other_idx]);
            if similarity >= GROUP_JACCARD_THRESHOLD {
                group.push(other_idx);
            }
        }

        if group.len() < MIN_GROUP_SIZE {
            continue;
        }

        for &idx in &group {
            consumed[idx] = true;
        }

        synthesize_group(storage, kind, &items, &group, now_ms)?;
        report.groups_merged += 1;
        report.items_folded += group.len();
    }

    Ok(())
}

fn synthesize_group(
    storage: &Storage,
    kind: Kind,
    items: &[Item],
    group: &[usize],
    now_ms: i64,
) -> Result<()> {
    let members: Vec<&Item> = group.iter().map(|&idx| &items[idx]).collect();

    let mut topic_counts: HashMap<String, usize> = HashMap::new();
    for member in &members {
        for token in tokenize::tokenize(&member.intent) {
            *topic_counts.entry(token).or_default() += 1;
        }
    }
    let mut topics: Vec<&String> = topic_counts.keys().collect();
    topics.sort_by(|a, b| topic_counts[*b].cmp(&topic_counts[*a]).then_with(|| a.cmp(b)));
    let topic_words: Vec<String> = topics.into_iter().take(4).cloned().collect();

    let label = match kind {
        Kind::BugFix => format!(
            "Recurring bug pattern ({} fixes): {}",
            members.len(),
            topic_words.join(", ")
        ),
        _ => format!(
            "Recurring {} pattern ({} items): {}",
            kind.as_str(),
            members.len(),
            topic_words.join(", ")
        ),
    };

    let avg_importance: f64 = members.iter().map(|m| m.importance).sum::<f64>() / members.len() as f64;
    let merged_importance = (avg_importance * MERGED_IMPORTANCE_FACTOR).min(1.0);

    let mut files: Vec<String> = Vec::new();
    let mut tags: Vec<String> = vec!["consolidated".to_string()];
    for member in &members {
        for f in &member.related_files {
            if !files.contains(f) {
                files.push(f.clone());
            }
        }
        for t in &member.tags {
            if !tags.contains(t) {
                tags.push(t.clone());
            }
        }
    }

    let new_item = NewItem {
        kind,
        intent: label,
        action: String::new(),
        reason: Some("synthesized from a consolidation pass over similar items".to_string()),
        impact: None,
        outcome: None,
        related_files: files,
        tags,
        timestamp: Some(now_ms),
        confidence: 0.8,
        source_event_id: None,
    };

    let outcome = storage.add(new_item)?;
    storage.set_importance(&outcome.item.id, merged_importance)?;

    for member in &members {
        storage.deactivate(&member.id, Some(&outcome.item.id))?;
        storage.add_edge(&Edge {
            source_id: member.id.clone(),
            target_id: outcome.item.id.clone(),
            relation: Relation::ReplacedBy,
            weight: 1.0,
            timestamp: now_ms,
        })?;
    }

    Ok(())
}
