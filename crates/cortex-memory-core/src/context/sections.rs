//! The L0-L12 section builders (spec §4.8). Each function is small,
//! independent, and returns `None` when it has nothing to contribute —
//! absence is silent, per spec, and the assembler simply skips it.

use std::collections::HashMap;
use std::path::Path;

use crate::aging::{self, effective_importance};
use crate::embeddings::Embedder;
use crate::memory::{Item, Kind, NewEvent};
use crate::retrieval::{FilterSet, HybridRetriever, Ranker, RetrievalRequest};
use crate::storage::Storage;
use crate::tokenize;

use super::git;
use super::scan;

const DAY_MS: i64 = 86_400_000;

fn kind_label(kind: Kind) -> &'static str {
    match kind {
        Kind::Correction => "CORRECTION",
        Kind::Decision => "DECISION",
        Kind::Convention => "CONVENTION",
        Kind::BugFix => "BUG_FIX",
        Kind::Insight => "INSIGHT",
        Kind::FailedSuggestion => "FAILED_SUGGESTION",
        Kind::ProvenPattern => "PROVEN_PATTERN",
        Kind::Dependency => "DEPENDENCY",
    }
}

fn format_item_line(item: &Item) -> String {
    format!("[{}] {} (importance {:.2})", kind_label(item.kind), item.intent, item.importance)
}

/// L0: close the previous session, open a new one keyed on `topic`.
pub fn build_l0_session_boundary(storage: &Storage, topic: Option<&str>, now_ms: i64) -> Option<String> {
    let topic_label = topic.unwrap_or("general").to_string();

    if let Ok(mut previous) = storage.get_events_by_type("session_start", 1) {
        if let Some(prev) = previous.pop() {
            let _ = storage.log_event(NewEvent {
                event_type: "session_end".to_string(),
                source: "context_assembler".to_string(),
                content: format!("closed session on \"{}\"", prev.content),
                diff: None,
                file: None,
                metadata: None,
                timestamp: Some(now_ms),
            });
        }
    }

    let logged = storage.log_event(NewEvent {
        event_type: "session_start".to_string(),
        source: "context_assembler".to_string(),
        content: topic_label.clone(),
        diff: None,
        file: None,
        metadata: None,
        timestamp: Some(now_ms),
    });

    match logged {
        Ok(_) => Some(format!("Session boundary: opened new session on \"{topic_label}\"")),
        Err(_) => None,
    }
}

/// L1: run the maintenance sub-policies. Produces no visible text; errors
/// are swallowed (spec §4.8 "Swallows all errors").
pub fn run_l1_maintenance(storage: &Storage, now_ms: i64) {
    if let Ok(active) = storage.all_active() {
        for item in active.iter().take(200) {
            let _ = aging::maybe_persist_importance(storage, item, now_ms);
        }
    }
    let _ = aging::run_consolidation(storage, now_ms);
    let _ = aging::run_learning_boost(storage);
}

/// L2: one-line attention label.
pub fn build_l2_attention_label(topic: Option<&str>) -> Option<String> {
    let mode = crate::retrieval::AttentionMode::from_query(topic.unwrap_or(""));
    let label = match mode {
        crate::retrieval::AttentionMode::Debugging => "debugging",
        crate::retrieval::AttentionMode::Refactoring => "refactoring",
        crate::retrieval::AttentionMode::Review => "review",
        crate::retrieval::AttentionMode::Coding => "coding",
    };
    Some(format!("mode: {label}"))
}

/// L3: up to 3 prior session headers, most recent first, excluding the one
/// L0 just opened.
pub fn build_l3_recent_sessions(storage: &Storage) -> Option<String> {
    let sessions = storage.get_events_by_type("session_start", 4).ok()?;
    let prior: Vec<String> = sessions.into_iter().skip(1).take(3).map(|e| e.content).collect();
    if prior.is_empty() {
        return None;
    }
    Some(format!("Recent sessions:\n{}", prior.iter().map(|s| format!("- {s}")).collect::<Vec<_>>().join("\n")))
}

/// L4: topics behind recurring corrections (spec §4.7.4).
pub fn build_l4_hot_corrections(storage: &Storage) -> Option<String> {
    let corrections = storage.get_by_kind(Kind::Correction, usize::MAX).ok()?;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in &corrections {
        for token in tokenize::token_set(&item.intent) {
            *counts.entry(token).or_default() += 1;
        }
    }

    let mut hot: Vec<(&String, &usize)> = counts.iter().filter(|(_, &c)| c >= 2).collect();
    if hot.is_empty() {
        return None;
    }
    hot.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    hot.truncate(5);

    Some(format!(
        "Hot corrections:\n{}",
        hot.iter().map(|(topic, count)| format!("- {topic} ({count}x)")).collect::<Vec<_>>().join("\n")
    ))
}

const CORE_KINDS: &[(Kind, usize)] =
    &[(Kind::Correction, 5), (Kind::Decision, 5), (Kind::Convention, 5), (Kind::BugFix, 5)];

/// L5: top corrections, decisions, conventions, and bug fixes by effective
/// importance.
pub fn build_l5_core_context(storage: &Storage, now_ms: i64) -> Option<String> {
    let mut lines = Vec::new();
    for &(kind, cap) in CORE_KINDS {
        let mut items = storage.get_by_kind(kind, 50).ok()?;
        items.sort_by(|a, b| {
            effective_importance(b, now_ms).partial_cmp(&effective_importance(a, now_ms)).unwrap_or(std::cmp::Ordering::Equal)
        });
        for item in items.into_iter().take(cap) {
            lines.push(format_item_line(&item));
        }
    }
    if lines.is_empty() {
        return None;
    }
    Some(format!("Core context:\n{}", lines.join("\n")))
}

/// L6: file, sibling-directory, and file-type items, when `current_file` is set.
pub fn build_l6_anticipation(storage: &Storage, current_file: Option<&str>) -> Option<String> {
    let current_file = current_file?;
    let mut lines = Vec::new();

    if let Ok(file_items) = storage.get_by_file(current_file, 5) {
        for item in &file_items {
            lines.push(format!("(file) {}", format_item_line(item)));
        }
    }

    let sibling_dir = Path::new(current_file).parent().map(|p| p.to_string_lossy().to_string());
    let extension = Path::new(current_file).extension().map(|e| e.to_string_lossy().to_string());

    if let Ok(active) = storage.all_active() {
        if let Some(dir) = &sibling_dir {
            for item in active.iter().filter(|i| {
                i.related_files.iter().any(|f| {
                    Path::new(f).parent().map(|p| p.to_string_lossy().to_string()).as_deref() == Some(dir.as_str())
                        && f != current_file
                })
            }).take(5) {
                lines.push(format!("(sibling-dir) {}", format_item_line(item)));
            }
        }
        if let Some(ext) = &extension {
            for item in active.iter().filter(|i| {
                i.related_files.iter().any(|f| {
                    Path::new(f).extension().map(|e| e.to_string_lossy().to_string()).as_deref() == Some(ext.as_str())
                })
            }).take(5) {
                lines.push(format!("(file-type) {}", format_item_line(item)));
            }
        }
    }

    if lines.is_empty() {
        return None;
    }
    Some(format!("Anticipation ({current_file}):\n{}", lines.join("\n")))
}

/// L7: items bucketed by recency, top 5 per bucket by importance.
pub fn build_l7_temporal(storage: &Storage, now_ms: i64) -> Option<String> {
    let active = storage.all_active().ok()?;
    if active.is_empty() {
        return None;
    }

    let today_start = now_ms - (now_ms % DAY_MS);
    let mut buckets: [Vec<&Item>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];
    for item in &active {
        let age = now_ms - item.created_at;
        if age < 3_600_000 {
            buckets[0].push(item);
        } else if item.created_at >= today_start {
            buckets[1].push(item);
        } else if item.created_at >= today_start - DAY_MS {
            buckets[2].push(item);
        } else if age < 7 * DAY_MS {
            buckets[3].push(item);
        }
    }

    let labels = ["Last hour", "Today", "Yesterday", "This week"];
    let mut sections = Vec::new();
    for (label, mut bucket) in labels.into_iter().zip(buckets) {
        if bucket.is_empty() {
            continue;
        }
        bucket.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal));
        let lines: Vec<String> = bucket.into_iter().take(5).map(|i| format_item_line(i)).collect();
        sections.push(format!("{label}:\n{}", lines.join("\n")));
    }

    if sections.is_empty() {
        return None;
    }
    Some(format!("Temporal:\n{}", sections.join("\n\n")))
}

/// L8: branch, recent commits, diff stat.
pub fn build_l8_workspace_state(workspace_root: &Path) -> Option<String> {
    let branch = git::current_branch(workspace_root);
    let commits = git::recent_commits(workspace_root, 5);
    let diff = git::diff_stat(workspace_root);

    if branch.is_none() && commits.is_empty() && diff.is_none() {
        return None;
    }

    let mut lines = Vec::new();
    if let Some(b) = branch {
        lines.push(format!("branch: {b}"));
    }
    if !commits.is_empty() {
        lines.push(format!("recent commits:\n{}", commits.join("\n")));
    }
    if let Some(d) = diff {
        lines.push(format!("diff stat:\n{d}"));
    }
    Some(format!("Workspace state:\n{}", lines.join("\n")))
}

/// L8.5: ingest new commits as items, and show uncommitted deltas.
pub fn build_l8_5_git_memory(storage: &Storage, workspace_root: &Path, now_ms: i64) -> Option<String> {
    let ingested = git::ingest_new_commits(storage, workspace_root, now_ms);
    let diff = git::diff_stat(workspace_root);

    if ingested == 0 && diff.is_none() {
        return None;
    }

    let mut lines = Vec::new();
    if ingested > 0 {
        lines.push(format!("captured {ingested} new commit(s) as items"));
    }
    if let Some(d) = diff {
        lines.push(format!("uncommitted changes:\n{d}"));
    }
    Some(format!("Git memory:\n{}", lines.join("\n")))
}

/// L9: Hybrid Retriever applied to `topic`, enriched by 1-hop graph
/// neighbours of the top-K results at a 0.7 score factor.
pub fn build_l9_topic_search(
    storage: &Storage,
    embedder: Option<&dyn Embedder>,
    topic: Option<&str>,
    now_ms: i64,
) -> Option<String> {
    let topic = topic?;
    let request = RetrievalRequest {
        query: topic.to_string(),
        current_file: None,
        max_results: 5,
        filters: FilterSet::default(),
    };

    let fused = HybridRetriever::search(storage, embedder, &request).ok()?;
    if fused.is_empty() {
        return None;
    }
    let ranked = Ranker::rank(fused, topic, None, now_ms);

    let mut lines = Vec::new();
    let mut seen_ids: std::collections::HashSet<String> = ranked.iter().map(|h| h.item.id.clone()).collect();

    for hit in ranked.iter().take(5) {
        lines.push(format_item_line(&hit.item));
        if let Ok(neighbors) = storage.get_related(&hit.item.id, 1, 3) {
            for (neighbor, _hops) in neighbors {
                if seen_ids.insert(neighbor.id.clone()) {
                    lines.push(format!("  -> (0.7x) {}", format_item_line(&neighbor)));
                }
            }
        }
    }

    Some(format!("Topic search ({topic}):\n{}", lines.join("\n")))
}

/// L10: source directories with no item coverage at all.
pub fn build_l10_knowledge_gaps(storage: &Storage, workspace_root: &Path) -> Option<String> {
    let active = storage.all_active().ok()?;
    let covered: std::collections::HashSet<String> = active
        .iter()
        .flat_map(|i| i.related_files.iter())
        .filter_map(|f| Path::new(f).parent().map(|p| p.to_string_lossy().to_string()))
        .collect();

    let all_dirs = scan::list_source_dirs(workspace_root);
    let mut gaps: Vec<&String> = all_dirs.iter().filter(|d| !covered.contains(d.as_str())).collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort();

    Some(format!("Knowledge gaps:\n{}", gaps.iter().map(|d| format!("- {d}")).collect::<Vec<_>>().join("\n")))
}

/// L11: exported symbol digest per directory.
pub fn build_l11_export_map(workspace_root: &Path) -> Option<String> {
    let exports = scan::scan_exports(workspace_root);
    if exports.is_empty() {
        return None;
    }

    let lines: Vec<String> = exports
        .iter()
        .take(20)
        .map(|(dir, symbols)| format!("- {dir}: {}", symbols.join(", ")))
        .collect();
    Some(format!("Export map:\n{}", lines.join("\n")))
}

/// L12: layer detection, entry/leaf nodes, circular-dep warnings, API routes.
pub fn build_l12_architecture_graph(workspace_root: &Path) -> Option<String> {
    let graph = scan::detect_architecture(workspace_root);
    if graph.entry_points.is_empty() && graph.leaf_nodes.is_empty() && graph.api_endpoints.is_empty() {
        return None;
    }

    let mut lines = Vec::new();
    if !graph.entry_points.is_empty() {
        lines.push(format!("entry points: {}", graph.entry_points.join(", ")));
    }
    if !graph.leaf_nodes.is_empty() {
        lines.push(format!("leaf nodes: {}", graph.leaf_nodes.join(", ")));
    }
    if !graph.circular_deps.is_empty() {
        let pairs: Vec<String> = graph.circular_deps.iter().map(|(a, b)| format!("{a} <-> {b}")).collect();
        lines.push(format!("circular dependencies: {}", pairs.join(", ")));
    }
    if !graph.api_endpoints.is_empty() {
        lines.push(format!("API endpoints: {}", graph.api_endpoints.join(", ")));
    }

    Some(format!("Architecture graph:\n{}", lines.join("\n")))
}
