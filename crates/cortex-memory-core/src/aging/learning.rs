//! Learning-rate boost (spec §4.7.4): topics that keep generating
//! corrections are reinforced — every active item touching such a topic
//! gets its importance floor raised, so the engine surfaces the lesson more
//! readily next time.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::memory::Kind;
use crate::storage::Storage;
use crate::tokenize;

const HIGH_REPEAT_THRESHOLD: usize = 3;
const HIGH_REPEAT_FLOOR: f64 = 0.95;
const LOW_REPEAT_THRESHOLD: usize = 2;
const LOW_REPEAT_FLOOR: f64 = 0.85;

#[derive(Debug, Clone, Default)]
pub struct LearningReport {
    pub topics_reinforced: usize,
    pub items_boosted: usize,
}

/// Count topic tokens across active CORRECTION items, then raise the
/// importance floor of every active item (any kind) whose intent mentions a
/// topic that recurs often enough.
pub fn run_learning_boost(storage: &Storage) -> Result<LearningReport> {
    let mut report = LearningReport::default();

    let corrections = storage.get_by_kind(Kind::Correction, usize::MAX)?;
    let mut topic_counts: HashMap<String, usize> = HashMap::new();
    for item in &corrections {
        for token in tokenize::token_set(&item.intent) {
            *topic_counts.entry(token).or_default() += 1;
        }
    }

    let recurring: HashMap<&str, f64> = topic_counts
        .iter()
        .filter_map(|(topic, &count)| {
            if count >= HIGH_REPEAT_THRESHOLD {
                Some((topic.as_str(), HIGH_REPEAT_FLOOR))
            } else if count >= LOW_REPEAT_THRESHOLD {
                Some((topic.as_str(), LOW_REPEAT_FLOOR))
            } else {
                None
            }
        })
        .collect();

    if recurring.is_empty() {
        return Ok(report);
    }
    report.topics_reinforced = recurring.len();

    let mut boosted: HashSet<String> = HashSet::new();
    for item in storage.all_active()? {
        let tokens = tokenize::token_set(&item.intent);
        let floor = tokens
            .iter()
            .filter_map(|t| recurring.get(t.as_str()))
            .copied()
            .fold(0.0_f64, f64::max);

        if floor > 0.0 && item.importance < floor {
            storage.set_importance(&item.id, floor)?;
            boosted.insert(item.id.clone());
        }
    }
    report.items_boosted = boosted.len();

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::NewItem;

    fn new_correction(intent: &str) -> NewItem {
        NewItem {
            kind: Kind::Correction,
            intent: intent.to_string(),
            action: String::new(),
            reason: None,
            impact: None,
            outcome: None,
            related_files: vec![],
            tags: vec![],
            timestamp: None,
            confidence: 0.8,
            source_event_id: None,
        }
    }

    #[test]
    fn recurring_topic_raises_importance_floor() {
        let storage = Storage::open_in_memory().expect("open");

        for phrase in [
            "Always validate input with zod schemas",
            "Use zod schemas for every API boundary",
            "Do not skip zod schema validation on requests",
        ] {
            storage.add(new_correction(phrase)).expect("add");
        }

        let report = run_learning_boost(&storage).expect("run");
        assert!(report.topics_reinforced > 0);
        assert!(report.items_boosted > 0);

        for item in storage.get_by_kind(Kind::Correction, 10).expect("get") {
            assert!(item.importance >= LOW_REPEAT_FLOOR);
        }
    }
}
