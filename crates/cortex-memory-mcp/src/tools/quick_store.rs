//! `quick_store`: classify-then-store shortcut for callers who don't want
//! to pick a `Kind` themselves (spec §6).

use std::sync::Arc;

use cortex_memory_core::aging::check_contradiction;
use cortex_memory_core::memory::{Kind, NewItem};
use cortex_memory_core::{quality, Engine};
use serde_json::{json, Value};

use super::{args_or_empty, require_str};

/// `quick_store`'s own lower bound (spec §6: `memory` ≥5 chars); the
/// Quality Gate's 15-char floor still applies beneath it.
const MIN_MEMORY_LEN: usize = 5;

const CORRECTION_KEYWORDS: &[&str] = &["never ", "always ", "instead of", "wrong", "incorrect", "don't ", "do not "];
const BUG_FIX_KEYWORDS: &[&str] = &["bug", "fix", "fixed", "crash", "error", "exception", "broke", "broken"];
const CONVENTION_KEYWORDS: &[&str] = &["convention", "style", "should use", "prefer", "format", "naming"];
const DECISION_KEYWORDS: &[&str] = &["decided", "chose", "chose to", "architecture", "we will", "going with"];

/// Keyword heuristic classification (spec §6: correction / bug_fix /
/// convention / decision / insight, in that priority order).
fn classify(memory: &str) -> Kind {
    let lower = memory.to_lowercase();
    if CORRECTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Kind::Correction
    } else if BUG_FIX_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Kind::BugFix
    } else if CONVENTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Kind::Convention
    } else if DECISION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Kind::Decision
    } else {
        Kind::Insight
    }
}

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "memory": { "type": "string", "minLength": MIN_MEMORY_LEN }
        },
        "required": ["memory"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    engine.check_rate_limit(Some(cortex_memory_core::engine::RateLimitKind::Store)).map_err(|e| e.to_string())?;

    let args = args_or_empty(arguments);
    let memory = require_str(&args, "memory")?;
    if memory.chars().count() < MIN_MEMORY_LEN {
        return Err(format!("memory must be at least {} characters", MIN_MEMORY_LEN));
    }
    quality::check(memory).map_err(|rule| rule.message().to_string())?;

    let kind = classify(memory);
    let new_item = NewItem {
        kind,
        intent: memory.to_string(),
        action: String::new(),
        reason: None,
        impact: None,
        outcome: None,
        related_files: Vec::new(),
        tags: Vec::new(),
        timestamp: None,
        confidence: 0.8,
        source_event_id: None,
    };

    let outcome = engine.storage().add(new_item).map_err(|e| e.to_string())?;

    let mut note = None;
    if !outcome.deduplicated {
        Engine::schedule_embedding(engine, outcome.item.id.clone(), outcome.item.intent.clone());
        if let Some(contradiction) = check_contradiction(engine.storage(), &outcome.item).map_err(|e| e.to_string())? {
            note = Some(format!("Superseded conflicting memory: \"{}\"", contradiction.older.intent));
        }
    }

    Ok(json!({
        "id": outcome.item.id,
        "kind": kind.as_str(),
        "deduplicated": outcome.deduplicated,
        "item": outcome.item,
        "note": note,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_correction_keyword() {
        assert_eq!(classify("Never use var, always use const"), Kind::Correction);
    }

    #[test]
    fn classifies_bug_fix_keyword() {
        assert_eq!(classify("Fixed a crash in the login handler"), Kind::BugFix);
    }

    #[test]
    fn falls_back_to_insight() {
        assert_eq!(classify("The onboarding flow has five steps"), Kind::Insight);
    }
}
