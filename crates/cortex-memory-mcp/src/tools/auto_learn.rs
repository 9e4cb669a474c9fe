//! `auto_learn`: regex-extracts candidate items out of free-form text and
//! stores each one that survives the Quality Gate (spec §6).

use std::sync::Arc;
use std::sync::LazyLock;

use cortex_memory_core::aging::check_contradiction;
use cortex_memory_core::memory::{Kind, NewItem};
use cortex_memory_core::{quality, Engine};
use regex::RegexSet;
use serde_json::{json, Value};

use super::{args_or_empty, optional_str, require_str};

const MIN_TEXT_LEN: usize = 20;

/// One pattern per candidate `Kind`, checked in this order (spec §6: "Regex-
/// extracts candidate items"). `RegexSet` lets us classify in a single pass.
static CANDIDATE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\b(never|always|instead of|don'?t|do not)\b",
        r"(?i)\b(fix(ed)?|bug|crash(ed)?|error|exception)\b",
        r"(?i)\b(convention|prefer|should use|naming|format)\b",
        r"(?i)\b(decided|chose|we will|going with|architecture)\b",
    ])
    .expect("static patterns compile")
});

const KINDS: &[Kind] = &[Kind::Correction, Kind::BugFix, Kind::Convention, Kind::Decision];

/// Split into sentence-ish chunks and classify by the first matching
/// pattern; sentences matching nothing are not candidates.
fn extract_candidates(text: &str) -> Vec<(Kind, String)> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|sentence| {
            let matched: Vec<usize> = CANDIDATE_PATTERNS.matches(sentence).into_iter().collect();
            matched.first().map(|&idx| (KINDS[idx], sentence.to_string()))
        })
        .collect()
}

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "text": { "type": "string", "minLength": MIN_TEXT_LEN },
            "context": { "type": "string" }
        },
        "required": ["text"]
    })
}

pub async fn execute(engine: &Arc<Engine>, arguments: Option<Value>) -> Result<Value, String> {
    engine.check_rate_limit(Some(cortex_memory_core::engine::RateLimitKind::AutoLearn)).map_err(|e| e.to_string())?;

    let args = args_or_empty(arguments);
    let text = require_str(&args, "text")?;
    if text.chars().count() < MIN_TEXT_LEN {
        return Err(format!("text must be at least {} characters", MIN_TEXT_LEN));
    }
    let context_note = optional_str(&args, "context").map(str::to_string);

    let candidates = extract_candidates(text);

    let mut stored = Vec::new();
    let mut rejected = 0usize;

    for (kind, intent) in candidates {
        if quality::check(&intent).is_err() {
            rejected += 1;
            continue;
        }

        let new_item = NewItem {
            kind,
            intent,
            action: String::new(),
            reason: context_note.clone(),
            impact: None,
            outcome: None,
            related_files: Vec::new(),
            tags: Vec::new(),
            timestamp: None,
            confidence: 0.7,
            source_event_id: None,
        };

        let outcome = match engine.storage().add(new_item) {
            Ok(o) => o,
            Err(_) => {
                rejected += 1;
                continue;
            }
        };
        if !outcome.deduplicated {
            Engine::schedule_embedding(engine, outcome.item.id.clone(), outcome.item.intent.clone());
            let _ = check_contradiction(engine.storage(), &outcome.item);
        }
        stored.push(outcome.item);
    }

    Ok(json!({
        "storedCount": stored.len(),
        "rejectedCount": rejected,
        "items": stored,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_correction_sentence() {
        let candidates = extract_candidates("We always use Zod for validation. Never use manual checks.");
        assert!(candidates.iter().any(|(k, _)| *k == Kind::Correction));
    }

    #[test]
    fn ignores_sentences_with_no_signal() {
        let candidates = extract_candidates("The sky is blue today.");
        assert!(candidates.is_empty());
    }
}
