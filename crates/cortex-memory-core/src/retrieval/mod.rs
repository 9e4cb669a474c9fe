//! Hybrid Retriever + Ranker (spec §4.5, §4.6): fuse FTS, vector, and
//! file-scoped recency into one list, then apply context-aware boosts.

mod hybrid;
mod ranker;

pub use hybrid::{FusedHit, HybridRetriever, RetrievalRequest};
pub use ranker::{AttentionMode, Ranker};

use crate::memory::Kind;

/// Post-fusion filter set applied before ranking (spec §4.5 step 4).
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    pub kinds: Option<Vec<Kind>>,
    pub since: Option<i64>,
    pub min_importance: Option<f64>,
    pub files: Option<Vec<String>>,
}

impl FilterSet {
    pub fn passes(&self, item: &crate::memory::Item) -> bool {
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&item.kind) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if item.timestamp < since {
                return false;
            }
        }
        if let Some(min_importance) = self.min_importance {
            if item.importance < min_importance {
                return false;
            }
        }
        if let Some(files) = &self.files {
            let matches = item.related_files.iter().any(|f| files.iter().any(|want| want.contains(f.as_str()) || f.contains(want.as_str())));
            if !matches {
                return false;
            }
        }
        true
    }
}
