//! Aging Engine (spec §4.7): four idempotent sub-policies that keep the
//! active corpus small, relevant, and free of stale or contradictory items.
//! All four are safe to invoke repeatedly — none assumes a particular
//! starting state.

mod cleanup;
mod consolidation;
mod contradiction;
mod decay;
mod learning;

pub use cleanup::{run_cleanup, CleanupReport};
pub use consolidation::{run_consolidation, ConsolidationReport};
pub use contradiction::{check_contradiction, Contradiction, JACCARD_THRESHOLD};
pub use decay::{effective_importance, maybe_persist_importance};
pub use learning::run_learning_boost;

/// Soft cap on active items (spec §4.7.2, §5).
pub const ACTIVE_ITEM_CAP: usize = 500;

/// Active-item-count threshold above which consolidation considers a kind
/// (spec §4.7.3).
pub const CONSOLIDATION_MIN_ACTIVE: usize = 50;
