//! `Engine`: the lifted singleton (spec §9 redesign) bundling storage, the
//! embedder, the recall cache, and the per-process rate-limit counters.
//! Constructed once at adapter startup and passed through as `Arc<Engine>`.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::aging;
use crate::context::{self, AssembleRequest};
use crate::embeddings::{Embedder, HashEmbedder};
#[cfg(feature = "embeddings")]
use crate::embeddings::LocalModelEmbedder;
use crate::error::{Error, Result};
use crate::retrieval::{FusedHit, HybridRetriever, Ranker, RetrievalRequest};
use crate::storage::Storage;

const RECALL_CACHE_CAPACITY: usize = 50;
const RECALL_CACHE_TTL_MS: i64 = 60_000;

/// Run the aging engine's cleanup sweep (spec §4.7.2) every this many
/// `recall` calls, rather than on every single one — "occasionally
/// opportunistically after a recall" (spec §5), not on the hot path of
/// every query.
const CLEANUP_INTERVAL_CALLS: u64 = 20;

const STORE_LIMIT: u32 = 30;
const AUTO_LEARN_LIMIT: u32 = 100;
const TOTAL_LIMIT: u32 = 500;

/// Which per-process counter a call should be checked and charged against
/// (spec §5 rate limits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKind {
    Store,
    AutoLearn,
}

#[derive(Debug, Default)]
struct RateCounters {
    store: u32,
    auto_learn: u32,
    total: u32,
}

struct CachedRecall {
    hits: Vec<FusedHit>,
    expires_at: i64,
}

/// Falls back to the dependency-free hasher whenever the local model isn't
/// ready (feature disabled, or still loading, or failed to load) — see
/// `embeddings::hasher` doc comment.
struct FallbackEmbedder {
    #[cfg(feature = "embeddings")]
    primary: LocalModelEmbedder,
    fallback: HashEmbedder,
}

impl Embedder for FallbackEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[cfg(feature = "embeddings")]
        {
            if self.primary.ready() {
                if let Ok(v) = self.primary.embed(text) {
                    return Ok(v);
                }
            }
        }
        self.fallback.embed(text)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[cfg(feature = "embeddings")]
        {
            if self.primary.ready() {
                if let Ok(v) = self.primary.embed_batch(texts) {
                    return Ok(v);
                }
            }
        }
        self.fallback.embed_batch(texts)
    }

    fn ready(&self) -> bool {
        true
    }

    fn dimensions(&self) -> usize {
        crate::embeddings::EMBEDDING_DIMENSIONS
    }
}

pub struct Engine {
    storage: Storage,
    embedder: Box<dyn Embedder>,
    workspace_root: PathBuf,
    recall_cache: Mutex<LruCache<(String, usize), CachedRecall>>,
    counters: Mutex<RateCounters>,
    recall_calls: AtomicU64,
}

impl Engine {
    /// Open storage at its default workspace-relative path and spawn the
    /// embedder. Fails only if the storage file cannot be opened at all;
    /// the caller is expected to fall back to degraded mode (spec §7).
    pub fn new(workspace_root: PathBuf) -> Result<Self> {
        let db_path = Storage::default_path(&workspace_root);
        let storage = Storage::open(&db_path)?;
        Self::with_storage(workspace_root, storage)
    }

    pub fn with_storage(workspace_root: PathBuf, storage: Storage) -> Result<Self> {
        #[cfg(feature = "embeddings")]
        let embedder: Box<dyn Embedder> = {
            let cache_dir = workspace_root.join(".ai").join("brain-data").join("models");
            Box::new(FallbackEmbedder { primary: LocalModelEmbedder::spawn(cache_dir), fallback: HashEmbedder::new() })
        };
        #[cfg(not(feature = "embeddings"))]
        let embedder: Box<dyn Embedder> = Box::new(HashEmbedder::new());

        Ok(Self {
            storage,
            embedder,
            workspace_root,
            recall_cache: Mutex::new(LruCache::new(NonZeroUsize::new(RECALL_CACHE_CAPACITY).unwrap())),
            counters: Mutex::new(RateCounters::default()),
            recall_calls: AtomicU64::new(0),
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Charge one call against the total counter, and against `kind`'s
    /// specific counter if given. Errors once either limit is exceeded
    /// (spec §5: ≤30 store, ≤100 auto_learn, ≤500 total per process
    /// lifetime).
    pub fn check_rate_limit(&self, kind: Option<RateLimitKind>) -> Result<()> {
        let mut counters = self.counters.lock().expect("rate counters lock poisoned");

        if counters.total >= TOTAL_LIMIT {
            return Err(Error::RateLimited("total call limit reached for this process".to_string()));
        }
        match kind {
            Some(RateLimitKind::Store) if counters.store >= STORE_LIMIT => {
                return Err(Error::RateLimited("store call limit reached for this process".to_string()));
            }
            Some(RateLimitKind::AutoLearn) if counters.auto_learn >= AUTO_LEARN_LIMIT => {
                return Err(Error::RateLimited("auto_learn call limit reached for this process".to_string()));
            }
            _ => {}
        }

        counters.total += 1;
        match kind {
            Some(RateLimitKind::Store) => counters.store += 1,
            Some(RateLimitKind::AutoLearn) => counters.auto_learn += 1,
            None => {}
        }
        Ok(())
    }

    /// Hybrid-retrieve + rank, served from the 50-entry/60s-TTL cache keyed
    /// on `(query, max_results)` when possible (spec §5).
    pub fn recall(&self, request: &RetrievalRequest, now_ms: i64) -> Result<Vec<FusedHit>> {
        let cache_key = (request.query.clone(), request.max_results);

        if let Some(cached) = self.recall_cache.lock().expect("recall cache lock poisoned").get(&cache_key) {
            if cached.expires_at > now_ms {
                return Ok(cached.hits.clone());
            }
        }

        let hits = self.force_recall(request, now_ms)?;

        self.recall_cache.lock().expect("recall cache lock poisoned").put(
            cache_key,
            CachedRecall { hits: hits.clone(), expires_at: now_ms + RECALL_CACHE_TTL_MS },
        );

        // Opportunistic maintenance (spec §4.7.2, §5: the active-item cap is
        // "soft; enforced by cleanup", invoked "occasionally opportunistically
        // after a recall"). Errors are swallowed, same as L1.
        let calls = self.recall_calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls % CLEANUP_INTERVAL_CALLS == 0 {
            if let Err(e) = aging::run_cleanup(&self.storage, now_ms) {
                tracing::warn!("opportunistic cleanup failed: {e}");
            }
        }

        Ok(hits)
    }

    /// Hybrid-retrieve + rank, bypassing the cache entirely (used by
    /// `force_recall` and to populate `recall`'s cache on a miss).
    pub fn force_recall(&self, request: &RetrievalRequest, now_ms: i64) -> Result<Vec<FusedHit>> {
        let fused = HybridRetriever::search(&self.storage, Some(self.embedder()), request)?;
        Ok(Ranker::rank(fused, &request.query, request.current_file.as_deref(), now_ms))
    }

    /// Run the Context Assembler (spec §4.8).
    pub fn context(&self, request: &AssembleRequest, now_ms: i64) -> String {
        context::assemble(&self.storage, Some(self.embedder()), &self.workspace_root, request, now_ms)
    }

    /// Flush WAL and join the embedder worker (spec §5 scoped resources).
    pub fn shutdown(&self) -> Result<()> {
        self.storage.close()
    }

    /// Schedule embedding for a newly-stored item on the embedder's async
    /// path (spec §2 write flow, §4.2, §4.4, §5): never blocks the caller.
    /// Completion is orthogonal to the current response — a slow or failed
    /// embed just leaves the item vector-search-invisible until (if ever) it
    /// lands (spec §5: "searchable via vector search only after the embedder
    /// completes, which may be arbitrarily later"). Takes `&Arc<Engine>`
    /// rather than `&self` so it can clone the handle into the spawned task.
    pub fn schedule_embedding(engine: &Arc<Self>, item_id: String, text: String) {
        let engine = Arc::clone(engine);
        tokio::spawn(async move {
            match engine.embedder.embed(&text) {
                Ok(vector) => {
                    if let Err(e) = engine.storage.set_vector(&item_id, vector) {
                        tracing::warn!("failed to persist vector for item {item_id}: {e}");
                    }
                }
                Err(e) => {
                    tracing::warn!("embedding failed for item {item_id}: {e}");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::FilterSet;

    fn test_engine() -> Engine {
        let storage = Storage::open_in_memory().expect("open");
        Engine::with_storage(std::env::temp_dir(), storage).expect("engine")
    }

    #[test]
    fn rate_limit_blocks_after_store_cap() {
        let engine = test_engine();
        for _ in 0..STORE_LIMIT {
            engine.check_rate_limit(Some(RateLimitKind::Store)).expect("under cap");
        }
        assert!(engine.check_rate_limit(Some(RateLimitKind::Store)).is_err());
    }

    #[test]
    fn recall_cache_serves_repeat_queries() {
        let engine = test_engine();
        let request = RetrievalRequest {
            query: "auth bug".to_string(),
            current_file: None,
            max_results: 5,
            filters: FilterSet::default(),
        };
        let first = engine.recall(&request, 0).expect("recall");
        let second = engine.recall(&request, 1000).expect("recall");
        assert_eq!(first.len(), second.len());
    }
}
