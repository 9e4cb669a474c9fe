//! Pluggable embedder: `embed`/`embed_batch` over unit vectors of fixed
//! dimension D (spec §4.2).
//!
//! The engine never assumes a particular backing model — `Embedder` is a
//! duck-typed interface (spec §9 design notes) with a `ready` probe. The
//! primary implementation (`model::LocalModelEmbedder`) wraps a local
//! sentence-embedding model on a worker thread; `hasher::HashEmbedder` is a
//! dependency-free fallback activated when the model fails to load. Both
//! satisfy the same contract, so callers never need to know which is active.

mod hasher;
#[cfg(feature = "embeddings")]
mod model;

pub use hasher::HashEmbedder;
#[cfg(feature = "embeddings")]
pub use model::LocalModelEmbedder;

use crate::error::Result;

/// Embedding dimensionality used throughout the engine.
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Per-request embed timeout (spec §5 suspension points).
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Text -> unit vector. Implementations are free to run on a worker thread;
/// this trait itself makes no assumption about where `embed` executes.
pub trait Embedder: Send + Sync {
    /// Embed a single piece of text into an L2-normalized vector of
    /// `dimensions()` length.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts in one call. Implementations may batch more
    /// efficiently than repeated `embed` calls.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Whether the backing implementation is ready to serve requests
    /// (e.g. model loaded). The fallback hasher is always ready.
    fn ready(&self) -> bool {
        true
    }

    /// Output vector length.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}

/// Cosine similarity between two vectors, assumed (but not required) to be
/// unit-length. Returns 0.0 if either magnitude is zero (spec §4.4).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// L2-normalize a vector in place. A zero vector is left unchanged.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_unit_vectors_is_one() {
        let v = vec![0.6f32, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        let a = vec![0.0f32, 0.0, 0.0];
        let b = vec![1.0f32, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn l2_normalize_produces_unit_length() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
