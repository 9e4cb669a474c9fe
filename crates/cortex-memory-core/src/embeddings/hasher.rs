//! Fallback TF-IDF hashing embedder.
//!
//! Activated when the primary local model cannot load (spec §4.2). Search
//! quality degrades but the contract — unit vector, cosine similarity
//! meaningful — holds, so the rest of the engine doesn't need to know the
//! fallback is active.
//!
//! Pipeline: tokenize with camelCase/snake_case splitting -> unigrams,
//! bigrams, trigrams -> TF-IDF-style weighting (plain term-frequency here,
//! since there is no corpus-wide document count available at embed time) ->
//! multi-hash (DJB2 + FNV-1a) into `D` dimensions with sign-bit dispersion ->
//! L2-normalize.

use std::collections::HashMap;

use super::{l2_normalize, Embedder, EMBEDDING_DIMENSIONS};
use crate::error::Result;
use crate::tokenize::split_identifier;

/// Dependency-free hashing embedder. Always `ready()`.
#[derive(Debug, Default)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self { dimensions: EMBEDDING_DIMENSIONS }
    }

    fn features(text: &str) -> Vec<String> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
            .flat_map(split_identifier)
            .filter(|t| !t.is_empty())
            .collect();

        let mut features = Vec::with_capacity(words.len() * 3);
        features.extend(words.iter().cloned());
        for w in words.windows(2) {
            features.push(format!("{} {}", w[0], w[1]));
        }
        for w in words.windows(3) {
            features.push(format!("{} {} {}", w[0], w[1], w[2]));
        }
        features
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let features = Self::features(text);
        let mut term_freq: HashMap<String, u32> = HashMap::new();
        for f in &features {
            *term_freq.entry(f.clone()).or_insert(0) += 1;
        }

        let total = features.len().max(1) as f32;
        let mut vector = vec![0f32; self.dimensions];

        for (term, count) in &term_freq {
            // Plain TF weighting; document frequency is unknowable per-call,
            // so this degrades gracefully to a bag-of-n-grams weighting.
            let weight = *count as f32 / total;
            let djb2 = djb2_hash(term);
            let fnv1a = fnv1a_hash(term);

            let idx_a = (djb2 % self.dimensions as u64) as usize;
            let idx_b = (fnv1a % self.dimensions as u64) as usize;
            let sign_a = if djb2 & 1 == 0 { 1.0 } else { -1.0 };
            let sign_b = if fnv1a & 1 == 0 { 1.0 } else { -1.0 };

            vector[idx_a] += weight * sign_a;
            vector[idx_b] += weight * sign_b * 0.5;
        }

        l2_normalize(&mut vector);
        vector
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn ready(&self) -> bool {
        true
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Bernstein's DJB2 hash.
fn djb2_hash(s: &str) -> u64 {
    let mut hash: u64 = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as u64);
    }
    hash
}

/// FNV-1a hash.
fn fnv1a_hash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_unit_vector_of_correct_dimension() {
        let e = HashEmbedder::new();
        let v = e.embed("Always use Zod for schema validation").unwrap();
        assert_eq!(v.len(), EMBEDDING_DIMENSIONS);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3 || norm == 0.0);
    }

    #[test]
    fn splits_camel_case_identifiers_into_features() {
        let e = HashEmbedder::new();
        let a = e.embed("getUserById returns the user record").unwrap();
        let b = e.embed("get user by id returns the user record").unwrap();
        let sim = super::super::cosine_similarity(&a, &b);
        assert!(sim > 0.5, "expected high similarity, got {sim}");
    }

    #[test]
    fn similar_text_scores_higher_than_unrelated_text() {
        let e = HashEmbedder::new();
        let base = e.embed("use functional components in react").unwrap();
        let similar = e.embed("always use functional components in react apps").unwrap();
        let unrelated = e.embed("postgres connection pool exhausted under load").unwrap();

        let sim_close = super::super::cosine_similarity(&base, &similar);
        let sim_far = super::super::cosine_similarity(&base, &unrelated);
        assert!(sim_close > sim_far);
    }

    #[test]
    fn ready_is_always_true() {
        assert!(HashEmbedder::new().ready());
    }
}
