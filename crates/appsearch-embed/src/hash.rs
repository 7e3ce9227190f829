use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use appsearch_core::traits::Embedder;

use crate::pool::normalize_embedding;

/// Deterministic bag-of-words feature hashing. No model files needed; texts
/// sharing words get similar vectors, which is enough for tests and offline
/// development. Text without any word maps to the first basis vector.
pub struct HashEmbedder { id: String, dim: usize }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { id: format!("hash:{dim}"), dim } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
        }
        normalize_embedding(&mut v);
        v
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_one(t)).collect()) }
}
