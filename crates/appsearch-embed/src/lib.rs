use anyhow::{Result, bail};
use std::sync::Arc;

use appsearch_core::config::{expand_path, EmbeddingBackend, EmbeddingSettings};
use appsearch_core::traits::Embedder;

pub mod device;
pub mod hash;
pub mod minilm;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use minilm::MiniLmEmbedder;
pub use pool::{masked_mean_l2, normalize_embedding};

/// Build the embedder selected by `settings`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.backend {
        EmbeddingBackend::Hash => {
            tracing::info!(dim = settings.hash_dim, "using hash embedder");
            Ok(Arc::new(HashEmbedder::new(settings.hash_dim)))
        }
        EmbeddingBackend::Minilm => {
            let model_dir = expand_path(&settings.model_dir);
            if !model_dir.is_dir() {
                bail!("embedding model directory {} does not exist (set embedding.model_dir or use embedding.backend = \"hash\")", model_dir.display());
            }
            Ok(Arc::new(MiniLmEmbedder::load(&model_dir, settings.max_len, device::select_device(settings.device)?)?))
        }
    }
}
