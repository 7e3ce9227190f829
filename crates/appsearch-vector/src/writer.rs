use anyhow::{Result, Context};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use arrow_array::{RecordBatch, RecordBatchIterator, FixedSizeListArray, StringArray};
use std::sync::Arc;
use tracing::{debug, info};

use appsearch_core::document::InputDocument;
use appsearch_core::traits::Embedder;

use crate::cache::{content_hash, CacheEntry, EmbeddingCache};
use crate::schema::build_documents_schema;

/// Embed `texts` on a blocking thread.
pub async fn embed_blocking(embedder: Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
	let expected = texts.len();
	let out = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts)).await.context("embedding task panicked")??;
	anyhow::ensure!(out.len() == expected, "embedder returned {} vectors for {} texts", out.len(), expected);
	Ok(out)
}

/// Embed every document's description in batches of `batch_size`, reusing
/// cached vectors where the description is unchanged.
pub async fn embed_documents(documents: &[InputDocument], embedder: Arc<dyn Embedder>, batch_size: usize, cache: Option<&EmbeddingCache>) -> Result<Vec<Vec<f32>>> {
	let hashes: Vec<String> = documents.iter().map(|d| content_hash(&d.description_markdown)).collect();
	let mut cached = match cache { Some(c) => c.get_many(&hashes).await?, None => Default::default() };
	let misses: Vec<usize> = (0..documents.len()).filter(|&i| !cached.contains_key(&hashes[i])).collect();
	debug!(documents = documents.len(), cached = documents.len() - misses.len(), "embedding cache lookup");

	let pb = ProgressBar::new(misses.len() as u64);
	pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} embeddings ({percent}%) {msg}")?.progress_chars("#>-"));
	for batch in misses.chunks(batch_size.max(1)) {
		let texts: Vec<String> = batch.iter().map(|&i| documents[i].description_markdown.clone()).collect();
		let vectors = embed_blocking(embedder.clone(), texts).await?;
		let entries: Vec<CacheEntry> = batch.iter().zip(vectors).map(|(&i, vector)| CacheEntry { content_hash: hashes[i].clone(), vector }).collect();
		if let Some(c) = cache { c.put_many(&entries).await?; }
		for e in entries { cached.insert(e.content_hash, e.vector); }
		pb.inc(batch.len() as u64);
	}
	pb.finish_and_clear();
	if !misses.is_empty() { info!(embedded = misses.len(), "embedded application descriptions"); }

	hashes.iter().map(|h| cached.get(h).cloned().ok_or_else(|| anyhow::anyhow!("no embedding for content hash {h}"))).collect()
}

/// Create `table` holding one `(ref, vector)` row per document.
pub async fn write_documents(conn: &Connection, table: &str, documents: &[InputDocument], vectors: &[Vec<f32>], dim: i32) -> Result<()> {
	anyhow::ensure!(documents.len() == vectors.len(), "documents and vectors length must match");
	let schema = build_documents_schema(dim);
	let refs: Vec<String> = documents.iter().map(|d| d.application_ref.clone()).collect();
	let vectors: Vec<Option<Vec<Option<f32>>>> = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect())).collect();
	let record_batch = RecordBatch::try_new(schema.clone(), vec![
		Arc::new(StringArray::from(refs)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim)),
	])?;
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
	conn.create_table(table, reader).execute().await?;
	debug!(table, rows = documents.len(), "wrote vector table");
	Ok(())
}
