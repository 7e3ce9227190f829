use anyhow::{Result, anyhow};
use futures::TryStreamExt;
use lancedb::DistanceType;
use lancedb::query::{QueryBase, ExecutableQuery};

use appsearch_core::types::SearchEngineResult;

use crate::writer::embed_blocking;
use crate::LanceSemanticIndex;

impl LanceSemanticIndex {
	/// Nearest `top_k` documents by cosine similarity (`1 - cosine distance`),
	/// best first, restricted to `score > min_score` when given.
	pub(crate) async fn run_query(&self, query_text: &str, min_score: Option<f32>) -> Result<Vec<SearchEngineResult>> {
		let rows = self.table.count_rows(None).await?;
		if rows == 0 || self.top_k == 0 { return Ok(vec![]); }
		let query_embedding = embed_blocking(self.embedder.clone(), vec![query_text.to_string()]).await?.remove(0);
		let mut results = self.table.vector_search(query_embedding)?.distance_type(DistanceType::Cosine).limit(self.top_k).execute().await?;
		let mut rows = Vec::new();
		while let Some(batch) = results.try_next().await? {
			let refs = batch.column_by_name("ref").and_then(|c| c.as_any().downcast_ref::<arrow_array::StringArray>()).ok_or_else(|| anyhow!("ref column missing from vector search"))?;
			let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<arrow_array::Float32Array>()).ok_or_else(|| anyhow!("_distance column missing from vector search"))?;
			rows.extend((0..batch.num_rows()).map(|i| (refs.value(i).to_string(), distances.value(i))));
		}
		Ok(rank_by_distance(rows, min_score))
	}
}

/// Cosine distances to results, best first. Rows whose score is not a finite
/// number, or not strictly above `min_score`, are dropped.
pub(crate) fn rank_by_distance(rows: Vec<(String, f32)>, min_score: Option<f32>) -> Vec<SearchEngineResult> {
	let mut hits: Vec<SearchEngineResult> = rows
		.into_iter()
		.map(|(application_ref, distance)| (application_ref, 1.0 - distance))
		.filter(|(_, score)| score.is_finite() && min_score.map_or(true, |min| *score > min))
		.map(|(application_ref, score)| SearchEngineResult::semantic(application_ref, score))
		.collect();
	hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.application_ref.cmp(&b.application_ref)));
	hits
}
