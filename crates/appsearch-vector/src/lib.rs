//! appsearch-vector
//!
//! LanceDB-backed semantic engine. An index location is a LanceDB database
//! directory holding the `applications` vector table and a `meta` table that
//! records the embedder and metric it was built with.
use anyhow::Result;
use lancedb::Table;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

use appsearch_core::document::InputDocument;
use appsearch_core::error::Error;
use appsearch_core::traits::{Embedder, SemanticEngine, SemanticOptions};
use appsearch_core::types::SearchEngineResult;

pub mod cache;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

use crate::cache::EmbeddingCache;
use crate::schema::{DOCUMENTS_TABLE, META_TABLE};
use crate::table::{get_meta, has_table, open_db, set_meta};
use crate::writer::{embed_documents, write_documents};

pub const METRIC: &str = "cosine";

pub struct LanceSemanticIndex {
	pub(crate) table: Table,
	pub(crate) embedder: Arc<dyn Embedder>,
	pub(crate) top_k: usize,
	/// Keeps scratch storage alive for indices built without a location.
	_scratch: Option<TempDir>,
}

impl LanceSemanticIndex {
	pub async fn num_rows(&self) -> Result<usize> { Ok(self.table.count_rows(None).await?) }

	async fn build_at(location: &Path, documents: &[InputDocument], embedder: Arc<dyn Embedder>, options: &SemanticOptions, scratch: Option<TempDir>) -> Result<Self> {
		let cache = match &options.cache_dir {
			Some(dir) => Some(EmbeddingCache::open(dir, embedder.id(), embedder.dim()).await?),
			None => None,
		};
		let vectors = embed_documents(documents, embedder.clone(), options.batch_size, cache.as_ref()).await?;

		std::fs::create_dir_all(location)?;
		let db = open_db(location).await?;
		let dim = i32::try_from(embedder.dim())?;
		write_documents(&db, DOCUMENTS_TABLE, documents, &vectors, dim).await?;
		set_meta(&db, META_TABLE, &[("embedder_id", embedder.id()), ("metric", METRIC), ("dim", &embedder.dim().to_string())]).await?;
		let table = db.open_table(DOCUMENTS_TABLE).execute().await?;
		info!(location = %location.display(), documents = documents.len(), embedder = embedder.id(), "built semantic index");
		Ok(Self { table, embedder, top_k: options.top_k, _scratch: scratch })
	}
}

impl SemanticEngine for LanceSemanticIndex {
	async fn build(documents: &[InputDocument], embedder: Arc<dyn Embedder>, options: &SemanticOptions, persist_location: Option<&Path>) -> Result<Self> {
		match persist_location {
			Some(location) => {
				if location.exists() && std::fs::read_dir(location)?.next().is_some() {
					return Err(Error::ReindexNotSupported(location.to_path_buf()).into());
				}
				Self::build_at(location, documents, embedder, options, None).await
			}
			None => {
				let scratch = TempDir::new()?;
				let location = scratch.path().to_path_buf();
				Self::build_at(&location, documents, embedder, options, Some(scratch)).await
			}
		}
	}

	async fn load(location: &Path, embedder: Arc<dyn Embedder>, options: &SemanticOptions) -> Result<Self> {
		if !location.is_dir() {
			return Err(Error::NotFound(format!("no semantic index at {}", location.display())).into());
		}
		let db = open_db(location).await?;
		if !has_table(&db, DOCUMENTS_TABLE).await? {
			return Err(Error::NotFound(format!("semantic index at {} has no {DOCUMENTS_TABLE} table", location.display())).into());
		}
		let table = db.open_table(DOCUMENTS_TABLE).execute().await?;
		if table.count_rows(None).await? == 0 {
			return Err(Error::NotFound(format!("semantic index at {} is empty", location.display())).into());
		}
		match get_meta(&db, META_TABLE, "embedder_id").await? {
			Some(id) if id == embedder.id() => {}
			Some(id) => return Err(Error::CorruptIndex(format!("semantic index was built with embedder {id}, not {}", embedder.id())).into()),
			None => return Err(Error::CorruptIndex(format!("semantic index at {} has no embedder metadata", location.display())).into()),
		}
		Ok(Self { table, embedder, top_k: options.top_k, _scratch: None })
	}

	async fn search(&self, query: &str, min_score: Option<f32>) -> Result<Vec<SearchEngineResult>> { self.run_query(query, min_score).await }
}
