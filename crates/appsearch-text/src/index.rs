use anyhow::Result;
use serde::{Deserialize, Serialize};
use tantivy::merge_policy::NoMergePolicy;
use tantivy::{doc, Index, IndexReader, IndexWriter};
use tracing::debug;

use appsearch_core::document::InputDocument;
use appsearch_core::traits::FulltextEngine;
use appsearch_core::types::SearchEngineResult;

use crate::codec;
use crate::tantivy_utils::{build_schema, register_tokenizer, Fields};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// The indexed projection of an `InputDocument`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
	#[serde(rename = "ref")]
	pub application_ref: String,
	pub name: String,
	pub description_markdown: String,
	pub website_url: String,
}

impl From<&InputDocument> for IndexedDocument {
	fn from(doc: &InputDocument) -> Self {
		Self {
			application_ref: doc.application_ref.clone(),
			name: doc.name.clone(),
			description_markdown: doc.description_markdown.clone(),
			website_url: doc.website_url.clone(),
		}
	}
}

/// In-memory Tantivy index over application names, descriptions and sites.
pub struct TantivyIndex {
	pub(crate) index: Index,
	pub(crate) reader: IndexReader,
	pub(crate) fields: Fields,
	/// Sorted by ref; the persisted form of the index.
	pub(crate) corpus: Vec<IndexedDocument>,
}

impl TantivyIndex {
	/// Index `corpus` in its given order with a single writer thread and one
	/// commit, so the same corpus always yields the same segments and scores.
	pub(crate) fn from_corpus(corpus: Vec<IndexedDocument>) -> Result<Self> {
		let (schema, fields) = build_schema();
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);

		let mut index_writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
		index_writer.set_merge_policy(Box::new(NoMergePolicy));
		for d in &corpus {
			index_writer.add_document(doc!(
				fields.application_ref => d.application_ref.clone(),
				fields.name => d.name.clone(),
				fields.description => d.description_markdown.clone(),
				fields.website_url => d.website_url.clone(),
			))?;
		}
		index_writer.commit()?;
		index_writer.wait_merging_threads()?;

		let reader = index.reader()?;
		debug!(documents = corpus.len(), "built fulltext index");
		Ok(Self { index, reader, fields, corpus })
	}

	pub fn documents(&self) -> &[IndexedDocument] { &self.corpus }
}

impl FulltextEngine for TantivyIndex {
	fn build(documents: &[InputDocument]) -> Result<Self> {
		let mut corpus: Vec<IndexedDocument> = documents.iter().map(IndexedDocument::from).collect();
		corpus.sort_by(|a, b| a.application_ref.cmp(&b.application_ref));
		Self::from_corpus(corpus)
	}

	fn search(&self, query: &str) -> Result<Vec<SearchEngineResult>> { self.run_query(query) }

	fn serialize(&self) -> Result<Vec<u8>> { codec::encode(&self.corpus) }

	fn deserialize(bytes: &[u8]) -> Result<Self> { Self::from_corpus(codec::decode(bytes)?) }

	fn num_documents(&self) -> usize { self.corpus.len() }
}
