use anyhow::Result;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::TantivyDocument;
use tracing::debug;

use appsearch_core::types::SearchEngineResult;

use crate::index::TantivyIndex;

/// Matches in the name field count this much more than body matches.
pub const NAME_BOOST: f32 = 10.0;

impl TantivyIndex {
	/// Every matching document, best first, ties broken by ref. Syntax errors
	/// in `query` are tolerated: whatever parses is searched.
	pub(crate) fn run_query(&self, query: &str) -> Result<Vec<SearchEngineResult>> {
		let searcher = self.reader.searcher();
		let num_docs = usize::try_from(searcher.num_docs())?;
		if num_docs == 0 {
			return Ok(vec![]);
		}

		let mut qp = QueryParser::for_index(&self.index, vec![self.fields.name, self.fields.description, self.fields.website_url]);
		qp.set_field_boost(self.fields.name, NAME_BOOST);
		let (q, errors) = qp.parse_query_lenient(query);
		if !errors.is_empty() {
			debug!(query, errors = errors.len(), "lenient query parse dropped clauses");
		}

		let top_docs = searcher.search(&q, &TopDocs::with_limit(num_docs))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.fields.application_ref).and_then(|v| v.as_str()).unwrap_or("").to_string();
			hits.push(SearchEngineResult::fulltext(id, score));
		}
		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.application_ref.cmp(&b.application_ref)));
		Ok(hits)
	}
}
