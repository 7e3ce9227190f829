use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const ANALYZER: &str = "en_stem";

#[derive(Clone, Copy)]
pub struct Fields {
	pub application_ref: Field,
	pub name: Field,
	pub description: Field,
	pub website_url: Field,
}

pub fn build_schema() -> (Schema, Fields) {
	let mut schema_builder = Schema::builder();
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(ANALYZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let fields = Fields {
		application_ref: schema_builder.add_text_field("ref", STRING | STORED),
		name: schema_builder.add_text_field("name", text_options.clone()),
		description: schema_builder.add_text_field("description", text_options.clone()),
		website_url: schema_builder.add_text_field("website_url", text_options),
	};
	(schema_builder.build(), fields)
}

/// Lowercased, English stop words removed, English stemming.
pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.filter(Stemmer::new(Language::English))
		.build();
	index.tokenizers().register(ANALYZER, tokenizer);
}
