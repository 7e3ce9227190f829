use arrow_schema::{Schema, Field, DataType, TimeUnit};
use std::sync::Arc;

pub const DOCUMENTS_TABLE: &str = "applications";
pub const META_TABLE: &str = "meta";

fn vector_field(dim: i32) -> Field {
	Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true)
}

/// One row per application: its ref and description embedding.
pub fn build_documents_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("ref", DataType::Utf8, false),
		vector_field(dim),
	]))
}

pub fn build_cache_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("content_hash", DataType::Utf8, false),
		Field::new("embedder_id", DataType::Utf8, false),
		Field::new("created_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
		vector_field(dim),
	]))
}

pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
