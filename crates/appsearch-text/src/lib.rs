//! appsearch-text
//!
//! Tantivy-backed full-text engine over application documents. See `index`
//! for building, `search` for querying and `codec` for the persisted form.
pub mod codec;
pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use index::{IndexedDocument, TantivyIndex};
