//! Persisted form of a full-text index.
//!
//! Tantivy segment files carry random segment ids, so two builds of the same
//! corpus are never byte-identical. What gets persisted instead is the sorted
//! corpus itself under a checksum; loading re-indexes it.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use appsearch_core::error::Error;

use crate::index::IndexedDocument;

pub const FORMAT: &str = "appsearch-fulltext/1";

#[derive(Serialize)]
struct Envelope<'a> {
	format: &'a str,
	checksum: String,
	documents: &'a [IndexedDocument],
}

#[derive(Deserialize)]
struct OwnedEnvelope {
	format: String,
	checksum: String,
	documents: Vec<IndexedDocument>,
}

fn checksum(documents: &[IndexedDocument]) -> Result<String> {
	Ok(blake3::hash(&serde_json::to_vec(documents)?).to_hex().to_string())
}

pub fn encode(documents: &[IndexedDocument]) -> Result<Vec<u8>> {
	Ok(serde_json::to_vec(&Envelope { format: FORMAT, checksum: checksum(documents)?, documents })?)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<IndexedDocument>> {
	let env: OwnedEnvelope = serde_json::from_slice(bytes).map_err(|e| Error::CorruptIndex(format!("fulltext index is not valid JSON: {e}")))?;
	if env.format != FORMAT {
		return Err(Error::CorruptIndex(format!("unsupported fulltext index format {:?}", env.format)).into());
	}
	if checksum(&env.documents)? != env.checksum {
		return Err(Error::CorruptIndex("fulltext index checksum mismatch".into()).into());
	}
	if env.documents.windows(2).any(|w| w[0].application_ref > w[1].application_ref) {
		return Err(Error::CorruptIndex("fulltext index documents are not sorted".into()).into());
	}
	Ok(env.documents)
}
