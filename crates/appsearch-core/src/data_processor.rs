//! Turns raw published records into `InputDocument`s.
//!
//! The record shape is described by a [`FieldMapping`] so that older layouts
//! go through the same validation and enrichment path as current ones.

use crate::document::{InputDocument, RawApplication};
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Only records whose value at `pointer` is one of `accepted` are ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFilter {
    pub pointer: String,
    pub accepted: Vec<String>,
}

impl StatusFilter {
    fn admits(&self, record: &Value) -> bool {
        record
            .pointer(&self.pointer)
            .and_then(Value::as_str)
            .is_some_and(|status| self.accepted.iter().any(|a| a == status))
    }
}

/// JSON pointers (RFC 6901) locating each application field in a raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    pub round_application_id: String,
    pub project_id: Option<String>,
    pub name: String,
    pub website_url: String,
    pub description: String,
    pub payout_wallet_address: String,
    pub banner_image_cid: Option<String>,
    pub logo_image_cid: Option<String>,
    pub status: Option<StatusFilter>,
}

impl Default for FieldMapping {
    fn default() -> Self { Self::indexer() }
}

impl FieldMapping {
    /// Round application records as published by the indexer.
    pub fn indexer() -> Self {
        Self {
            round_application_id: "/id".into(),
            project_id: Some("/projectId".into()),
            name: "/metadata/application/project/title".into(),
            website_url: "/metadata/application/project/website".into(),
            description: "/metadata/application/project/description".into(),
            payout_wallet_address: "/metadata/application/recipient".into(),
            banner_image_cid: Some("/metadata/application/project/bannerImg".into()),
            logo_image_cid: Some("/metadata/application/project/logoImg".into()),
            status: Some(StatusFilter { pointer: "/status".into(), accepted: vec!["APPROVED".into()] }),
        }
    }

    /// Flat project records from before applications carried their own metadata.
    pub fn legacy_projects() -> Self {
        Self {
            round_application_id: "/id".into(),
            project_id: None,
            name: "/metadata/title".into(),
            website_url: "/metadata/website".into(),
            description: "/metadata/description".into(),
            payout_wallet_address: "/metadata/recipient".into(),
            banner_image_cid: Some("/metadata/bannerImg".into()),
            logo_image_cid: Some("/metadata/logoImg".into()),
            status: None,
        }
    }

    /// Locate every field of `record`. `None` when the status filter rejects it.
    pub fn extract(&self, record: &Value, round_id: &str) -> Option<RawApplication> {
        if let Some(filter) = &self.status {
            if !filter.admits(record) {
                return None;
            }
        }
        let at = |pointer: &str| record.pointer(pointer).cloned();
        let at_opt = |pointer: &Option<String>| pointer.as_deref().and_then(at);
        Some(RawApplication {
            round_id: round_id.to_string(),
            round_application_id: at(&self.round_application_id),
            project_id: at_opt(&self.project_id),
            name: at(&self.name),
            website_url: at(&self.website_url),
            description: at(&self.description),
            payout_wallet_address: at(&self.payout_wallet_address),
            banner_image_cid: at_opt(&self.banner_image_cid),
            logo_image_cid: at_opt(&self.logo_image_cid),
        })
    }
}

/// Outcome of processing one round's records.
#[derive(Debug, Default)]
pub struct ProcessedRound {
    pub documents: Vec<InputDocument>,
    /// Records the status filter excluded.
    pub skipped: usize,
    pub invalid: Vec<ValidationError>,
}

#[derive(Default)]
pub struct DataProcessor {
    mapping: FieldMapping,
}

impl DataProcessor {
    pub fn new(mapping: FieldMapping) -> Self { Self { mapping } }

    pub fn mapping(&self) -> &FieldMapping { &self.mapping }

    pub fn process_records(&self, chain_id: u64, round_id: &str, records: &[Value]) -> ProcessedRound {
        let mut out = ProcessedRound::default();
        for record in records {
            let Some(raw) = self.mapping.extract(record, round_id) else {
                out.skipped += 1;
                continue;
            };
            match InputDocument::from_raw(&raw, chain_id) {
                Ok(doc) => out.documents.push(doc),
                Err(err) => {
                    debug!(chain_id, round_id, error = %err, "dropping invalid application record");
                    out.invalid.push(err);
                }
            }
        }
        debug!(
            chain_id,
            round_id,
            accepted = out.documents.len(),
            skipped = out.skipped,
            invalid = out.invalid.len(),
            "processed round"
        );
        out
    }

    /// Process a `{round_id}.json` file holding a JSON array of records.
    pub fn process_file(&self, path: &Path, chain_id: u64) -> Result<ProcessedRound> {
        let round_id = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        let records: Vec<Value> = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(self.process_records(chain_id, &round_id, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn indexer_record(id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "projectId": "0xproj",
            "status": status,
            "metadata": {
                "application": {
                    "recipient": "0xpayout",
                    "project": {
                        "title": format!("Project {id}"),
                        "website": "https://example.org",
                        "description": "Plants trees",
                        "logoImg": "bafylogo"
                    }
                }
            }
        })
    }

    #[test]
    fn status_filter_skips_unapproved() {
        let processor = DataProcessor::default();
        let records = vec![indexer_record("0", "APPROVED"), indexer_record("1", "PENDING"), indexer_record("2", "APPROVED")];
        let out = processor.process_records(1, "0xabc", &records);
        assert_eq!(out.skipped, 1);
        let refs: Vec<_> = out.documents.iter().map(|d| d.application_ref.as_str()).collect();
        assert_eq!(refs, vec!["1:0xabc:0", "1:0xabc:2"]);
        assert_eq!(out.documents[0].logo_image_cid.as_deref(), Some("bafylogo"));
        assert_eq!(out.documents[0].banner_image_cid, None);
    }

    #[test]
    fn invalid_records_are_reported_not_indexed() {
        let mut broken = indexer_record("3", "APPROVED");
        broken["metadata"]["application"]["project"]["title"] = Value::Null;
        let out = DataProcessor::default().process_records(1, "0xabc", &[broken]);
        assert!(out.documents.is_empty());
        assert_eq!(out.invalid.len(), 1);
    }

    #[test]
    fn legacy_mapping_reads_flat_projects() {
        let record = json!({
            "id": "0xlegacy",
            "metadata": {
                "title": "Old Project",
                "website": "https://old.example",
                "description": "Legacy body",
                "recipient": "0xold"
            }
        });
        let out = DataProcessor::new(FieldMapping::legacy_projects()).process_records(1, "0xround", &[record]);
        assert_eq!(out.documents.len(), 1);
        assert_eq!(out.documents[0].name, "Old Project");
        assert_eq!(out.documents[0].project_id, None);
    }

    #[test]
    fn process_file_takes_round_from_file_stem() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("0xfeed.json");
        fs::write(&path, serde_json::to_vec(&vec![indexer_record("7", "APPROVED")]).unwrap()).unwrap();

        let out = DataProcessor::default().process_file(&path, 42).unwrap();
        assert_eq!(out.documents[0].application_ref, "42:0xfeed:7");

        fs::write(&path, b"{not json").unwrap();
        assert!(DataProcessor::default().process_file(&path, 42).is_err());
    }
}
