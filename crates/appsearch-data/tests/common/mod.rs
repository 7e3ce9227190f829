#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use appsearch_core::data_processor::FieldMapping;
use appsearch_core::error::Result;
use appsearch_core::query::QueryDefaults;
use appsearch_core::traits::{Embedder, SemanticOptions};
use appsearch_core::types::{ApplicationFileLocator, RoundInfo};
use appsearch_data::{DataSource, Dataset, DatasetConfig, ReloadPolicy};
use appsearch_embed::HashEmbedder;
use appsearch_text::TantivyIndex;
use appsearch_vector::LanceSemanticIndex;
use serde_json::{json, Value};

pub type TestDataset = Dataset<TantivyIndex, LanceSemanticIndex>;

pub fn locator() -> ApplicationFileLocator { ApplicationFileLocator::new(10, "0xabc") }

pub fn record(id: &str, title: &str, description: &str) -> Value {
    record_with_status(id, title, description, "APPROVED")
}

pub fn record_with_status(id: &str, title: &str, description: &str, status: &str) -> Value {
    json!({
        "id": id,
        "projectId": format!("0xproject{id}"),
        "status": status,
        "metadata": {
            "application": {
                "recipient": "0xpayout",
                "project": {
                    "title": title,
                    "website": "https://example.org",
                    "description": description
                }
            }
        }
    })
}

pub fn base_records() -> Vec<Value> {
    vec![
        record("0", "Forest Keepers", "We plant **trees** and protect forests."),
        record("1", "Clean Water", "Wells and filters for rural villages."),
        record("0", "Forest Keepers Again", "A second record with the same id."),
        record_with_status("2", "Pending Project", "Not approved yet.", "PENDING"),
    ]
}

/// In-memory source keyed by locator string.
#[derive(Default)]
pub struct StaticSource {
    records: Mutex<HashMap<String, Vec<Value>>>,
}

impl StaticSource {
    pub fn with(locator: &ApplicationFileLocator, records: Vec<Value>) -> Self {
        let source = Self::default();
        source.set(locator, records);
        source
    }

    pub fn set(&self, locator: &ApplicationFileLocator, records: Vec<Value>) {
        self.records.lock().expect("lock").insert(locator.to_string(), records);
    }
}

impl DataSource for StaticSource {
    async fn fetch_applications(&self, locator: &ApplicationFileLocator) -> Result<Vec<Value>> {
        Ok(self.records.lock().expect("lock").get(&locator.to_string()).cloned().unwrap_or_default())
    }

    async fn fetch_rounds(&self, chain_id: u64) -> Result<Vec<RoundInfo>> {
        Ok(vec![RoundInfo { chain_id, round_id: "0xABC".into(), name: Some("Climate Round".into()) }])
    }
}

pub fn embedder() -> Arc<dyn Embedder> { Arc::new(HashEmbedder::new(256)) }

pub fn config(root: &Path, reload_policy: ReloadPolicy) -> DatasetConfig {
    DatasetConfig {
        storage_root: root.to_path_buf(),
        field_mapping: FieldMapping::indexer(),
        semantic: SemanticOptions { top_k: 5, batch_size: 4, cache_dir: None },
        query_defaults: QueryDefaults::default(),
        max_results: 25,
        snapshots_to_keep: 2,
        reload_policy,
    }
}

pub fn dataset(root: &Path) -> TestDataset { Dataset::new(config(root, ReloadPolicy::SummariesOnly), embedder()) }
