//! Where raw application records come from.
//!
//! The indexer publishes one JSON array per round plus a per-chain round list.
//! [`DirectorySource`] reads the same layout from disk, which is also what the
//! download command writes.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

use appsearch_core::error::{Error, Result};
use appsearch_core::types::{ApplicationFileLocator, RoundInfo};

use crate::snapshot::write_atomic;

const APPLICATIONS_FILE: &str = "applications.json";
const ROUNDS_FILE: &str = "rounds.json";

pub trait DataSource: Send + Sync {
    fn fetch_applications(&self, locator: &ApplicationFileLocator) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Rounds published on `chain_id`; used only to label summaries.
    fn fetch_rounds(&self, chain_id: u64) -> impl Future<Output = Result<Vec<RoundInfo>>> + Send;
}

/// Extract `id` and `roundMetadata.name` from raw round records.
pub fn parse_rounds(chain_id: u64, records: &[Value]) -> Vec<RoundInfo> {
    records
        .iter()
        .filter_map(|r| {
            let round_id = r.get("id")?.as_str()?.to_string();
            let name = r.pointer("/roundMetadata/name").and_then(Value::as_str).map(str::to_string);
            Some(RoundInfo { chain_id, round_id, name })
        })
        .collect()
}

pub struct IndexerClient {
    base_url: String,
    client: reqwest::Client,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), client })
    }

    pub fn applications_url(&self, locator: &ApplicationFileLocator) -> String {
        format!("{}/data/{}/rounds/{}/{APPLICATIONS_FILE}", self.base_url, locator.chain_id, locator.round_id)
    }

    pub fn rounds_url(&self, chain_id: u64) -> String { format!("{}/data/{chain_id}/{ROUNDS_FILE}", self.base_url) }

    /// Round records exactly as published, for mirroring.
    pub async fn fetch_rounds_raw(&self, chain_id: u64) -> Result<Vec<Value>> { self.get_json(&self.rounds_url(chain_id)).await }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let upstream = |e: reqwest::Error| Error::UpstreamFetch(format!("GET {url}: {e}"));
        debug!(url, "fetching");
        let response = self.client.get(url).send().await.map_err(upstream)?;
        let response = response.error_for_status().map_err(upstream)?;
        response.json::<T>().await.map_err(upstream)
    }
}

impl DataSource for IndexerClient {
    async fn fetch_applications(&self, locator: &ApplicationFileLocator) -> Result<Vec<Value>> {
        self.get_json(&self.applications_url(locator)).await
    }

    async fn fetch_rounds(&self, chain_id: u64) -> Result<Vec<RoundInfo>> {
        Ok(parse_rounds(chain_id, &self.fetch_rounds_raw(chain_id).await?))
    }
}

/// `{root}/{chain_id}/rounds/{round_id}/applications.json` and
/// `{root}/{chain_id}/rounds.json` on local disk.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    pub fn applications_path(&self, locator: &ApplicationFileLocator) -> PathBuf {
        self.root.join(locator.chain_id.to_string()).join("rounds").join(&locator.round_id).join(APPLICATIONS_FILE)
    }

    pub fn rounds_path(&self, chain_id: u64) -> PathBuf { self.root.join(chain_id.to_string()).join(ROUNDS_FILE) }

    /// Every round with an applications file, sorted.
    pub fn list_locators(&self) -> Result<Vec<ApplicationFileLocator>> {
        let mut locators = Vec::new();
        if !self.root.is_dir() {
            return Ok(locators);
        }
        for entry in WalkDir::new(&self.root).min_depth(4).max_depth(4) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() || entry.file_name() != APPLICATIONS_FILE {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else { continue };
            let parts: Vec<_> = relative.iter().map(|c| c.to_string_lossy()).collect();
            if let [chain, rounds, round, _] = parts.as_slice() {
                if rounds == "rounds" {
                    if let Ok(locator) = format!("{chain}:{round}").parse::<ApplicationFileLocator>() {
                        locators.push(locator);
                    }
                }
            }
        }
        locators.sort_by(|a, b| (a.chain_id, &a.round_id).cmp(&(b.chain_id, &b.round_id)));
        Ok(locators)
    }

    pub fn store_applications(&self, locator: &ApplicationFileLocator, records: &[Value]) -> Result<PathBuf> {
        let path = self.applications_path(locator);
        store_json(&path, records)?;
        Ok(path)
    }

    pub fn store_rounds(&self, chain_id: u64, records: &[Value]) -> Result<PathBuf> {
        let path = self.rounds_path(chain_id);
        store_json(&path, records)?;
        Ok(path)
    }

    fn read_records(path: &Path) -> Result<Vec<Value>> {
        let text = fs::read_to_string(path).map_err(|e| Error::UpstreamFetch(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text).map_err(|e| Error::UpstreamFetch(format!("{}: {e}", path.display())))
    }
}

fn store_json(path: &Path, records: &[Value]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    write_atomic(path, &serde_json::to_vec_pretty(records)?)
}

impl DataSource for DirectorySource {
    async fn fetch_applications(&self, locator: &ApplicationFileLocator) -> Result<Vec<Value>> {
        Self::read_records(&self.applications_path(locator))
    }

    /// A missing rounds file means no names, not a failure.
    async fn fetch_rounds(&self, chain_id: u64) -> Result<Vec<RoundInfo>> {
        let path = self.rounds_path(chain_id);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        Ok(parse_rounds(chain_id, &Self::read_records(&path)?))
    }
}
