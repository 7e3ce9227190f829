//! On-disk snapshot layout.
//!
//! Each ingestion run writes one `{storage_root}/{version}/` directory. The
//! summaries file is written last, so its presence marks the snapshot as
//! complete; readers ignore every directory without it.

use chrono::{NaiveDateTime, Utc};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use appsearch_core::document::InputDocument;
use appsearch_core::error::{Error, Result};
use appsearch_core::types::SummaryMap;

pub const SUMMARIES_FILE: &str = "summaries.json";
pub const DOCUMENTS_FILE: &str = "documents.json";
pub const FULLTEXT_FILE: &str = "fulltext-index.json";
pub const SEMANTIC_DIR: &str = "semantic-index";

/// Sorts lexicographically in creation order.
const VERSION_FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

pub fn new_version() -> String { Utc::now().format(VERSION_FORMAT).to_string() }

pub fn is_version_name(name: &str) -> bool { NaiveDateTime::parse_from_str(name, VERSION_FORMAT).is_ok() }

/// Write to `<path>.tmp`, fsync, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    {
        let mut file = OpenOptions::new().create(true).truncate(true).write(true).open(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDir {
    pub version: String,
    pub path: PathBuf,
}

impl SnapshotDir {
    pub fn new(root: &Path, version: impl Into<String>) -> Self {
        let version = version.into();
        Self { path: root.join(&version), version }
    }

    pub fn summaries_path(&self) -> PathBuf { self.path.join(SUMMARIES_FILE) }

    pub fn documents_path(&self) -> PathBuf { self.path.join(DOCUMENTS_FILE) }

    pub fn fulltext_path(&self) -> PathBuf { self.path.join(FULLTEXT_FILE) }

    pub fn semantic_path(&self) -> PathBuf { self.path.join(SEMANTIC_DIR) }

    pub fn is_complete(&self) -> bool { self.summaries_path().is_file() }

    pub fn read_summaries(&self) -> Result<SummaryMap> {
        let bytes = fs::read(self.summaries_path())?;
        serde_json::from_slice(&bytes).map_err(|e| Error::CorruptIndex(format!("{}: {e}", self.summaries_path().display())))
    }

    pub fn read_documents(&self) -> Result<Vec<InputDocument>> {
        let path = self.documents_path();
        if !path.is_file() {
            return Err(Error::NotFound(format!("no document corpus at {}", path.display())));
        }
        serde_json::from_slice(&fs::read(&path)?).map_err(|e| Error::CorruptIndex(format!("{}: {e}", path.display())))
    }
}

/// Snapshot directories under `root`, oldest first. Other entries (such as
/// the embedding cache) are ignored.
pub fn list(root: &Path) -> Result<Vec<SnapshotDir>> {
    let mut dirs = Vec::new();
    if !root.is_dir() {
        return Ok(dirs);
    }
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if is_version_name(&name) {
            dirs.push(SnapshotDir { version: name, path: entry.path() });
        }
    }
    dirs.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(dirs)
}

pub fn latest_complete(root: &Path) -> Result<Option<SnapshotDir>> {
    Ok(list(root)?.into_iter().rev().find(SnapshotDir::is_complete))
}

/// Remove incomplete snapshots and all but the newest `keep` complete ones.
/// Versions in `protected` are never removed. Returns the removed versions.
pub fn prune(root: &Path, keep: usize, protected: &[&str]) -> Result<Vec<String>> {
    let mut complete_seen = 0;
    let mut removed = Vec::new();
    for dir in list(root)?.into_iter().rev() {
        let expendable = if dir.is_complete() {
            complete_seen += 1;
            complete_seen > keep
        } else {
            true
        };
        if !expendable || protected.contains(&dir.version.as_str()) {
            continue;
        }
        match fs::remove_dir_all(&dir.path) {
            Ok(()) => removed.push(dir.version),
            Err(e) => warn!(version = %dir.version, error = %e, "failed to remove old snapshot"),
        }
    }
    if !removed.is_empty() {
        info!(removed = ?removed, "pruned snapshots");
    }
    Ok(removed)
}
