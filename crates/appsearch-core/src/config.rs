//! Settings loader and path helpers.
//!
//! Uses Figment to merge `appsearch.toml` + `appsearch.<env>.toml` + `APP_*`
//! env vars into typed [`Settings`].

use crate::data_processor::FieldMapping;
use crate::error::{Error, Result};
use crate::query::QueryDefaults;
use crate::traits::SemanticOptions;
use crate::types::{parse_locators, ApplicationFileLocator};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Directory under the storage root shared by all snapshots.
pub const EMBEDDING_CACHE_DIR: &str = "embedding-cache";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Minilm,
    Hash,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingDevice {
    #[default]
    Auto,
    Cpu,
    Metal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    /// Where the model backend runs.
    pub device: EmbeddingDevice,
    /// Holds `config.json`, `tokenizer.json` and the model weights.
    pub model_dir: String,
    pub max_len: usize,
    /// Output size of the hash backend.
    pub hash_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { backend: EmbeddingBackend::Minilm, device: EmbeddingDevice::Auto, model_dir: "./models/all-MiniLM-L6-v2".into(), max_len: 256, hash_dim: 384 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticSettings {
    pub top_k: usize,
    pub batch_size: usize,
    pub use_cache: bool,
}

impl Default for SemanticSettings {
    fn default() -> Self { Self { top_k: 10, batch_size: 32, use_cache: true } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub storage_dir: String,
    /// Comma separated `<chain_id>:0x<round_id>` list.
    pub application_files_locators: String,
    pub indexer_base_url: String,
    pub fetch_timeout_secs: u64,
    pub max_results_per_search_strategy: usize,
    pub refresh_interval_secs: u64,
    pub snapshots_to_keep: usize,
    /// Swap engines on every reload instead of only on the first one.
    pub reload_indices: bool,
    pub search: QueryDefaults,
    pub semantic: SemanticSettings,
    pub embedding: EmbeddingSettings,
    pub field_mapping: FieldMapping,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: "./var/storage".into(),
            application_files_locators: String::new(),
            indexer_base_url: "https://indexer-production.fly.dev".into(),
            fetch_timeout_secs: 30,
            max_results_per_search_strategy: 25,
            refresh_interval_secs: 1800,
            snapshots_to_keep: 2,
            reload_indices: false,
            search: QueryDefaults::default(),
            semantic: SemanticSettings::default(),
            embedding: EmbeddingSettings::default(),
            field_mapping: FieldMapping::default(),
        }
    }
}

impl Settings {
    /// `appsearch.toml`, then `appsearch.<RUST_ENV>.toml`, then `APP_*`
    /// variables (`__` separates nested keys, e.g. `APP_SEMANTIC__TOP_K`).
    pub fn figment() -> Figment {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let mut figment = Figment::new().merge(Toml::file("appsearch.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("appsearch.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("appsearch.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("appsearch.test.toml")),
            _ => {}
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn load() -> Result<Self> { Self::from_figment(&Self::figment()) }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let settings: Self = figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(Error::InvalidConfig("fetch_timeout_secs must be greater than 0".into()));
        }
        if self.max_results_per_search_strategy == 0 {
            return Err(Error::InvalidConfig("max_results_per_search_strategy must be greater than 0".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(Error::InvalidConfig("refresh_interval_secs must be greater than 0".into()));
        }
        if self.snapshots_to_keep == 0 {
            return Err(Error::InvalidConfig("snapshots_to_keep must be at least 1".into()));
        }
        if self.semantic.top_k == 0 || self.semantic.batch_size == 0 {
            return Err(Error::InvalidConfig("semantic.top_k and semantic.batch_size must be greater than 0".into()));
        }
        if self.embedding.max_len == 0 || self.embedding.hash_dim == 0 {
            return Err(Error::InvalidConfig("embedding.max_len and embedding.hash_dim must be greater than 0".into()));
        }
        self.search.validate()?;
        self.locators()?;
        Ok(())
    }

    pub fn storage_root(&self) -> PathBuf { expand_path(&self.storage_dir) }

    pub fn locators(&self) -> Result<Vec<ApplicationFileLocator>> { parse_locators(&self.application_files_locators) }

    pub fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }

    pub fn refresh_interval(&self) -> Duration { Duration::from_secs(self.refresh_interval_secs) }

    pub fn semantic_options(&self) -> SemanticOptions {
        SemanticOptions {
            top_k: self.semantic.top_k,
            batch_size: self.semantic.batch_size,
            cache_dir: self.semantic.use_cache.then(|| self.storage_root().join(EMBEDDING_CACHE_DIR)),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
