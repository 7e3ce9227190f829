//! Domain types shared by the engines, the fusion step and the registry.

use crate::document::InputDocument;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// `{chain_id}:{round_id}:{round_application_id}`.
pub type ApplicationRef = String;

/// Summaries keyed by `application_ref`. Ordered so listings and persisted
/// artifacts are stable.
pub type SummaryMap = BTreeMap<ApplicationRef, ApplicationSummary>;

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Fulltext,
    Semantic,
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fulltext => f.write_str("fulltext"),
            Self::Semantic => f.write_str("semantic"),
        }
    }
}

/// The minimal surface returned by all engines.
///
/// `application_ref` always names an indexed `InputDocument`. `score` is
/// engine-specific but higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchEngineResult {
    #[serde(rename = "ref")]
    pub application_ref: ApplicationRef,
    pub score: f32,
    #[serde(rename = "type")]
    pub search_type: SearchType,
}

impl SearchEngineResult {
    pub fn fulltext(application_ref: impl Into<String>, score: f32) -> Self {
        Self { application_ref: application_ref.into(), score, search_type: SearchType::Fulltext }
    }

    pub fn semantic(application_ref: impl Into<String>, score: f32) -> Self {
        Self { application_ref: application_ref.into(), score, search_type: SearchType::Semantic }
    }
}

/// Read-optimised projection of an application without its body text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub application_ref: ApplicationRef,
    pub chain_id: u64,
    pub round_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_name: Option<String>,
    pub round_application_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub name: String,
    pub website_url: String,
    pub payout_wallet_address: String,
    pub banner_image_cid: Option<String>,
    pub logo_image_cid: Option<String>,
    pub summary_text: String,
}

impl ApplicationSummary {
    pub fn from_document(doc: &InputDocument, round_name: Option<String>) -> Self {
        Self {
            application_ref: doc.application_ref.clone(),
            chain_id: doc.chain_id,
            round_id: doc.round_id.clone(),
            round_name,
            round_application_id: doc.round_application_id.clone(),
            project_id: doc.project_id.clone(),
            name: doc.name.clone(),
            website_url: doc.website_url.clone(),
            payout_wallet_address: doc.payout_wallet_address.clone(),
            banner_image_cid: doc.banner_image_cid.clone(),
            logo_image_cid: doc.logo_image_cid.clone(),
            summary_text: doc.summary_text.clone(),
        }
    }
}

impl From<&InputDocument> for ApplicationSummary {
    fn from(doc: &InputDocument) -> Self { Self::from_document(doc, None) }
}

/// Names one published applications file: `{chain_id}:{round_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationFileLocator {
    pub chain_id: u64,
    pub round_id: String,
}

impl ApplicationFileLocator {
    pub fn new(chain_id: u64, round_id: impl Into<String>) -> Self { Self { chain_id, round_id: round_id.into() } }
}

impl fmt::Display for ApplicationFileLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}:{}", self.chain_id, self.round_id) }
}

impl FromStr for ApplicationFileLocator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidConfig(format!("invalid application file locator {s:?}, expected `<chain_id>:0x<round_id>`"));
        let (chain, round) = s.trim().split_once(':').ok_or_else(invalid)?;
        if chain.is_empty() || !chain.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let chain_id = chain.parse::<u64>().map_err(|_| invalid())?;
        let hex = round.strip_prefix("0x").ok_or_else(invalid)?;
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        Ok(Self::new(chain_id, round))
    }
}

/// Parse a comma separated locator list. Blank entries are ignored.
pub fn parse_locators(list: &str) -> Result<Vec<ApplicationFileLocator>> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::parse).collect()
}

/// Round metadata used to label summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub chain_id: u64,
    pub round_id: String,
    pub name: Option<String>,
}
