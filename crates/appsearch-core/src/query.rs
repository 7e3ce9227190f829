//! Search query grammar.
//!
//! A query is a shell-like token list: bare tokens are keywords, `--name=value`
//! tokens set search parameters. Parsing is a single pass with no state kept
//! between queries.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_STD_DEV_FACTOR: u8 = 1;
pub const MAX_STD_DEV_FACTOR: u8 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    Fulltext,
    Semantic,
    #[default]
    Hybrid,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fulltext => "fulltext",
            Self::Semantic => "semantic",
            Self::Hybrid => "hybrid",
        })
    }
}

impl FromStr for SearchStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fulltext" => Ok(Self::Fulltext),
            "semantic" => Ok(Self::Semantic),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown strategy {other:?}, expected fulltext, semantic or hybrid")),
        }
    }
}

/// Parameter values used when a query omits a flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    pub strategy: SearchStrategy,
    pub fulltext_std_dev_factor: u8,
    pub semantic_score_cutoff: f32,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self { strategy: SearchStrategy::Hybrid, fulltext_std_dev_factor: 1, semantic_score_cutoff: 0.35 }
    }
}

impl QueryDefaults {
    pub fn validate(&self) -> Result<()> {
        check_std_dev_factor(self.fulltext_std_dev_factor).map_err(|e| Error::InvalidConfig(format!("search.fulltext_std_dev_factor: {e}")))?;
        check_score_cutoff(self.semantic_score_cutoff).map_err(|e| Error::InvalidConfig(format!("search.semantic_score_cutoff: {e}")))?;
        Ok(())
    }
}

fn check_std_dev_factor(v: u8) -> std::result::Result<u8, String> {
    if (MIN_STD_DEV_FACTOR..=MAX_STD_DEV_FACTOR).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{v} is outside [{MIN_STD_DEV_FACTOR}, {MAX_STD_DEV_FACTOR}]"))
    }
}

fn check_score_cutoff(v: f32) -> std::result::Result<f32, String> {
    if (0.0..1.0).contains(&v) { Ok(v) } else { Err(format!("{v} is outside [0, 1)")) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub strategy: SearchStrategy,
    pub keywords: Vec<String>,
    pub hybrid_fulltext_std_dev_factor: u8,
    pub semantic_score_cutoff: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    raw: String,
    params: SearchParams,
}

impl SearchQuery {
    pub fn parse(query: &str) -> Result<Self> { Self::parse_with_defaults(query, &QueryDefaults::default()) }

    pub fn parse_with_defaults(query: &str, defaults: &QueryDefaults) -> Result<Self> {
        let tokens = shlex::split(query).ok_or_else(|| Error::malformed_query(query, "unbalanced quotes"))?;
        let mut params = SearchParams {
            strategy: defaults.strategy,
            keywords: Vec::new(),
            hybrid_fulltext_std_dev_factor: defaults.fulltext_std_dev_factor,
            semantic_score_cutoff: defaults.semantic_score_cutoff,
        };

        for token in tokens {
            let Some(flag) = token.strip_prefix("--") else {
                params.keywords.push(token);
                continue;
            };
            let (name, value) = flag
                .split_once('=')
                .ok_or_else(|| Error::malformed_query(query, format!("flag `{token}` needs a value (`--name=value`)")))?;
            let bad_value = |reason: String| Error::malformed_query(query, format!("--{name}: {reason}"));
            match name {
                "strategy" => params.strategy = value.parse().map_err(bad_value)?,
                "hybrid-search-fulltext-std-dev-factor" => {
                    let factor = value.parse::<u8>().map_err(|e| bad_value(format!("{value:?}: {e}")))?;
                    params.hybrid_fulltext_std_dev_factor = check_std_dev_factor(factor).map_err(bad_value)?;
                }
                "hybrid-search-semantic-score-cutoff" | "semantic-score-cutoff" => {
                    let cutoff = value.parse::<f32>().map_err(|e| bad_value(format!("{value:?}: {e}")))?;
                    params.semantic_score_cutoff = check_score_cutoff(cutoff).map_err(bad_value)?;
                }
                _ => return Err(Error::malformed_query(query, format!("unknown flag `--{name}`"))),
            }
        }

        Ok(Self { raw: query.to_string(), params })
    }

    pub fn raw(&self) -> &str { &self.raw }

    pub fn params(&self) -> &SearchParams { &self.params }

    /// Keywords joined by single spaces; what the engines receive.
    pub fn string(&self) -> String { self.params.keywords.join(" ") }

    pub fn is_valid(&self) -> bool { !self.params.keywords.is_empty() }
}
