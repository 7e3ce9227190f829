//! Outlier-based fusion of full-text and semantic rankings.

use std::collections::HashSet;

use appsearch_core::types::SearchEngineResult;

/// Full-text results kept when no score stands out.
const FALLBACK_FULLTEXT: usize = 2;

/// Merge two ranked lists into one.
///
/// Full-text results contribute only their outliers, scores strictly above
/// `mean + std_dev_factor * population_std_dev`, or the first two results
/// when nothing stands out. Lists of two or fewer are kept whole. Semantic
/// results contribute everything scoring above `semantic_cutoff` that the
/// full-text side did not already return. Each side keeps its own order.
pub fn combine(fulltext: &[SearchEngineResult], semantic: &[SearchEngineResult], std_dev_factor: u8, semantic_cutoff: f32) -> Vec<SearchEngineResult> {
    let mut combined: Vec<SearchEngineResult> = fulltext_subset(fulltext, std_dev_factor);
    let seen: HashSet<String> = combined.iter().map(|r| r.application_ref.clone()).collect();
    combined.extend(semantic.iter().filter(|r| r.score > semantic_cutoff && !seen.contains(&r.application_ref)).cloned());
    combined
}

fn fulltext_subset(fulltext: &[SearchEngineResult], std_dev_factor: u8) -> Vec<SearchEngineResult> {
    if fulltext.len() <= FALLBACK_FULLTEXT {
        return fulltext.to_vec();
    }
    let (mean, std_dev) = mean_and_std_dev(fulltext.iter().map(|r| f64::from(r.score)));
    let cutoff = mean + std_dev * f64::from(std_dev_factor);
    let outliers: Vec<SearchEngineResult> = fulltext.iter().filter(|r| f64::from(r.score) > cutoff).cloned().collect();
    if outliers.is_empty() { fulltext[..FALLBACK_FULLTEXT].to_vec() } else { outliers }
}

/// Mean and population standard deviation.
fn mean_and_std_dev(scores: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = scores.clone().count() as f64;
    let mean = scores.clone().sum::<f64>() / n;
    let variance = scores.map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
