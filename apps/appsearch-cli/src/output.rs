use serde::Serialize;
use std::fmt::Write;

use appsearch_core::types::ApplicationSummary;
use appsearch_data::{IngestReport, SearchHit};

pub fn format_json<T: Serialize>(value: &T) -> serde_json::Result<String> { serde_json::to_string_pretty(value) }

pub fn format_report(report: &IngestReport) -> String {
    format!(
        "snapshot {} written to {}\n  {} applications, {} skipped by status, {} invalid, {} duplicate refs",
        report.version,
        report.path.display(),
        report.documents,
        report.skipped,
        report.invalid,
        report.duplicates
    )
}

pub fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("{} results for {query:?}", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        let s = &hit.summary;
        let _ = write!(out, "\n{:>3}. [{} {:.4}] {} ({})", i + 1, hit.search_type, hit.score, s.name, s.application_ref);
        if !s.summary_text.is_empty() {
            let _ = write!(out, "\n     {}", s.summary_text.replace('\n', " "));
        }
    }
    out
}

pub fn format_summaries(summaries: &[ApplicationSummary]) -> String {
    let mut out = String::new();
    for s in summaries {
        let round = s.round_name.as_deref().unwrap_or(&s.round_id);
        let _ = writeln!(out, "{}\t{}\t{}", s.application_ref, s.name, round);
    }
    let _ = write!(out, "{} applications", summaries.len());
    out
}
