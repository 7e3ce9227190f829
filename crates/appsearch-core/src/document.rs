//! Validation and enrichment of application records.
//!
//! Both steps are pure: a raw record either becomes a complete
//! [`InputDocument`] or a [`ValidationError`], never something in between.

use crate::error::ValidationError;
use pulldown_cmark::{Event, Parser, TagEnd};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Plain-text summaries keep at most this many characters before `...`.
pub const SUMMARY_TEXT_MAX_CHARS: usize = 300;
const ELLIPSIS: &str = "...";

/// An application record with each field located but not yet type-checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawApplication {
    pub round_id: String,
    pub round_application_id: Option<Value>,
    pub project_id: Option<Value>,
    pub name: Option<Value>,
    pub website_url: Option<Value>,
    pub description: Option<Value>,
    pub payout_wallet_address: Option<Value>,
    pub banner_image_cid: Option<Value>,
    pub logo_image_cid: Option<Value>,
}

/// A record whose required fields are present and correctly typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub round_id: String,
    pub round_application_id: String,
    pub project_id: Option<String>,
    pub name: String,
    pub website_url: String,
    pub description_markdown: String,
    pub payout_wallet_address: String,
    pub banner_image_cid: Option<String>,
    pub logo_image_cid: Option<String>,
}

/// A validated unit of indexable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDocument {
    pub application_ref: String,
    pub chain_id: u64,
    pub round_id: String,
    pub round_application_id: String,
    pub project_id: Option<String>,
    pub name: String,
    pub website_url: String,
    pub payout_wallet_address: String,
    pub banner_image_cid: Option<String>,
    pub logo_image_cid: Option<String>,
    pub description_markdown: String,
    pub summary_text: String,
}

impl InputDocument {
    pub fn from_raw(raw: &RawApplication, chain_id: u64) -> Result<Self, ValidationError> {
        Ok(enrich(validate(raw)?, chain_id))
    }
}

pub fn application_ref(chain_id: u64, round_id: &str, round_application_id: &str) -> String {
    format!("{chain_id}:{round_id}:{round_application_id}")
}

pub fn validate(raw: &RawApplication) -> Result<ApplicationRecord, ValidationError> {
    let record = match raw.round_application_id.as_ref().and_then(Value::as_str) {
        Some(id) => format!("{}:{id}", raw.round_id),
        None => format!("{}:?", raw.round_id),
    };
    let required = |field: &'static str, value: &Option<Value>| -> Result<String, ValidationError> {
        match value {
            None | Some(Value::Null) => Err(ValidationError::MissingField { record: record.clone(), field }),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ValidationError::WrongType { record: record.clone(), field, expected: "string" }),
        }
    };

    Ok(ApplicationRecord {
        round_id: raw.round_id.clone(),
        round_application_id: required("round_application_id", &raw.round_application_id)?,
        name: required("name", &raw.name)?,
        website_url: required("website_url", &raw.website_url)?,
        payout_wallet_address: required("payout_wallet_address", &raw.payout_wallet_address)?,
        description_markdown: required("description", &raw.description)?,
        project_id: optional(raw.project_id.as_ref()),
        banner_image_cid: optional(raw.banner_image_cid.as_ref()),
        logo_image_cid: optional(raw.logo_image_cid.as_ref()),
    })
}

fn optional(value: Option<&Value>) -> Option<String> { value.and_then(Value::as_str).map(str::to_string) }

pub fn enrich(record: ApplicationRecord, chain_id: u64) -> InputDocument {
    let summary_text = summarize(&markdown_to_plain_text(&record.description_markdown));
    InputDocument {
        application_ref: application_ref(chain_id, &record.round_id, &record.round_application_id),
        chain_id,
        round_id: record.round_id,
        round_application_id: record.round_application_id,
        project_id: record.project_id,
        name: record.name,
        website_url: record.website_url,
        payout_wallet_address: record.payout_wallet_address,
        banner_image_cid: record.banner_image_cid,
        logo_image_cid: record.logo_image_cid,
        description_markdown: record.description_markdown,
        summary_text,
    }
}

/// Render markdown as plain text: block boundaries and line breaks collapse
/// to a single newline, formatting is dropped.
pub fn markdown_to_plain_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak | Event::HardBreak => push_newline(&mut out),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => push_newline(&mut out),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn push_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Keep the first [`SUMMARY_TEXT_MAX_CHARS`] characters, appending `...`
/// only when something was cut.
pub fn summarize(plain: &str) -> String {
    match plain.char_indices().nth(SUMMARY_TEXT_MAX_CHARS) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &plain[..cut]),
        None => plain.to_string(),
    }
}
