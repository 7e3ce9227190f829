#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod data_processor;
pub mod document;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;

pub use document::InputDocument;
pub use error::{Error, Result};
pub use query::{SearchParams, SearchQuery, SearchStrategy};
pub use types::{ApplicationFileLocator, ApplicationSummary, SearchEngineResult, SearchType};
