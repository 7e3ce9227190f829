use std::path::PathBuf;
use thiserror::Error;

/// Why a raw application record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record {record}: missing field `{field}`")]
    MissingField { record: String, field: &'static str },

    #[error("record {record}: field `{field}` must be a {expected}")]
    WrongType { record: String, field: &'static str, expected: &'static str },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed search query {query:?}: {reason}")]
    MalformedQuery { query: String, reason: String },

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Refusing to overwrite existing index at {}", .0.display())]
    ReindexNotSupported(PathBuf),

    #[error("Anomaly detected: {0}")]
    AnomalyDetected(String),

    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("A refresh is already in progress")]
    RefreshInProgress,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl Error {
    pub fn malformed_query(query: &str, reason: impl Into<String>) -> Self {
        Self::MalformedQuery { query: query.to_string(), reason: reason.into() }
    }
}

/// Engine adapters return `anyhow::Error`; recover the typed error when the
/// chain carries one so callers can still match on it.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(typed) => typed,
            Err(err) => Self::Other(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn typed_error_survives_anyhow_round_trip() {
        let wrapped: anyhow::Error = Error::NotFound("semantic-index".into()).into();
        assert!(matches!(Error::from(wrapped), Error::NotFound(_)));
    }

    #[test]
    fn context_does_not_hide_typed_error() {
        let res: anyhow::Result<()> = Err(Error::CorruptIndex("bad checksum".into())).context("loading fulltext");
        let err = Error::from(res.unwrap_err());
        assert!(matches!(err, Error::CorruptIndex(_)), "got {err:?}");
    }

    #[test]
    fn foreign_errors_become_other() {
        let err = Error::from(anyhow::anyhow!("lance exploded"));
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.to_string(), "lance exploded");
    }
}
