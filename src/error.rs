use std::path::PathBuf;

use thiserror::Error;

/// One source's feed could not be retrieved or parsed.
///
/// Recorded in the crawl outcome, never propagated past the coordinator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with HTTP {0}")]
    Status(u16),

    #[error("malformed feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("no crawl report yet, run a crawl first")]
    NoReportYet,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no saved report at {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("saved report at {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    /// True when the failure means "nothing has been saved yet" rather than a broken file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("{index} is out of range (1..={len})")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("a crawl is already in progress")]
    CrawlInProgress,
}
