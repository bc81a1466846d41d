use std::time::Duration;

use pstorage::errors::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceListError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("fetch failed: {url} answered HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Incorrect file type: detected {detected}, expected text/plain")]
    UnsupportedType { detected: &'static str },

    #[error("Incorrect CSV file headers: expected \"PRODUCT NAME;PRICE\", found {found:?}")]
    InvalidHeader { found: Vec<String> },

    #[error("Incorrect CSV file structure: line {line} has {fields} fields, expected 2")]
    InvalidRowStructure { line: u64, fields: usize },

    #[error("invalid value on line {line}: {reason}")]
    InvalidValue { line: u64, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StorageError),

    #[error("store operations exceeded the {0:?} request budget")]
    Timeout(Duration),
}

impl PriceListError {
    /// Header, row-shape and value failures: the input itself is bad.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PriceListError::InvalidHeader { .. }
                | PriceListError::InvalidRowStructure { .. }
                | PriceListError::InvalidValue { .. }
                | PriceListError::Csv(_)
        )
    }

    /// Transport failures while retrieving the remote content.
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            PriceListError::Fetch(_) | PriceListError::HttpStatus { .. }
        )
    }
}

/// An ingestion run that stopped early.
///
/// `applied` counts the rows reconciled before the failure; those mutations
/// are kept.
#[derive(Debug, Error)]
#[error("{error} ({applied} records applied before the failure)")]
pub struct IngestFailure {
    pub applied: u64,
    #[source]
    pub error: PriceListError,
}

impl IngestFailure {
    pub fn new(applied: u64, error: impl Into<PriceListError>) -> Self {
        Self {
            applied,
            error: error.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PriceListError>;
