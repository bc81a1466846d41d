pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod parser;
pub mod scratch;
pub mod sniff;

pub use crate::client::{ContentFetcher, HttpContentFetcher};
pub use crate::config::FetchConfig;
pub use crate::error::{IngestFailure, PriceListError};
pub use crate::ingest::{IngestReport, PriceListIngestor};
pub use crate::parser::PriceListReader;
