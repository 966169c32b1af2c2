//! Core data types, aggregation and odds derivation for wxodds
//!
//! This crate turns multi-year hourly observations for one point into
//! per-bucket averages and threshold-exceedance probabilities. It never
//! performs network I/O itself; raw series come in through the
//! [`SeriesFetcher`] trait.

pub mod pipeline;
pub mod prediction;
pub mod rollups;
pub mod types;

pub use pipeline::*;
pub use prediction::*;
pub use rollups::*;
pub use types::*;

use thiserror::Error;

/// Failure while retrieving raw series from the climate-data provider
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned HTTP {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    #[error("Provider response is missing the `{0}` field")]
    MissingEnvelope(&'static str),
}

/// Outcome of a failed prediction query
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

pub type ServiceResult<T> = Result<T, PredictionError>;
