//! Historical series retrieval from the NASA POWER hourly point API
//!
//! [`PowerClient`] implements [`wxodds_core::SeriesFetcher`] by issuing
//! one request per historical year, concurrently, and failing the whole
//! query if any single year fails.

pub mod envelope;
pub mod power;

pub use envelope::parse_envelope;
pub use power::*;
