//! Bucketing of raw hourly observations across historical years

use crate::types::{is_missing, BucketKey, Granularity, RawMeasurement};
use std::collections::BTreeMap;
use tracing::debug;

/// Accumulator for the readings of one channel within a bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelAccumulator {
    observations: Vec<f64>,
}

impl ChannelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading unless it is the missing-data marker
    pub fn add(&mut self, value: f64) {
        if !is_missing(value) {
            self.observations.push(value);
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.observations.is_empty() {
            return None;
        }
        let sum: f64 = self.observations.iter().sum();
        Some(sum / self.observations.len() as f64)
    }

    /// Fraction of readings satisfying `predicate`
    pub fn fraction(&self, predicate: impl Fn(f64) -> bool) -> Option<f64> {
        if self.observations.is_empty() {
            return None;
        }
        let hits = self.observations.iter().filter(|v| predicate(**v)).count();
        Some(hits as f64 / self.observations.len() as f64)
    }

    pub fn count(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.observations
    }
}

impl FromIterator<f64> for ChannelAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        for value in iter {
            acc.add(value);
        }
        acc
    }
}

/// All readings that fell into one bucket, split by channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketAccumulator {
    pub temperature: ChannelAccumulator,
    pub precipitation: ChannelAccumulator,
    pub wind_speed: ChannelAccumulator,
}

impl BucketAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add each channel of a measurement independently
    pub fn add(&mut self, measurement: &RawMeasurement) {
        self.temperature.add(measurement.temperature);
        self.precipitation.add(measurement.precipitation);
        self.wind_speed.add(measurement.wind_speed);
    }
}

/// Group a multi-year series into buckets
///
/// Every key of `granularity` is present in the result, bound to an empty
/// accumulator when nothing contributed to it.
pub fn aggregate(
    series: &[RawMeasurement],
    granularity: Granularity,
) -> BTreeMap<BucketKey, BucketAccumulator> {
    let mut buckets: BTreeMap<BucketKey, BucketAccumulator> = granularity
        .keys()
        .into_iter()
        .map(|key| (key, BucketAccumulator::new()))
        .collect();

    let mut skipped = 0usize;
    for measurement in series {
        match granularity.key_for(measurement) {
            Some(key) => buckets.entry(key).or_default().add(measurement),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "Ignored measurements with invalid date or hour");
    }

    buckets
}
