//! Derivation of per-bucket averages and exceedance odds

use crate::rollups::BucketAccumulator;
use crate::types::BucketKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Temperature above which an hour counts as very hot (°C)
pub const HOT_THRESHOLD_C: f64 = 30.0;

/// Temperature below which an hour counts as very cold (°C)
pub const COLD_THRESHOLD_C: f64 = -20.0;

/// Wind speed above which an hour counts as very windy (m/s)
pub const WINDY_THRESHOLD_MS: f64 = 10.0;

/// Precipitation rate above which an hour counts as very wet (mm/hr)
pub const WET_THRESHOLD_MM_HR: f64 = 1.0;

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Averages {
    pub temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Probabilities {
    pub very_hot: f64,
    pub very_cold: f64,
    pub very_windy: f64,
    pub very_wet: f64,
    pub very_uncomfortable: f64,
}

/// Derived statistics for one bucket
///
/// Serializes as a two-element array: `[averages, probabilities]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BucketSummary {
    pub averages: Averages,
    pub probabilities: Probabilities,
}

impl BucketSummary {
    /// Summary for a bucket without temperature readings
    pub const EMPTY: BucketSummary = BucketSummary {
        averages: Averages {
            temperature: 0.0,
            precipitation: 0.0,
            wind_speed: 0.0,
        },
        probabilities: Probabilities {
            very_hot: 0.0,
            very_cold: 0.0,
            very_windy: 0.0,
            very_wet: 0.0,
            very_uncomfortable: 0.0,
        },
    };
}

impl Serialize for BucketSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.averages, &self.probabilities).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BucketSummary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (averages, probabilities) = <(Averages, Probabilities)>::deserialize(deserializer)?;
        Ok(Self {
            averages,
            probabilities,
        })
    }
}

/// Summary of one accumulated bucket
pub fn derive(acc: &BucketAccumulator) -> BucketSummary {
    if acc.temperature.is_empty() {
        return BucketSummary::EMPTY;
    }

    let temperature = acc.temperature.mean().unwrap_or(0.0);
    let precipitation = acc.precipitation.mean().unwrap_or(0.0);
    let wind_speed = acc.wind_speed.mean().unwrap_or(0.0);

    let hot = acc
        .temperature
        .fraction(|t| t > HOT_THRESHOLD_C)
        .unwrap_or(0.0);
    let cold = acc
        .temperature
        .fraction(|t| t < COLD_THRESHOLD_C)
        .unwrap_or(0.0);
    let windy = acc
        .wind_speed
        .fraction(|w| w > WINDY_THRESHOLD_MS)
        .unwrap_or(0.0);
    let wet = acc
        .precipitation
        .fraction(|p| p > WET_THRESHOLD_MM_HR)
        .unwrap_or(0.0);
    let uncomfortable = hot.max(cold).max(windy).max(wet);

    BucketSummary {
        averages: Averages {
            temperature: round_to(temperature, 1),
            precipitation: round_to(precipitation, 2),
            wind_speed: round_to(wind_speed, 1),
        },
        probabilities: Probabilities {
            very_hot: round_to(hot, 2),
            very_cold: round_to(cold, 2),
            very_windy: round_to(windy, 2),
            very_wet: round_to(wet, 2),
            very_uncomfortable: round_to(uncomfortable, 2),
        },
    }
}

/// Summaries for every bucket of one query, keyed by bucket
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionResult {
    buckets: BTreeMap<BucketKey, BucketSummary>,
}

impl PredictionResult {
    pub fn get(&self, key: &BucketKey) -> Option<&BucketSummary> {
        self.buckets.get(key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &BucketKey> {
        self.buckets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, &BucketSummary)> {
        self.buckets.iter()
    }

    pub fn into_inner(self) -> BTreeMap<BucketKey, BucketSummary> {
        self.buckets
    }
}

impl FromIterator<(BucketKey, BucketSummary)> for PredictionResult {
    fn from_iter<I: IntoIterator<Item = (BucketKey, BucketSummary)>>(iter: I) -> Self {
        Self {
            buckets: iter.into_iter().collect(),
        }
    }
}

/// Derive every accumulated bucket
pub fn derive_all(buckets: &BTreeMap<BucketKey, BucketAccumulator>) -> PredictionResult {
    buckets.iter().map(|(key, acc)| (*key, derive(acc))).collect()
}
