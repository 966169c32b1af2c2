//! Core data types for historical observations and query parameters

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::{PredictionError, ServiceResult};

/// Provider marker for an unavailable reading
pub const MISSING_VALUE: f64 = -999.0;

pub const HOURS_PER_DAY: u32 = 24;

/// Highest day-of-year in a leap year
pub const MAX_DAY_OF_YEAR: u32 = 366;

/// Leap year used to resolve month/day pairs that are independent of a year
const LEAP_REFERENCE_YEAR: i32 = 2000;

/// Whether a channel value is the provider's missing-data marker
pub fn is_missing(value: f64) -> bool {
    value == MISSING_VALUE
}

/// One hourly observation from a single historical year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,

    /// Air temperature at 2m (°C)
    pub temperature: f64,

    /// Corrected precipitation rate (mm/hr)
    pub precipitation: f64,

    /// Wind speed at 2m (m/s)
    pub wind_speed: f64,
}

impl RawMeasurement {
    /// Calendar date of the observation, if the fields form a real date
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// 1-based ordinal day within the observation's own year
    pub fn day_of_year(&self) -> Option<u32> {
        self.date().map(|d| d.ordinal())
    }
}

/// A validated geographic coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> ServiceResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(PredictionError::InvalidInput(format!(
                "latitude must be within [-90, 90], got {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(PredictionError::InvalidInput(format!(
                "longitude must be within [-180, 180], got {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// The day a caller asks about, in any of the accepted representations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySpecifier {
    /// 1-based day-of-year on the leap calendar (60 = Feb 29)
    DayOfYear(u32),
    Calendar { month: u32, day: u32 },
    /// Seconds since the Unix epoch, read as a UTC calendar date
    UnixTime(i64),
}

impl DaySpecifier {
    /// Resolve to the canonical month/day form
    pub fn normalize(self) -> ServiceResult<QueryDay> {
        let date = match self {
            DaySpecifier::DayOfYear(ordinal) => {
                NaiveDate::from_yo_opt(LEAP_REFERENCE_YEAR, ordinal).ok_or_else(|| {
                    PredictionError::InvalidInput(format!(
                        "day-of-year must be within [1, {MAX_DAY_OF_YEAR}], got {ordinal}"
                    ))
                })?
            }
            DaySpecifier::Calendar { month, day } => {
                NaiveDate::from_ymd_opt(LEAP_REFERENCE_YEAR, month, day).ok_or_else(|| {
                    PredictionError::InvalidInput(format!("no such calendar day: {month}/{day}"))
                })?
            }
            DaySpecifier::UnixTime(seconds) => DateTime::<Utc>::from_timestamp(seconds, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    PredictionError::InvalidInput(format!("unix time out of range: {seconds}"))
                })?,
        };

        Ok(QueryDay {
            month: date.month(),
            day: date.day(),
        })
    }
}

/// A calendar day independent of year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryDay {
    month: u32,
    day: u32,
}

impl QueryDay {
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// This day within `year`; `None` for Feb 29 in a common year
    pub fn in_year(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }

    /// Day-of-year on the leap calendar
    pub fn day_of_year(&self) -> u32 {
        NaiveDate::from_ymd_opt(LEAP_REFERENCE_YEAR, self.month, self.day)
            .map(|d| d.ordinal())
            .unwrap_or(0)
    }
}

impl fmt::Display for QueryDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.month, self.day)
    }
}

/// Inclusive range of historical years sampled per query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    start: i32,
    end: i32,
}

impl YearWindow {
    /// Returns `None` when `start` is after `end`
    pub fn new(start: i32, end: i32) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        self.years().contains(&year)
    }
}

/// How observations are grouped into buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Granularity {
    #[default]
    #[serde(rename = "hour")]
    HourOfDay,
    #[serde(rename = "day-hour")]
    DayOfYearHour,
}

impl Granularity {
    /// Number of buckets in the full key range
    pub fn bucket_count(&self) -> usize {
        match self {
            Granularity::HourOfDay => HOURS_PER_DAY as usize,
            Granularity::DayOfYearHour => (MAX_DAY_OF_YEAR * HOURS_PER_DAY) as usize,
        }
    }

    /// Every valid key, ascending
    pub fn keys(&self) -> Vec<BucketKey> {
        match self {
            Granularity::HourOfDay => (0..HOURS_PER_DAY).map(BucketKey::Hour).collect(),
            Granularity::DayOfYearHour => (1..=MAX_DAY_OF_YEAR)
                .flat_map(|day_of_year| {
                    (0..HOURS_PER_DAY).map(move |hour| BucketKey::DayHour { day_of_year, hour })
                })
                .collect(),
        }
    }

    /// Bucket for a measurement, or `None` if its hour or date is invalid
    pub fn key_for(&self, measurement: &RawMeasurement) -> Option<BucketKey> {
        if measurement.hour >= HOURS_PER_DAY {
            return None;
        }
        match self {
            Granularity::HourOfDay => Some(BucketKey::Hour(measurement.hour)),
            Granularity::DayOfYearHour => {
                measurement
                    .day_of_year()
                    .map(|day_of_year| BucketKey::DayHour {
                        day_of_year,
                        hour: measurement.hour,
                    })
            }
        }
    }
}

/// Aggregation group identifier
///
/// Renders as `"13"` for an hour bucket and `"061:13"` for a day/hour
/// bucket; this is also the JSON map key form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKey {
    Hour(u32),
    DayHour { day_of_year: u32, hour: u32 },
}

impl BucketKey {
    pub fn hour(&self) -> u32 {
        match self {
            BucketKey::Hour(hour) | BucketKey::DayHour { hour, .. } => *hour,
        }
    }

    pub fn day_of_year(&self) -> Option<u32> {
        match self {
            BucketKey::Hour(_) => None,
            BucketKey::DayHour { day_of_year, .. } => Some(*day_of_year),
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Hour(hour) => write!(f, "{hour}"),
            BucketKey::DayHour { day_of_year, hour } => write!(f, "{day_of_year:03}:{hour:02}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid bucket key: {0}")]
pub struct ParseBucketKeyError(String);

impl FromStr for BucketKey {
    type Err = ParseBucketKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseBucketKeyError(s.to_string());
        let parse = |part: &str| part.parse::<u32>().map_err(|_| invalid());

        let key = match s.split_once(':') {
            None => BucketKey::Hour(parse(s)?),
            Some((day, hour)) => BucketKey::DayHour {
                day_of_year: parse(day)?,
                hour: parse(hour)?,
            },
        };

        let day_ok = key
            .day_of_year()
            .map_or(true, |d| (1..=MAX_DAY_OF_YEAR).contains(&d));
        if key.hour() >= HOURS_PER_DAY || !day_ok {
            return Err(invalid());
        }
        Ok(key)
    }
}

impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BucketKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
