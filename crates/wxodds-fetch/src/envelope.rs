//! Decoding of the POWER hourly point JSON envelope

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use wxodds_core::{FetchError, RawMeasurement, MISSING_VALUE};

/// Air temperature at 2 meters
pub const TEMPERATURE: &str = "T2M";

/// Bias-corrected precipitation
pub const PRECIPITATION: &str = "PRECTOTCORR";

/// Wind speed at 2 meters
pub const WIND_SPEED: &str = "WS2M";

const CHANNELS: [&str; 3] = [TEMPERATURE, PRECIPITATION, WIND_SPEED];

#[derive(Debug, Deserialize)]
struct PowerResponse {
    #[serde(default)]
    parameters: Option<Value>,
    #[serde(default)]
    properties: Option<PowerProperties>,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    #[serde(default)]
    parameter: Option<HashMap<String, BTreeMap<String, Value>>>,
}

/// Parse a response body into measurements
///
/// Keys that are not 10-digit `YYYYMMDDHH` timestamps are skipped. A
/// timestamp missing from one channel is recorded as missing for that
/// channel only.
pub fn parse_envelope(body: &[u8]) -> Result<Vec<RawMeasurement>, FetchError> {
    let response: PowerResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if response.parameters.is_none() {
        return Err(FetchError::MissingEnvelope("parameters"));
    }
    let channels = response
        .properties
        .and_then(|p| p.parameter)
        .ok_or(FetchError::MissingEnvelope("properties.parameter"))?;

    let mut rows: BTreeMap<&str, [f64; 3]> = BTreeMap::new();
    for (slot, name) in CHANNELS.into_iter().enumerate() {
        let series = channels
            .get(name)
            .ok_or(FetchError::MissingEnvelope(name))?;
        for (key, value) in series {
            if !is_timestamp_key(key) {
                continue;
            }
            let row = rows.entry(key.as_str()).or_insert([MISSING_VALUE; 3]);
            row[slot] = value.as_f64().unwrap_or(MISSING_VALUE);
        }
    }

    Ok(rows
        .into_iter()
        .map(|(key, [temperature, precipitation, wind_speed])| {
            let (year, month, day, hour) = split_timestamp(key);
            RawMeasurement {
                year,
                month,
                day,
                hour,
                temperature,
                precipitation,
                wind_speed,
            }
        })
        .collect())
}

fn is_timestamp_key(key: &str) -> bool {
    key.len() == 10 && key.bytes().all(|b| b.is_ascii_digit())
}

/// Split a key already checked by `is_timestamp_key`
fn split_timestamp(key: &str) -> (i32, u32, u32, u32) {
    let num = |range: std::ops::Range<usize>| key[range].parse::<u32>().unwrap_or_default();
    (num(0..4) as i32, num(4..6), num(6..8), num(8..10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_missing_envelope() {
        let err = parse_envelope(b"{}").unwrap_err();
        assert!(matches!(err, FetchError::MissingEnvelope("parameters")));
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = parse_envelope(b"<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_missing_properties_is_rejected() {
        let body = br#"{"parameters": {"T2M": {}}}"#;
        let err = parse_envelope(body).unwrap_err();
        assert!(matches!(
            err,
            FetchError::MissingEnvelope("properties.parameter")
        ));
    }

    #[test]
    fn test_missing_channel_is_rejected() {
        let body = br#"{
            "parameters": {},
            "properties": {"parameter": {"T2M": {}, "WS2M": {}}}
        }"#;
        let err = parse_envelope(body).unwrap_err();
        assert!(matches!(err, FetchError::MissingEnvelope(PRECIPITATION)));
    }

    #[test]
    fn test_parses_channels_and_skips_metadata_keys() {
        let body = br#"{
            "type": "Feature",
            "parameters": {"T2M": {"units": "C"}},
            "properties": {"parameter": {
                "T2M": {"2021070100": 18.5, "2021070113": -999, "units": "C"},
                "PRECTOTCORR": {"2021070100": 0.0, "2021070113": 2.25},
                "WS2M": {"2021070100": 3.1, "2021070113": 11.0}
            }}
        }"#;

        let series = parse_envelope(body).unwrap();
        assert_eq!(series.len(), 2);

        let first = series[0];
        assert_eq!((first.year, first.month, first.day, first.hour), (2021, 7, 1, 0));
        assert_eq!(first.temperature, 18.5);
        assert_eq!(first.wind_speed, 3.1);

        let second = series[1];
        assert_eq!(second.hour, 13);
        assert_eq!(second.temperature, MISSING_VALUE);
        assert_eq!(second.precipitation, 2.25);
    }

    #[test]
    fn test_timestamp_absent_from_a_channel_is_missing_there() {
        let body = br#"{
            "parameters": {},
            "properties": {"parameter": {
                "T2M": {"2020022905": 1.0},
                "PRECTOTCORR": {},
                "WS2M": {"2020022905": null}
            }}
        }"#;

        let series = parse_envelope(body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].temperature, 1.0);
        assert_eq!(series[0].precipitation, MISSING_VALUE);
        assert_eq!(series[0].wind_speed, MISSING_VALUE);
    }
}
