//! NASA POWER hourly point client

use std::time::Duration;

use chrono::NaiveDate;
use futures_util::{stream, StreamExt, TryStreamExt};
use reqwest::Client;
use tracing::{debug, warn};
use wxodds_core::{FetchError, GeoPoint, QueryDay, RawMeasurement, SeriesFetcher, YearWindow};

use crate::envelope::{parse_envelope, PRECIPITATION, TEMPERATURE, WIND_SPEED};

pub const DEFAULT_BASE_URL: &str = "https://power.larc.nasa.gov/api/temporal/hourly/point";

/// Connection settings for the POWER API
#[derive(Debug, Clone)]
pub struct PowerSettings {
    pub base_url: String,
    pub community: String,
    pub timeout: Duration,
    /// Upper bound on simultaneous per-year requests
    pub max_concurrency: usize,
}

impl Default for PowerSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            community: "re".to_string(),
            timeout: Duration::from_secs(30),
            max_concurrency: 8,
        }
    }
}

/// Fetches one request per historical year and gathers them all
pub struct PowerClient {
    client: Client,
    settings: PowerSettings,
}

impl PowerClient {
    pub fn new(settings: PowerSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("wxodds/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &PowerSettings {
        &self.settings
    }

    fn query_params(&self, date: NaiveDate, point: GeoPoint) -> Vec<(&'static str, String)> {
        let day = date.format("%Y%m%d").to_string();
        vec![
            ("start", day.clone()),
            ("end", day),
            ("latitude", point.latitude().to_string()),
            ("longitude", point.longitude().to_string()),
            ("community", self.settings.community.clone()),
            (
                "parameters",
                format!("{TEMPERATURE},{PRECIPITATION},{WIND_SPEED}"),
            ),
            ("format", "JSON".to_string()),
            ("units", "metric".to_string()),
        ]
    }

    async fn fetch_day(
        &self,
        date: NaiveDate,
        point: GeoPoint,
    ) -> Result<Vec<RawMeasurement>, FetchError> {
        let url = self.settings.base_url.as_str();
        debug!(%date, "Requesting POWER hourly series");

        let resp = self
            .client
            .get(url)
            .query(&self.query_params(date, point))
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("{url}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!(%date, status, "POWER request rejected");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
                body: body.chars().take(500).collect(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("{url}: {e}")))?;
        let series = parse_envelope(&body)?;

        debug!(%date, records = series.len(), "POWER series decoded");
        Ok(series)
    }
}

#[async_trait::async_trait]
impl SeriesFetcher for PowerClient {
    async fn fetch(
        &self,
        window: &YearWindow,
        day: QueryDay,
        point: GeoPoint,
    ) -> Result<Vec<RawMeasurement>, FetchError> {
        // Feb 29 only exists in leap years
        let dates: Vec<NaiveDate> = window.years().filter_map(|y| day.in_year(y)).collect();

        let batches: Vec<Vec<RawMeasurement>> = stream::iter(dates)
            .map(|date| self.fetch_day(date, point))
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}
