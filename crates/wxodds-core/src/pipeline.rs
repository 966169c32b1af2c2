use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::prediction::{derive_all, PredictionResult};
use crate::rollups::aggregate;
use crate::types::{DaySpecifier, GeoPoint, Granularity, QueryDay, RawMeasurement, YearWindow};
use crate::{FetchError, PredictionError, ServiceResult};

/// Source of raw hourly series for one day across a window of years
///
/// Implementations must return either every year's records or an error;
/// a partial set of years is never a valid result.
#[async_trait::async_trait]
pub trait SeriesFetcher: Send + Sync {
    async fn fetch(
        &self,
        window: &YearWindow,
        day: QueryDay,
        point: GeoPoint,
    ) -> Result<Vec<RawMeasurement>, FetchError>;
}

/// Fetch, aggregate and derive for a single (day, lat, lon) query
#[derive(Clone)]
pub struct PredictionService {
    fetcher: Arc<dyn SeriesFetcher>,
    window: YearWindow,
    granularity: Granularity,
}

impl PredictionService {
    pub fn new(
        fetcher: Arc<dyn SeriesFetcher>,
        window: YearWindow,
        granularity: Granularity,
    ) -> Self {
        Self {
            fetcher,
            window,
            granularity,
        }
    }

    pub fn window(&self) -> YearWindow {
        self.window
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    #[instrument(skip(self))]
    pub async fn predict(
        &self,
        day: DaySpecifier,
        latitude: f64,
        longitude: f64,
    ) -> ServiceResult<PredictionResult> {
        let point = GeoPoint::new(latitude, longitude)?;
        let day = day.normalize()?;
        if !self.window.years().any(|y| day.in_year(y).is_some()) {
            return Err(PredictionError::InvalidInput(format!(
                "no year in {}..={} contains {:02}/{:02}",
                self.window.start(),
                self.window.end(),
                day.month(),
                day.day()
            )));
        }

        info!(
            day = %day,
            start_year = self.window.start(),
            end_year = self.window.end(),
            "Fetching historical series"
        );

        let series = self
            .fetcher
            .fetch(&self.window, day, point)
            .await
            .map_err(|e| {
                warn!(error = %e, "Historical fetch failed");
                e
            })?;

        let buckets = aggregate(&series, self.granularity);
        let result = derive_all(&buckets);

        info!(
            measurements = series.len(),
            buckets = result.len(),
            "Prediction complete"
        );
        Ok(result)
    }
}

impl fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictionService")
            .field("window", &self.window)
            .field("granularity", &self.granularity)
            .finish_non_exhaustive()
    }
}
