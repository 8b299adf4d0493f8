//! Weather provider: current conditions, daily forecast and farming advisories.

use std::sync::Arc;
use std::time::Duration;

use agro_cache::InMemoryCache;
use agro_core::{
    Advisory, AdvisoryKind, AgroError, ForecastDay, ForecastReading, Result,
    WeatherAdvisoryReport, WeatherSnapshot, WeatherSource,
};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use tracing::{instrument, warn};

/// How long current conditions and forecasts stay fresh.
pub const WEATHER_TTL: Duration = Duration::from_secs(10 * 60);

/// Maximum number of days in a reduced forecast.
pub const FORECAST_DAYS: usize = 5;

const HEAT_THRESHOLD_C: i32 = 35;
const COLD_THRESHOLD_C: i32 = 15;
const HUMIDITY_THRESHOLD: u8 = 80;
const WIND_THRESHOLD_MS: f64 = 10.0;
const RAINY_DAYS_THRESHOLD: usize = 3;

/// India Standard Time, +05:30.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

fn default_utc_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Serves weather through two retrieval caches, one per payload shape.
pub struct WeatherService {
    source: Arc<dyn WeatherSource>,
    current_cache: Arc<InMemoryCache<WeatherSnapshot>>,
    forecast_cache: Arc<InMemoryCache<Vec<ForecastDay>>>,
    ttl: Duration,
    utc_offset: FixedOffset,
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("source", &self.source.name())
            .field("ttl", &self.ttl)
            .field("utc_offset", &self.utc_offset)
            .finish_non_exhaustive()
    }
}

impl WeatherService {
    /// Create a service over `source` with the given caches.
    #[must_use]
    pub fn new(
        source: Arc<dyn WeatherSource>,
        current_cache: Arc<InMemoryCache<WeatherSnapshot>>,
        forecast_cache: Arc<InMemoryCache<Vec<ForecastDay>>>,
    ) -> Self {
        Self {
            source,
            current_cache,
            forecast_cache,
            ttl: WEATHER_TTL,
            utc_offset: default_utc_offset(),
        }
    }

    /// Override the freshness window.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the offset used to assign forecast readings to dates.
    #[must_use]
    pub const fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    /// Name of the upstream source.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Current conditions at `location`.
    ///
    /// # Errors
    /// Returns [`AgroError::Validation`] for an empty location and
    /// [`AgroError::UpstreamUnavailable`] when the source fails.
    #[instrument(skip(self))]
    pub async fn get_current(&self, location: &str) -> Result<WeatherSnapshot> {
        require_location(location)?;

        let key = format!("current|{location}");
        self.current_cache
            .get_or_fetch(&key, self.ttl, || async {
                self.source
                    .fetch_current(location)
                    .await
                    .map_err(|e| self.unavailable(e))
            })
            .await
    }

    /// Up to five days of forecast for `location`, one entry per calendar date.
    ///
    /// # Errors
    /// Returns [`AgroError::Validation`] for an empty location and
    /// [`AgroError::UpstreamUnavailable`] when the source fails.
    #[instrument(skip(self))]
    pub async fn get_forecast(&self, location: &str) -> Result<Vec<ForecastDay>> {
        require_location(location)?;

        let key = format!("forecast|{location}");
        self.forecast_cache
            .get_or_fetch(&key, self.ttl, || async {
                let series = self
                    .source
                    .fetch_forecast_series(location)
                    .await
                    .map_err(|e| self.unavailable(e))?;
                Ok(reduce_forecast(&series, self.utc_offset))
            })
            .await
    }

    /// Current conditions for `location` and the advisories they trigger.
    ///
    /// Current conditions and the forecast are fetched concurrently; the
    /// first failure aborts the report.
    ///
    /// # Errors
    /// Returns the first error from [`Self::get_current`] or [`Self::get_forecast`].
    #[instrument(skip(self))]
    pub async fn advisory(&self, location: &str) -> Result<WeatherAdvisoryReport> {
        let (current_weather, forecast) =
            tokio::try_join!(self.get_current(location), self.get_forecast(location))?;

        let advisories = generate_advisory(&current_weather, &forecast);
        Ok(WeatherAdvisoryReport {
            location: location.to_string(),
            current_weather,
            advisories,
        })
    }

    fn unavailable(&self, error: AgroError) -> AgroError {
        warn!(source = self.source.name(), error = %error, "Weather source failed");
        match error {
            AgroError::UpstreamUnavailable { .. } => error,
            other => AgroError::upstream(self.source.name(), other.to_string()),
        }
    }
}

fn require_location(location: &str) -> Result<()> {
    if location.trim().is_empty() {
        return Err(AgroError::Validation("location must not be empty".into()));
    }
    Ok(())
}

/// Keeps the first reading for each calendar date in `utc_offset`.
///
/// Dates appear in the order first seen; later readings on a date are
/// discarded, not averaged. At most [`FORECAST_DAYS`] entries are returned.
#[must_use]
pub fn reduce_forecast(readings: &[ForecastReading], utc_offset: FixedOffset) -> Vec<ForecastDay> {
    let mut days: Vec<ForecastDay> = Vec::with_capacity(FORECAST_DAYS);
    let mut seen: Vec<NaiveDate> = Vec::with_capacity(FORECAST_DAYS);

    for reading in readings {
        let date = reading.timestamp.with_timezone(&utc_offset).date_naive();
        if seen.contains(&date) {
            continue;
        }
        seen.push(date);
        days.push(ForecastDay::from_reading(date, reading));
        if days.len() == FORECAST_DAYS {
            break;
        }
    }

    days
}

/// Derives farming advisories from current conditions and the daily forecast.
///
/// Rules are evaluated in a fixed order: temperature, humidity, rain, wind.
#[must_use]
pub fn generate_advisory(current: &WeatherSnapshot, forecast: &[ForecastDay]) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    if current.temperature > HEAT_THRESHOLD_C {
        advisories.push(Advisory::new(
            AdvisoryKind::Warning,
            "High Temperature Alert",
            "Increase irrigation frequency. Protect crops from heat stress.",
            "Apply mulching and provide shade for sensitive crops",
        ));
    } else if current.temperature < COLD_THRESHOLD_C {
        advisories.push(Advisory::new(
            AdvisoryKind::Info,
            "Low Temperature",
            "Protect sensitive crops from cold. Frost possible.",
            "Cover crops at night if temperature drops below 10°C",
        ));
    }

    if current.humidity > HUMIDITY_THRESHOLD {
        advisories.push(Advisory::new(
            AdvisoryKind::Warning,
            "High Humidity",
            "Risk of fungal diseases. Avoid pesticide spraying.",
            "Monitor crops for fungal infections and ensure good ventilation",
        ));
    }

    let rainy_days = forecast.iter().filter(|day| day.rain_mm > 0.0).count();
    if rainy_days >= RAINY_DAYS_THRESHOLD {
        advisories.push(Advisory::new(
            AdvisoryKind::Info,
            "Rain Expected",
            format!("Rain predicted for {rainy_days} days. Postpone spraying."),
            "Delay pesticide application and check drainage systems",
        ));
    } else if rainy_days == 0 {
        advisories.push(Advisory::new(
            AdvisoryKind::Info,
            "Clear Weather Ahead",
            "Good conditions for spraying and field operations.",
            "Plan pesticide application and field maintenance activities",
        ));
    }

    if current.wind_speed > WIND_THRESHOLD_MS {
        advisories.push(Advisory::new(
            AdvisoryKind::Warning,
            "Strong Winds",
            "Avoid pesticide spraying. Support tall crops.",
            "Secure crop support structures and delay spray operations",
        ));
    }

    advisories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeWeatherSource, series, snapshot};
    use agro_core::ManualClock;
    use chrono::{DateTime, TimeDelta, TimeZone};

    fn june_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn days(rainy_days: u32) -> Vec<ForecastDay> {
        reduce_forecast(&series(june_first(), 5, rainy_days), utc())
    }

    fn titles(advisories: &[Advisory]) -> Vec<&str> {
        advisories.iter().map(|a| a.title.as_str()).collect()
    }

    fn service(source: Arc<FakeWeatherSource>) -> (WeatherService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let service = WeatherService::new(
            source,
            Arc::new(InMemoryCache::with_clock(clock.clone())),
            Arc::new(InMemoryCache::with_clock(clock.clone())),
        )
        .with_utc_offset(utc());
        (service, clock)
    }

    #[test]
    fn test_heat_and_clear_weather() {
        let advisories = generate_advisory(&snapshot(36, 50, 5.0), &days(0));
        assert_eq!(titles(&advisories), vec!["High Temperature Alert", "Clear Weather Ahead"]);
        assert_eq!(advisories[0].kind, AdvisoryKind::Warning);
        assert_eq!(advisories[1].kind, AdvisoryKind::Info);
    }

    #[test]
    fn test_every_rule_fires_in_order() {
        let advisories = generate_advisory(&snapshot(12, 85, 12.5), &days(3));
        assert_eq!(
            titles(&advisories),
            vec!["Low Temperature", "High Humidity", "Rain Expected", "Strong Winds"]
        );
        assert_eq!(advisories[2].message, "Rain predicted for 3 days. Postpone spraying.");
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        // 1-2 rainy days produce no rain advisory
        let advisories = generate_advisory(&snapshot(35, 80, 10.0), &days(1));
        assert!(advisories.is_empty());

        let advisories = generate_advisory(&snapshot(15, 60, 2.0), &days(2));
        assert!(advisories.is_empty());
    }

    #[test]
    fn test_empty_forecast_counts_as_clear() {
        let advisories = generate_advisory(&snapshot(25, 60, 2.0), &[]);
        assert_eq!(titles(&advisories), vec!["Clear Weather Ahead"]);
    }

    #[test]
    fn test_reduce_keeps_first_reading_per_date() {
        let reduced = reduce_forecast(&series(june_first(), 5, 0), utc());
        assert_eq!(reduced.len(), 5);
        for (day, expected) in reduced.iter().zip(0..) {
            assert_eq!(day.date, june_first().date_naive() + TimeDelta::days(expected));
            assert_eq!(day.temp, 10 + 8 * i32::try_from(expected).unwrap());
            assert_eq!(day.description, format!("reading {}", 8 * expected));
        }
    }

    #[test]
    fn test_reduce_uses_local_dates() {
        let ist = FixedOffset::east_opt(IST_OFFSET_SECS).unwrap();
        let reduced = reduce_forecast(&series(june_first(), 5, 0), ist);

        // 21:00 UTC is 02:30 the next day in IST, so it opens each later date.
        assert_eq!(reduced.len(), FORECAST_DAYS);
        assert_eq!(reduced[0].temp, 10);
        assert_eq!(reduced[1].temp, 17);
        assert_eq!(reduced[1].date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    }

    #[test]
    fn test_reduce_short_series() {
        let reduced = reduce_forecast(&series(june_first(), 2, 2), utc());
        assert_eq!(reduced.len(), 2);
        assert!(reduced.iter().all(|d| d.rain_mm > 0.0));
    }

    #[tokio::test]
    async fn test_current_cached_for_ten_minutes() {
        let source = Arc::new(FakeWeatherSource::new(Some(snapshot(30, 60, 3.0)), None));
        let (service, clock) = service(source.clone());

        service.get_current("Pune").await.unwrap();
        clock.advance(TimeDelta::seconds(599));
        service.get_current("Pune").await.unwrap();
        assert_eq!(source.current_calls(), 1);

        clock.advance(TimeDelta::seconds(1));
        service.get_current("Pune").await.unwrap();
        assert_eq!(source.current_calls(), 2);
    }

    #[tokio::test]
    async fn test_forecast_reduced_and_cached() {
        let source = Arc::new(FakeWeatherSource::new(None, Some(series(june_first(), 5, 0))));
        let (service, _) = service(source.clone());

        let first = service.get_forecast("Pune").await.unwrap();
        let second = service.get_forecast("Pune").await.unwrap();
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        assert_eq!(source.forecast_calls(), 1);
        assert_eq!(source.current_calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_upstream_unavailable_and_not_cached() {
        let source = Arc::new(FakeWeatherSource::default());
        let (service, _) = service(source.clone());

        for _ in 0..2 {
            let err = service.get_current("Pune").await.unwrap_err();
            assert!(matches!(
                &err,
                AgroError::UpstreamUnavailable { source_name, .. } if source_name == "FakeWeather"
            ));
            assert_eq!(err.status_code(), 502);
        }
        assert_eq!(source.current_calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_location_rejected() {
        let source = Arc::new(FakeWeatherSource::default());
        let (service, _) = service(source.clone());

        assert!(matches!(
            service.get_forecast(" ").await,
            Err(AgroError::Validation(_))
        ));
        assert_eq!(source.forecast_calls(), 0);
    }

    #[tokio::test]
    async fn test_advisory_report() {
        let source = Arc::new(FakeWeatherSource::new(
            Some(snapshot(36, 50, 5.0)),
            Some(series(june_first(), 5, 0)),
        ));
        let (service, _) = service(source);

        let report = service.advisory("Pune").await.unwrap();
        assert_eq!(report.location, "Pune");
        assert_eq!(report.current_weather.temperature, 36);
        assert_eq!(
            titles(&report.advisories),
            vec!["High Temperature Alert", "Clear Weather Ahead"]
        );
    }

    #[tokio::test]
    async fn test_advisory_fails_when_forecast_fails() {
        let source = Arc::new(FakeWeatherSource::new(Some(snapshot(36, 50, 5.0)), None));
        let (service, _) = service(source);

        let err = service.advisory("Pune").await.unwrap_err();
        assert!(matches!(err, AgroError::UpstreamUnavailable { .. }));
    }
}
