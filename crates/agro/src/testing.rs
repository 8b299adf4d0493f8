//! In-process upstream fakes with call counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use agro_core::{
    AgroError, DataSource, ForecastReading, MarketRecord, MarketSource, Result, WeatherSnapshot,
    WeatherSource,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Default)]
pub(crate) struct FakeMarketSource {
    records: HashMap<String, Vec<MarketRecord>>,
    unreachable: bool,
    calls: AtomicUsize,
}

impl FakeMarketSource {
    pub(crate) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub(crate) fn with_records(mut self, crop: &str, records: Vec<MarketRecord>) -> Self {
        self.records.insert(crop.to_string(), records);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataSource for FakeMarketSource {
    fn name(&self) -> &str {
        "FakeMarket"
    }

    fn description(&self) -> &str {
        "In-memory market records"
    }
}

#[async_trait]
impl MarketSource for FakeMarketSource {
    async fn fetch_records(&self, crop: &str, _state: &str) -> Result<Vec<MarketRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(AgroError::Network("connection refused".into()));
        }
        Ok(self.records.get(crop).cloned().unwrap_or_default())
    }
}

pub(crate) fn record(modal: Option<f64>, min: Option<f64>, market: Option<&str>) -> MarketRecord {
    MarketRecord {
        modal_price: modal,
        min_price: min,
        market: market.map(str::to_string),
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeWeatherSource {
    current: Option<WeatherSnapshot>,
    series: Option<Vec<ForecastReading>>,
    current_calls: AtomicUsize,
    forecast_calls: AtomicUsize,
}

impl FakeWeatherSource {
    /// `None` makes the corresponding fetch fail.
    pub(crate) fn new(
        current: Option<WeatherSnapshot>,
        series: Option<Vec<ForecastReading>>,
    ) -> Self {
        Self {
            current,
            series,
            ..Self::default()
        }
    }

    pub(crate) fn current_calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn forecast_calls(&self) -> usize {
        self.forecast_calls.load(Ordering::SeqCst)
    }
}

impl DataSource for FakeWeatherSource {
    fn name(&self) -> &str {
        "FakeWeather"
    }

    fn description(&self) -> &str {
        "In-memory weather readings"
    }
}

#[async_trait]
impl WeatherSource for FakeWeatherSource {
    async fn fetch_current(&self, _location: &str) -> Result<WeatherSnapshot> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        self.current
            .clone()
            .ok_or_else(|| AgroError::Network("HTTP 503".into()))
    }

    async fn fetch_forecast_series(&self, _location: &str) -> Result<Vec<ForecastReading>> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        self.series
            .clone()
            .ok_or_else(|| AgroError::Network("HTTP 503".into()))
    }
}

pub(crate) fn snapshot(temperature: i32, humidity: u8, wind_speed: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        location: "Pune".into(),
        temperature,
        feels_like: temperature,
        humidity,
        description: "clear sky".into(),
        icon: Some("01d".into()),
        wind_speed,
        pressure: 1012.0,
        last_updated: DateTime::UNIX_EPOCH,
    }
}

/// A 3-hourly series of `8 * days` readings starting at `start`.
///
/// Reading `i` has temperature `10 + i` °C. Readings on the first
/// `rainy_days` days (counted in UTC) report 1.5 mm of rain.
pub(crate) fn series(start: DateTime<Utc>, days: u32, rainy_days: u32) -> Vec<ForecastReading> {
    (0..days * 8)
        .map(|i| {
            let temp = 10.0 + f64::from(i);
            ForecastReading {
                timestamp: start + TimeDelta::hours(3 * i64::from(i)),
                temp,
                temp_min: temp - 1.0,
                temp_max: temp + 1.0,
                description: format!("reading {i}"),
                icon: None,
                humidity: 60,
                wind_speed: 3.0,
                rain_mm: if i / 8 < rainy_days { 1.5 } else { 0.0 },
            }
        })
        .collect()
}
