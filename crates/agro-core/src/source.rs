//! Upstream source traits.
//!
//! This module defines the seams between providers and the third-party APIs
//! they front:
//!
//! - [`DataSource`] - Base trait for all upstream sources
//! - [`MarketSource`] - Commodity price observations
//! - [`WeatherSource`] - Current conditions and 3-hourly forecasts

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{ForecastReading, MarketRecord, WeatherSnapshot},
};

/// Base trait for all upstream sources.
pub trait DataSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "OpenWeather").
    fn name(&self) -> &str;

    /// Returns a description of this source.
    fn description(&self) -> &str;
}

/// Source of commodity price observations.
#[async_trait]
pub trait MarketSource: DataSource {
    /// Fetches the market records reported for `crop` in `state`.
    ///
    /// An empty vector means the upstream answered but had no matching
    /// records; callers treat that the same as an unavailable upstream.
    async fn fetch_records(&self, crop: &str, state: &str) -> Result<Vec<MarketRecord>>;
}

/// Source of weather observations.
#[async_trait]
pub trait WeatherSource: DataSource {
    /// Fetches current conditions for `location`.
    async fn fetch_current(&self, location: &str) -> Result<WeatherSnapshot>;

    /// Fetches the raw 3-hourly forecast series for `location`, oldest first.
    async fn fetch_forecast_series(&self, location: &str) -> Result<Vec<ForecastReading>>;
}
