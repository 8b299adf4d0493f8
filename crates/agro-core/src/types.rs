//! Core data types served by the providers.
//!
//! This module defines the entity shapes that cross the provider boundary:
//!
//! - [`MarketQuote`] - Commodity price for a crop in a state
//! - [`MarketRecord`] - A single upstream market observation
//! - [`WeatherSnapshot`] - Current conditions at a location
//! - [`ForecastReading`] / [`ForecastDay`] - Raw 3-hourly and reduced daily forecasts
//! - [`Advisory`] / [`WeatherAdvisoryReport`] - Rule-derived farming advice
//! - [`Scheme`] / [`SchemeFilters`] - Government scheme reference data

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit a commodity price is quoted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    /// Price per kilogram.
    Kg,
    /// Price per quintal (100 kg).
    Quintal,
}

/// Direction of a commodity price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Price moving up.
    Up,
    /// Price moving down.
    Down,
    /// No clear movement.
    Stable,
}

impl Trend {
    /// Derives a trend by comparing the modal price of a market to its minimum.
    #[must_use]
    pub fn from_prices(modal: f64, min: f64) -> Self {
        if modal > min {
            Self::Up
        } else if modal < min {
            Self::Down
        } else {
            Self::Stable
        }
    }
}

/// Where a market quote came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteSource {
    /// Live data from the government open-data API.
    #[serde(rename = "AGMARKNET")]
    ExternalApi,
    /// Substituted from the static estimated-price table.
    Estimated,
}

impl fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternalApi => write!(f, "AGMARKNET"),
            Self::Estimated => write!(f, "Estimated"),
        }
    }
}

/// Commodity price for a crop in a state.
///
/// A quote with [`QuoteSource::Estimated`] always carries a `note` and its
/// price comes from the static fallback table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    /// Crop name as requested.
    pub crop: String,
    /// State the quote applies to.
    pub state: String,
    /// Price in `unit`.
    pub price: f64,
    /// Unit the price is quoted in.
    pub unit: PriceUnit,
    /// Price direction.
    pub trend: Trend,
    /// Market (mandi) name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    /// Origin of the price.
    pub source: QuoteSource,
    /// Explanation shown when the price is an estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the quote was produced.
    pub last_updated: DateTime<Utc>,
}

/// A single commodity observation reported by the upstream market API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    /// Most frequent transaction price.
    pub modal_price: Option<f64>,
    /// Lowest transaction price.
    pub min_price: Option<f64>,
    /// Market (mandi) name.
    pub market: Option<String>,
}

impl MarketRecord {
    /// The price to quote: modal price, or the minimum when no modal price was reported.
    #[must_use]
    pub fn quoted_price(&self) -> Option<f64> {
        self.modal_price.or(self.min_price)
    }

    /// Trend implied by this record; `Stable` unless both prices are present.
    #[must_use]
    pub fn trend(&self) -> Trend {
        match (self.modal_price, self.min_price) {
            (Some(modal), Some(min)) => Trend::from_prices(modal, min),
            _ => Trend::Stable,
        }
    }
}

/// Current weather conditions at a location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Location name as resolved by the upstream.
    pub location: String,
    /// Temperature in °C, rounded.
    pub temperature: i32,
    /// Apparent temperature in °C, rounded.
    pub feels_like: i32,
    /// Relative humidity, 0-100.
    pub humidity: u8,
    /// Human readable conditions.
    pub description: String,
    /// Upstream icon code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Atmospheric pressure in hPa.
    pub pressure: f64,
    /// When the snapshot was fetched.
    pub last_updated: DateTime<Utc>,
}

/// One raw 3-hourly forecast entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReading {
    /// Start of the 3-hour window.
    pub timestamp: DateTime<Utc>,
    /// Temperature in °C.
    pub temp: f64,
    /// Minimum temperature in °C.
    pub temp_min: f64,
    /// Maximum temperature in °C.
    pub temp_max: f64,
    /// Human readable conditions.
    pub description: String,
    /// Upstream icon code.
    pub icon: Option<String>,
    /// Relative humidity, 0-100.
    pub humidity: u8,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Rain volume for the window in mm.
    pub rain_mm: f64,
}

/// Forecast for one calendar date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    /// Calendar date.
    pub date: NaiveDate,
    /// Temperature in °C.
    pub temp: i32,
    /// Minimum temperature in °C.
    pub temp_min: i32,
    /// Maximum temperature in °C.
    pub temp_max: i32,
    /// Human readable conditions.
    pub description: String,
    /// Upstream icon code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Relative humidity, 0-100.
    pub humidity: u8,
    /// Wind speed in m/s.
    pub wind_speed: f64,
    /// Rain in mm, never negative.
    pub rain_mm: f64,
}

impl ForecastDay {
    /// Builds the daily entry for `date` from a single reading.
    #[must_use]
    pub fn from_reading(date: NaiveDate, reading: &ForecastReading) -> Self {
        Self {
            date,
            temp: round_celsius(reading.temp),
            temp_min: round_celsius(reading.temp_min),
            temp_max: round_celsius(reading.temp_max),
            description: reading.description.clone(),
            icon: reading.icon.clone(),
            humidity: reading.humidity,
            wind_speed: reading.wind_speed,
            rain_mm: reading.rain_mm.max(0.0),
        }
    }
}

/// Rounds a temperature to the nearest whole degree.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_celsius(value: f64) -> i32 {
    value.round() as i32
}

/// Severity of an advisory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryKind {
    /// Conditions that can harm crops.
    Warning,
    /// Planning information.
    Info,
}

/// An actionable recommendation derived from weather readings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    /// Severity.
    #[serde(rename = "type")]
    pub kind: AdvisoryKind,
    /// Short headline.
    pub title: String,
    /// What is happening.
    pub message: String,
    /// What the farmer should do.
    pub action: String,
}

impl Advisory {
    /// Creates a new advisory.
    #[must_use]
    pub fn new(
        kind: AdvisoryKind,
        title: impl Into<String>,
        message: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            action: action.into(),
        }
    }
}

/// Current weather plus the advisories derived for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherAdvisoryReport {
    /// Location as requested.
    pub location: String,
    /// Current conditions used for the advisories.
    pub current_weather: WeatherSnapshot,
    /// Advisories in rule order.
    pub advisories: Vec<Advisory>,
}

/// A government scheme available to farmers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheme {
    /// Identifier, unique within a state.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the scheme does.
    pub description: String,
    /// What the farmer receives.
    pub benefits: String,
    /// Who can apply.
    pub eligibility: String,
    /// Crops covered; `"all"` covers every crop.
    pub crops: Vec<String>,
    /// Farmer category (`all`, `organic`, `women`, ...).
    pub farmer_type: String,
    /// Application deadline.
    pub deadline: String,
    /// Where to apply.
    pub apply_link: String,
    /// Scheme category.
    pub category: String,
}

/// Optional conjunctive filters for listing schemes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeFilters {
    /// Crop substring to match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    /// Farmer category to match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_type: Option<String>,
    /// Exact category to match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl SchemeFilters {
    /// Creates an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to schemes covering `crop`.
    #[must_use]
    pub fn with_crop(mut self, crop: impl Into<String>) -> Self {
        self.crop = Some(crop.into());
        self
    }

    /// Restricts results to schemes for `farmer_type`.
    #[must_use]
    pub fn with_farmer_type(mut self, farmer_type: impl Into<String>) -> Self {
        self.farmer_type = Some(farmer_type.into());
        self
    }

    /// Restricts results to schemes in `category`.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_from_prices() {
        assert_eq!(Trend::from_prices(2200.0, 2000.0), Trend::Up);
        assert_eq!(Trend::from_prices(1800.0, 2000.0), Trend::Down);
        assert_eq!(Trend::from_prices(2000.0, 2000.0), Trend::Stable);
    }

    #[test]
    fn test_record_price_falls_back_to_min() {
        let record = MarketRecord {
            modal_price: None,
            min_price: Some(1500.0),
            market: None,
        };
        assert_eq!(record.quoted_price(), Some(1500.0));
        assert_eq!(record.trend(), Trend::Stable);
    }

    #[test]
    fn test_forecast_day_rounds_and_clamps() {
        let reading = ForecastReading {
            timestamp: Utc::now(),
            temp: 27.6,
            temp_min: 24.4,
            temp_max: 29.5,
            description: "light rain".to_string(),
            icon: Some("10d".to_string()),
            humidity: 70,
            wind_speed: 3.2,
            rain_mm: -1.0,
        };
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let day = ForecastDay::from_reading(date, &reading);
        assert_eq!(day.temp, 28);
        assert_eq!(day.temp_min, 24);
        assert_eq!(day.temp_max, 30);
        assert_eq!(day.rain_mm, 0.0);
    }

    #[test]
    fn test_quote_wire_shape() {
        let quote = MarketQuote {
            crop: "onion".to_string(),
            state: "maharashtra".to_string(),
            price: 25.0,
            unit: PriceUnit::Kg,
            trend: Trend::Up,
            market: None,
            source: QuoteSource::Estimated,
            note: Some("estimate".to_string()),
            last_updated: Utc::now(),
        };
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["unit"], "kg");
        assert_eq!(json["trend"], "up");
        assert_eq!(json["source"], "Estimated");
        assert!(json.get("market").is_none());
        assert!(json.get("lastUpdated").is_some());
    }

    #[test]
    fn test_advisory_serializes_type_field() {
        let advisory = Advisory::new(AdvisoryKind::Warning, "t", "m", "a");
        let json = serde_json::to_value(&advisory).unwrap();
        assert_eq!(json["type"], "warning");
    }

    #[test]
    fn test_filters_builder_skips_empty_fields() {
        let filters = SchemeFilters::new().with_crop("wheat");
        assert_eq!(serde_json::to_string(&filters).unwrap(), r#"{"crop":"wheat"}"#);
    }
}
