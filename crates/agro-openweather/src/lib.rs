#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/agroconnect/agro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! OpenWeatherMap weather source.
//!
//! Implements [`WeatherSource`] on top of the free-tier current weather and
//! 5 day / 3 hour forecast endpoints.

use agro_core::{
    AgroError, DataSource, ForecastReading, Result, WeatherSnapshot, WeatherSource, round_celsius,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Base URL for the OpenWeatherMap 2.5 API.
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Number of 3-hourly entries requested from the forecast endpoint (5 days x 8).
pub const FORECAST_ENTRIES: usize = 40;

/// OpenWeatherMap client.
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenWeatherClient {
    /// Create a new client whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns [`AgroError::Config`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgroError::Config(format!("failed to build OpenWeather client: {e}")))?;
        Ok(Self::with_client(client, api_key))
    }

    /// Create a new client with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn query(&self, location: &str) -> Vec<(&'static str, String)> {
        vec![
            ("q", location.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
        ]
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!("OpenWeather request: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AgroError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OwmError>(&text)
                .map(|e| e.message)
                .unwrap_or_else(|_| text.chars().take(500).collect());
            return Err(AgroError::Network(format!("HTTP {status}: {message}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AgroError::Network(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| AgroError::Parse(format!("OpenWeather: {e}")))
    }
}

impl DataSource for OpenWeatherClient {
    fn name(&self) -> &str {
        "OpenWeather"
    }

    fn description(&self) -> &str {
        "OpenWeatherMap - Current weather and 5 day / 3 hour forecast"
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch_current(&self, location: &str) -> Result<WeatherSnapshot> {
        let current: OwmCurrent = self.get("weather", &self.query(location)).await?;
        Ok(current.into_snapshot(Utc::now()))
    }

    async fn fetch_forecast_series(&self, location: &str) -> Result<Vec<ForecastReading>> {
        let mut query = self.query(location);
        query.push(("cnt", FORECAST_ENTRIES.to_string()));
        let forecast: OwmForecast = self.get("forecast", &query).await?;
        forecast.into_readings()
    }
}

/// Parses a `weather` endpoint payload.
///
/// # Errors
/// Returns [`AgroError::Parse`] if the payload does not match the endpoint schema.
pub fn parse_current(text: &str, fetched_at: DateTime<Utc>) -> Result<WeatherSnapshot> {
    let current: OwmCurrent =
        serde_json::from_str(text).map_err(|e| AgroError::Parse(format!("OpenWeather: {e}")))?;
    Ok(current.into_snapshot(fetched_at))
}

/// Parses a `forecast` endpoint payload.
///
/// # Errors
/// Returns [`AgroError::Parse`] if the payload does not match the endpoint
/// schema or carries an out-of-range timestamp.
pub fn parse_forecast(text: &str) -> Result<Vec<ForecastReading>> {
    let forecast: OwmForecast =
        serde_json::from_str(text).map_err(|e| AgroError::Parse(format!("OpenWeather: {e}")))?;
    forecast.into_readings()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn humidity_percent(raw: f64) -> u8 {
    raw.round().clamp(0.0, 100.0) as u8
}

// ============================================================================
// OpenWeather API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OwmError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmRain {
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

/// `weather` endpoint response.
#[derive(Debug, Deserialize)]
struct OwmCurrent {
    #[serde(default)]
    name: String,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: OwmWind,
}

impl OwmCurrent {
    fn into_snapshot(self, fetched_at: DateTime<Utc>) -> WeatherSnapshot {
        let condition = self.weather.into_iter().next();
        WeatherSnapshot {
            location: self.name,
            temperature: round_celsius(self.main.temp),
            feels_like: round_celsius(self.main.feels_like.unwrap_or(self.main.temp)),
            humidity: humidity_percent(self.main.humidity),
            description: condition
                .as_ref()
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            icon: condition.and_then(|c| c.icon),
            wind_speed: self.wind.speed,
            pressure: self.main.pressure,
            last_updated: fetched_at,
        }
    }
}

/// One `list` entry of the forecast response.
#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    wind: OwmWind,
    #[serde(default)]
    rain: Option<OwmRain>,
}

/// `forecast` endpoint response.
#[derive(Debug, Deserialize)]
struct OwmForecast {
    #[serde(default)]
    list: Vec<OwmForecastItem>,
}

impl OwmForecast {
    fn into_readings(self) -> Result<Vec<ForecastReading>> {
        self.list
            .into_iter()
            .map(|item| {
                let timestamp = DateTime::from_timestamp(item.dt, 0).ok_or_else(|| {
                    AgroError::Parse(format!("OpenWeather: invalid timestamp {}", item.dt))
                })?;
                let condition = item.weather.into_iter().next();
                Ok(ForecastReading {
                    timestamp,
                    temp: item.main.temp,
                    temp_min: item.main.temp_min.unwrap_or(item.main.temp),
                    temp_max: item.main.temp_max.unwrap_or(item.main.temp),
                    description: condition
                        .as_ref()
                        .map(|c| c.description.clone())
                        .unwrap_or_default(),
                    icon: condition.and_then(|c| c.icon),
                    humidity: humidity_percent(item.main.humidity),
                    wind_speed: item.wind.speed,
                    rain_mm: item.rain.map_or(0.0, |r| r.three_hours.max(0.0)),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"{
        "name": "Pune",
        "main": {"temp": 35.6, "feels_like": 38.2, "humidity": 45, "pressure": 1008},
        "weather": [{"main": "Clear", "description": "clear sky", "icon": "01d"}],
        "wind": {"speed": 4.1, "deg": 270}
    }"#;

    const FORECAST: &str = r#"{
        "cod": "200",
        "cnt": 2,
        "list": [
            {"dt": 1717200000,
             "main": {"temp": 29.4, "temp_min": 28.1, "temp_max": 30.2, "humidity": 66},
             "weather": [{"description": "light rain", "icon": "10d"}],
             "wind": {"speed": 5.5},
             "rain": {"3h": 1.25}},
            {"dt": 1717210800,
             "main": {"temp": 27.0, "temp_min": 26.5, "temp_max": 27.3, "humidity": 72},
             "weather": [{"description": "overcast clouds", "icon": "04n"}],
             "wind": {"speed": 4.0}}
        ]
    }"#;

    #[test]
    fn test_parse_current() {
        let fetched_at = DateTime::from_timestamp(1_717_200_000, 0).unwrap();
        let snapshot = parse_current(CURRENT, fetched_at).unwrap();
        assert_eq!(snapshot.location, "Pune");
        assert_eq!(snapshot.temperature, 36);
        assert_eq!(snapshot.feels_like, 38);
        assert_eq!(snapshot.humidity, 45);
        assert_eq!(snapshot.description, "clear sky");
        assert_eq!(snapshot.icon.as_deref(), Some("01d"));
        assert_eq!(snapshot.wind_speed, 4.1);
        assert_eq!(snapshot.pressure, 1008.0);
        assert_eq!(snapshot.last_updated, fetched_at);
    }

    #[test]
    fn test_parse_forecast() {
        let readings = parse_forecast(FORECAST).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp.timestamp(), 1_717_200_000);
        assert_eq!(readings[0].rain_mm, 1.25);
        assert_eq!(readings[0].description, "light rain");
        // No rain block means a dry window.
        assert_eq!(readings[1].rain_mm, 0.0);
        assert_eq!(readings[1].humidity, 72);
    }

    #[test]
    fn test_parse_current_requires_main() {
        let result = parse_current(r#"{"name": "Pune"}"#, Utc::now());
        assert!(matches!(result, Err(AgroError::Parse(_))));
    }

    #[test]
    fn test_query_uses_metric_units() {
        let client = OpenWeatherClient::new("k", Duration::from_secs(5)).unwrap();
        let query = client.query("Pune");
        assert!(query.contains(&("q", "Pune".to_string())));
        assert!(query.contains(&("units", "metric".to_string())));
        assert!(query.contains(&("appid", "k".to_string())));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = OpenWeatherClient::new("secret_key_12345", Duration::from_secs(5)).unwrap();
        let debug_str = format!("{client:?}");
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_source_metadata() {
        let client = OpenWeatherClient::new("k", Duration::from_secs(5)).unwrap();
        assert_eq!(client.name(), "OpenWeather");
        assert!(client.description().contains("forecast"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = OpenWeatherClient::new("k", Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let result = client.fetch_current("Pune").await;
        assert!(matches!(result, Err(AgroError::Network(_))));
    }
}
