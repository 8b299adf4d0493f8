//! Configuration loader: config.toml with environment overrides.

use agro_core::{AgroError, Result};
use agro_datagov::DATAGOV_BASE_URL;
use agro_openweather::OPENWEATHER_BASE_URL;
use chrono::FixedOffset;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Top-level configuration for [`AgroServices`](crate::AgroServices).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgroConfig {
    /// HTTP settings shared by every upstream client.
    pub http: HttpConfig,
    /// Market price provider settings.
    pub market: MarketConfig,
    /// Weather provider settings.
    pub weather: WeatherConfig,
    /// Scheme catalogue settings.
    pub schemes: SchemesConfig,
}

/// Upstream HTTP settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Market price provider settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// data.gov.in API key.
    pub api_key: String,
    /// data.gov.in base URL.
    pub base_url: String,
    /// How long a quote stays fresh, in seconds.
    pub ttl_secs: u64,
}

/// Weather provider settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key.
    pub api_key: String,
    /// OpenWeatherMap base URL.
    pub base_url: String,
    /// How long current conditions and forecasts stay fresh, in seconds.
    pub ttl_secs: u64,
    /// UTC offset, in minutes, used to assign forecast readings to calendar dates.
    pub forecast_utc_offset_minutes: i32,
}

/// Scheme catalogue settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemesConfig {
    /// How long a filtered scheme list stays fresh, in seconds.
    pub ttl_secs: u64,
    /// Catalogue file replacing the embedded one.
    pub catalogue_path: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 5,
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DATAGOV_BASE_URL.to_string(),
            ttl_secs: 5 * 60,
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
            ttl_secs: 10 * 60,
            // India Standard Time
            forecast_utc_offset_minutes: 330,
        }
    }
}

impl Default for SchemesConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60,
            catalogue_path: None,
        }
    }
}

impl fmt::Debug for MarketConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("ttl_secs", &self.ttl_secs)
            .field(
                "forecast_utc_offset_minutes",
                &self.forecast_utc_offset_minutes,
            )
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "[REDACTED]" }
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AgroError::Config(format!("{env_name} must be an integer > 0"))),
    }
}

fn parse_i32(raw: &str, env_name: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AgroError::Config(format!("{env_name} must be an integer")))
}

impl AgroConfig {
    /// Loads `path` (when given) and applies environment overrides.
    ///
    /// # Errors
    /// Returns [`AgroError::Config`] if the file cannot be read or parsed, an
    /// override is malformed, or the merged configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| AgroError::Config(format!("{}: {e}", path.display())))?;
                info!(path = %path.display(), "Loaded configuration file");
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        config.warn_missing_keys();
        Ok(config)
    }

    /// Parses a TOML document; absent fields keep their defaults.
    ///
    /// # Errors
    /// Returns [`AgroError::Config`] if the document is not valid TOML of the expected shape.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AgroError::Config(e.to_string()))
    }

    /// Applies overrides read through `lookup` (normally the process environment).
    ///
    /// # Errors
    /// Returns [`AgroError::Config`] if a numeric override does not parse.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("GOV_API_KEY") {
            self.market.api_key = key.trim().to_string();
        }
        if let Some(url) = lookup("AGRO_DATAGOV_BASE_URL") {
            self.market.base_url = url.trim().to_string();
        }
        if let Some(key) = lookup("OPENWEATHER_API_KEY") {
            self.weather.api_key = key.trim().to_string();
        }
        if let Some(url) = lookup("AGRO_OPENWEATHER_BASE_URL") {
            self.weather.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("AGRO_REQUEST_TIMEOUT_SECS") {
            self.http.request_timeout_secs = parse_positive_u64(&raw, "AGRO_REQUEST_TIMEOUT_SECS")?;
        }
        if let Some(raw) = lookup("AGRO_FORECAST_UTC_OFFSET_MINUTES") {
            self.weather.forecast_utc_offset_minutes =
                parse_i32(&raw, "AGRO_FORECAST_UTC_OFFSET_MINUTES")?;
        }
        if let Some(path) = lookup("AGRO_CATALOGUE_PATH") {
            self.schemes.catalogue_path = Some(PathBuf::from(path.trim()));
        }
        Ok(())
    }

    /// Checks every setting and reports all problems at once.
    ///
    /// # Errors
    /// Returns [`AgroError::Config`] listing each invalid setting.
    pub fn validate(&self) -> Result<()> {
        let mut issues: Vec<String> = Vec::new();

        if self.http.request_timeout_secs == 0 {
            issues.push("http.request_timeout_secs must be > 0".into());
        }
        if self.market.ttl_secs == 0 {
            issues.push("market.ttl_secs must be > 0".into());
        }
        if self.weather.ttl_secs == 0 {
            issues.push("weather.ttl_secs must be > 0".into());
        }
        if self.schemes.ttl_secs == 0 {
            issues.push("schemes.ttl_secs must be > 0".into());
        }
        if !self.market.base_url.starts_with("http") {
            issues.push("market.base_url must be an http(s) URL".into());
        }
        if !self.weather.base_url.starts_with("http") {
            issues.push("weather.base_url must be an http(s) URL".into());
        }
        if self.forecast_utc_offset().is_none() {
            issues.push("weather.forecast_utc_offset_minutes must be within -720..=840".into());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(AgroError::Config(issues.join("; ")))
        }
    }

    fn warn_missing_keys(&self) {
        if self.market.api_key.is_empty() {
            warn!("GOV_API_KEY not set, market prices will fall back to estimates");
        }
        if self.weather.api_key.is_empty() {
            warn!("OPENWEATHER_API_KEY not set, weather requests will fail");
        }
    }

    /// Per-request upstream timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }

    /// Offset used to assign forecast readings to calendar dates, if in range.
    #[must_use]
    pub fn forecast_utc_offset(&self) -> Option<FixedOffset> {
        let minutes = self.weather.forecast_utc_offset_minutes;
        if (-720..=840).contains(&minutes) {
            FixedOffset::east_opt(minutes * 60)
        } else {
            None
        }
    }
}
