//! Provider wiring: one explicitly owned cache per provider, one shared clock.

use std::sync::Arc;
use std::time::Duration;

use agro_cache::InMemoryCache;
use agro_catalogue::SchemeCatalogue;
use agro_core::{AgroError, Clock, MarketSource, Result, SystemClock, WeatherSource};
use agro_datagov::DataGovClient;
use agro_openweather::OpenWeatherClient;
use tracing::{debug, info};

use crate::config::AgroConfig;
use crate::market::MarketService;
use crate::schemes::SchemeService;
use crate::weather::WeatherService;

/// The three providers, built from one configuration.
///
/// # Example
///
/// ```rust,ignore
/// use agro::{AgroConfig, AgroServices};
///
/// let services = AgroServices::from_config(&AgroConfig::load(None)?)?;
/// let report = services.weather().advisory("Pune").await?;
/// ```
#[derive(Debug)]
pub struct AgroServices {
    market: MarketService,
    weather: WeatherService,
    schemes: SchemeService,
}

impl AgroServices {
    /// Builds the HTTP clients, loads the catalogue and wires every provider.
    ///
    /// # Errors
    /// Returns [`AgroError::Config`] if a client cannot be built and
    /// [`AgroError::Catalogue`] if the catalogue is malformed.
    pub fn from_config(config: &AgroConfig) -> Result<Self> {
        let timeout = config.request_timeout();

        let market_source = DataGovClient::new(config.market.api_key.clone(), timeout)?
            .with_base_url(config.market.base_url.clone());
        let weather_source = OpenWeatherClient::new(config.weather.api_key.clone(), timeout)?
            .with_base_url(config.weather.base_url.clone());

        let catalogue = match &config.schemes.catalogue_path {
            Some(path) => SchemeCatalogue::from_path(path)?,
            None => SchemeCatalogue::embedded()?,
        };

        let services = Self::with_sources(
            Arc::new(market_source),
            Arc::new(weather_source),
            Arc::new(catalogue),
            Arc::new(SystemClock),
            config,
        )?;
        info!(
            market = services.market.source_name(),
            weather = services.weather.source_name(),
            "Providers ready"
        );
        Ok(services)
    }

    /// Wires providers over caller-supplied sources and clock.
    ///
    /// # Errors
    /// Returns [`AgroError::Config`] if the configured forecast offset is out of range.
    pub fn with_sources(
        market_source: Arc<dyn MarketSource>,
        weather_source: Arc<dyn WeatherSource>,
        catalogue: Arc<SchemeCatalogue>,
        clock: Arc<dyn Clock>,
        config: &AgroConfig,
    ) -> Result<Self> {
        let utc_offset = config.forecast_utc_offset().ok_or_else(|| {
            AgroError::Config("weather.forecast_utc_offset_minutes out of range".into())
        })?;

        debug!(
            market_source = market_source.name(),
            weather_source = weather_source.name(),
            "Wiring providers"
        );

        let market = MarketService::new(
            market_source,
            Arc::new(InMemoryCache::with_clock(clock.clone())),
            clock.clone(),
        )
        .with_ttl(Duration::from_secs(config.market.ttl_secs));

        let weather = WeatherService::new(
            weather_source,
            Arc::new(InMemoryCache::with_clock(clock.clone())),
            Arc::new(InMemoryCache::with_clock(clock.clone())),
        )
        .with_ttl(Duration::from_secs(config.weather.ttl_secs))
        .with_utc_offset(utc_offset);

        let schemes = SchemeService::new(catalogue, Arc::new(InMemoryCache::with_clock(clock)))
            .with_ttl(Duration::from_secs(config.schemes.ttl_secs));

        Ok(Self {
            market,
            weather,
            schemes,
        })
    }

    /// Market price provider.
    #[must_use]
    pub const fn market(&self) -> &MarketService {
        &self.market
    }

    /// Weather provider.
    #[must_use]
    pub const fn weather(&self) -> &WeatherService {
        &self.weather
    }

    /// Scheme catalogue provider.
    #[must_use]
    pub const fn schemes(&self) -> &SchemeService {
        &self.schemes
    }
}
