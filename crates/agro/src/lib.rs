#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/agroconnect/agro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cached market, weather and scheme providers for farmers.
//!
//! This crate re-exports the core types, the retrieval cache and the upstream
//! clients, and provides one provider per data domain:
//!
//! - [`MarketService`] - Commodity prices with an estimated-price fallback
//! - [`WeatherService`] - Current weather, daily forecast and advisories
//! - [`SchemeService`] - Filterable government scheme catalogue
//!
//! [`AgroServices`] builds all three from an [`AgroConfig`].

// Core types and traits
pub use agro_core::*;

// Cache and upstream clients
pub use agro_cache::InMemoryCache;
pub use agro_catalogue::SchemeCatalogue;
pub use agro_datagov::DataGovClient;
pub use agro_openweather::OpenWeatherClient;

/// Configuration loading.
pub mod config;
/// Market price provider.
pub mod market;
/// Government scheme provider.
pub mod schemes;
/// Weather provider.
pub mod weather;

mod services;

#[cfg(test)]
mod testing;

pub use config::AgroConfig;
pub use market::MarketService;
pub use schemes::SchemeService;
pub use services::AgroServices;
pub use weather::WeatherService;
