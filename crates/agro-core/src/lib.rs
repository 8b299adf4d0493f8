#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/agroconnect/agro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the AgroConnect data layer.
//!
//! This crate provides the foundational abstractions shared by every provider:
//!
//! - [`DataSource`](source::DataSource) - Base trait for all upstream sources
//! - [`MarketSource`](source::MarketSource) - Commodity price observations
//! - [`WeatherSource`](source::WeatherSource) - Current weather and forecasts
//! - [`Clock`](clock::Clock) - Time source used for cache staleness
//! - [`ApiResponse`](response::ApiResponse) - Wire envelope for API clients

/// Time sources.
pub mod clock;
/// Error types for data operations.
pub mod error;
/// Success/error response envelope.
pub mod response;
/// Upstream source traits.
pub mod source;
/// Core data types (quotes, weather, schemes).
pub mod types;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AgroError, Result};
pub use response::ApiResponse;
pub use source::{DataSource, MarketSource, WeatherSource};
pub use types::{
    Advisory, AdvisoryKind, ForecastDay, ForecastReading, MarketQuote, MarketRecord, PriceUnit,
    QuoteSource, Scheme, SchemeFilters, Trend, WeatherAdvisoryReport, WeatherSnapshot,
    round_celsius,
};
