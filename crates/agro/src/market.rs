//! Market price provider with estimated-price fallback.

use std::sync::Arc;
use std::time::Duration;

use agro_cache::InMemoryCache;
use agro_core::{
    AgroError, Clock, MarketQuote, MarketRecord, MarketSource, PriceUnit, QuoteSource, Result,
    Trend,
};
use futures::future::join_all;
use tracing::{debug, instrument, warn};

/// How long a quote stays fresh.
pub const MARKET_TTL: Duration = Duration::from_secs(5 * 60);

/// Note attached to every estimated quote.
pub const ESTIMATE_NOTE: &str = "Real-time data unavailable. Showing estimated prices.";

/// Maximum number of recommended crops.
const RECOMMENDATION_LIMIT: usize = 5;

/// Stable quotes must be priced above this to be recommended.
const STABLE_PRICE_FLOOR: f64 = 2000.0;

/// A static estimated price used when the upstream cannot answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedPrice {
    /// Canonical lowercase crop name.
    pub crop: &'static str,
    /// Estimated price per unit.
    pub price: f64,
    /// Unit the price is quoted in.
    pub unit: PriceUnit,
    /// Estimated direction of movement.
    pub trend: Trend,
}

impl EstimatedPrice {
    const fn new(crop: &'static str, price: f64, unit: PriceUnit, trend: Trend) -> Self {
        Self {
            crop,
            price,
            unit,
            trend,
        }
    }
}

/// Every crop the service can always answer for, in listing order.
pub const ESTIMATED_PRICES: [EstimatedPrice; 8] = [
    EstimatedPrice::new("onion", 25.0, PriceUnit::Kg, Trend::Up),
    EstimatedPrice::new("tomato", 30.0, PriceUnit::Kg, Trend::Down),
    EstimatedPrice::new("potato", 20.0, PriceUnit::Kg, Trend::Stable),
    EstimatedPrice::new("wheat", 2500.0, PriceUnit::Quintal, Trend::Up),
    EstimatedPrice::new("rice", 3000.0, PriceUnit::Quintal, Trend::Stable),
    EstimatedPrice::new("cotton", 7000.0, PriceUnit::Quintal, Trend::Up),
    EstimatedPrice::new("soybean", 4500.0, PriceUnit::Quintal, Trend::Down),
    EstimatedPrice::new("sugarcane", 300.0, PriceUnit::Quintal, Trend::Stable),
];

/// Looks up the estimated price for `crop`, ignoring case and surrounding whitespace.
#[must_use]
pub fn estimated_price(crop: &str) -> Option<&'static EstimatedPrice> {
    let crop = crop.trim();
    ESTIMATED_PRICES
        .iter()
        .find(|e| e.crop.eq_ignore_ascii_case(crop))
}

/// Keeps rising quotes and well-priced stable ones, highest price first.
///
/// Quotes are compared by raw price regardless of unit. Ties keep their input order.
#[must_use]
pub fn recommend(quotes: Vec<MarketQuote>) -> Vec<MarketQuote> {
    let mut candidates: Vec<MarketQuote> = quotes
        .into_iter()
        .filter(|q| match q.trend {
            Trend::Up => true,
            Trend::Stable => q.price > STABLE_PRICE_FLOOR,
            Trend::Down => false,
        })
        .collect();
    candidates.sort_by(|a, b| b.price.total_cmp(&a.price));
    candidates.truncate(RECOMMENDATION_LIMIT);
    candidates
}

/// Serves commodity quotes through the retrieval cache.
pub struct MarketService {
    source: Arc<dyn MarketSource>,
    cache: Arc<InMemoryCache<MarketQuote>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl std::fmt::Debug for MarketService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketService")
            .field("source", &self.source.name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl MarketService {
    /// Create a service over `source`, storing quotes in `cache`.
    ///
    /// `clock` stamps `last_updated`; pass the cache's clock so both agree.
    #[must_use]
    pub fn new(
        source: Arc<dyn MarketSource>,
        cache: Arc<InMemoryCache<MarketQuote>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
            ttl: MARKET_TTL,
        }
    }

    /// Override the freshness window.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Name of the upstream source.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Current quote for `crop` in `state`.
    ///
    /// Upstream failures and empty answers degrade to the estimated price
    /// table; the estimated quote is cached like a live one.
    ///
    /// # Errors
    /// Returns [`AgroError::Validation`] for an empty crop name, and
    /// [`AgroError::NotFound`] when the upstream has no price and the crop has
    /// no estimate.
    #[instrument(skip(self))]
    pub async fn get_price(&self, crop: &str, state: &str) -> Result<MarketQuote> {
        if crop.trim().is_empty() {
            return Err(AgroError::Validation("crop must not be empty".into()));
        }

        let key = format!("{crop}|{state}");
        self.cache
            .get_or_fetch(&key, self.ttl, || self.fetch_quote(crop, state))
            .await
    }

    /// Quotes for every crop in [`ESTIMATED_PRICES`], in that order.
    ///
    /// Lookups run concurrently; a crop whose lookup fails is left out.
    #[instrument(skip(self))]
    pub async fn get_all_prices(&self, state: &str) -> Vec<MarketQuote> {
        let lookups = ESTIMATED_PRICES.iter().map(|estimate| async move {
            (estimate.crop, self.get_price(estimate.crop, state).await)
        });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(crop, result)| match result {
                Ok(quote) => Some(quote),
                Err(e) => {
                    warn!(crop, error = %e, "Dropping crop from price list");
                    None
                }
            })
            .collect()
    }

    /// Up to five rising or well-priced stable crops, highest price first.
    #[instrument(skip(self))]
    pub async fn get_recommendations(&self, state: &str) -> Vec<MarketQuote> {
        recommend(self.get_all_prices(state).await)
    }

    async fn fetch_quote(&self, crop: &str, state: &str) -> Result<MarketQuote> {
        match self.source.fetch_records(crop, state).await {
            Ok(records) => {
                if let Some(quote) = self.live_quote(crop, state, records) {
                    return Ok(quote);
                }
                debug!(source = self.source.name(), "No usable records, using estimate");
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    "Market source failed, using estimate"
                );
            }
        }

        self.estimated_quote(crop, state)
            .ok_or_else(|| AgroError::not_found("crop", crop))
    }

    fn live_quote(&self, crop: &str, state: &str, records: Vec<MarketRecord>) -> Option<MarketQuote> {
        let record = records.into_iter().find(|r| r.quoted_price().is_some())?;
        let price = record.quoted_price()?;
        Some(MarketQuote {
            crop: crop.to_string(),
            state: state.to_string(),
            price,
            unit: PriceUnit::Quintal,
            trend: record.trend(),
            market: record.market,
            source: QuoteSource::ExternalApi,
            note: None,
            last_updated: self.clock.now(),
        })
    }

    fn estimated_quote(&self, crop: &str, state: &str) -> Option<MarketQuote> {
        let estimate = estimated_price(crop)?;
        Some(MarketQuote {
            crop: crop.to_string(),
            state: state.to_string(),
            price: estimate.price,
            unit: estimate.unit,
            trend: estimate.trend,
            market: None,
            source: QuoteSource::Estimated,
            note: Some(ESTIMATE_NOTE.to_string()),
            last_updated: self.clock.now(),
        })
    }
}
