//! Government scheme provider.

use std::sync::Arc;
use std::time::Duration;

use agro_cache::InMemoryCache;
use agro_catalogue::SchemeCatalogue;
use agro_core::{AgroError, Result, Scheme, SchemeFilters};
use tracing::instrument;

/// How long a filtered scheme list stays fresh.
pub const SCHEMES_TTL: Duration = Duration::from_secs(60 * 60);

/// Farmer type that matches every scheme, and disables the filter when requested.
const ALL: &str = "all";

/// Returns the trimmed filter value, or `None` when it is absent or blank.
fn active(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Whether `scheme` satisfies every filter in `filters`.
///
/// - `crop` matches schemes covering `"all"` crops or listing a crop that
///   contains the filter, ignoring case.
/// - `farmer_type` matches schemes for `"all"` farmers or exactly that type,
///   ignoring case; a filter of `"all"` matches everything.
/// - `category` matches exactly, ignoring case.
#[must_use]
pub fn matches(scheme: &Scheme, filters: &SchemeFilters) -> bool {
    if let Some(crop) = active(filters.crop.as_ref()) {
        let crop = crop.to_lowercase();
        let covered = scheme
            .crops
            .iter()
            .any(|c| c.eq_ignore_ascii_case(ALL) || c.to_lowercase().contains(&crop));
        if !covered {
            return false;
        }
    }

    if let Some(farmer_type) = active(filters.farmer_type.as_ref()) {
        if !farmer_type.eq_ignore_ascii_case(ALL)
            && !scheme.farmer_type.eq_ignore_ascii_case(ALL)
            && !scheme.farmer_type.eq_ignore_ascii_case(farmer_type)
        {
            return false;
        }
    }

    if let Some(category) = active(filters.category.as_ref()) {
        if scheme.category.to_lowercase() != category.to_lowercase() {
            return false;
        }
    }

    true
}

/// Serves the scheme catalogue through the retrieval cache.
#[derive(Debug)]
pub struct SchemeService {
    catalogue: Arc<SchemeCatalogue>,
    cache: Arc<InMemoryCache<Vec<Scheme>>>,
    ttl: Duration,
}

impl SchemeService {
    /// Create a service over `catalogue`, storing filtered lists in `cache`.
    #[must_use]
    pub const fn new(
        catalogue: Arc<SchemeCatalogue>,
        cache: Arc<InMemoryCache<Vec<Scheme>>>,
    ) -> Self {
        Self {
            catalogue,
            cache,
            ttl: SCHEMES_TTL,
        }
    }

    /// Override the freshness window.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Schemes for `state` that satisfy `filters`, in catalogue order.
    ///
    /// States without an entry are served the default state's schemes.
    ///
    /// # Errors
    /// Returns [`AgroError::Other`] if the filters cannot be encoded into a cache key.
    #[instrument(skip(self))]
    pub async fn list_schemes(&self, state: &str, filters: &SchemeFilters) -> Result<Vec<Scheme>> {
        let encoded = serde_json::to_string(filters).map_err(|e| AgroError::Other(e.to_string()))?;
        let key = format!("schemes|{state}|{encoded}");

        self.cache
            .get_or_fetch(&key, self.ttl, || async {
                Ok(self
                    .catalogue
                    .schemes_for(state)
                    .iter()
                    .filter(|s| matches(s, filters))
                    .cloned()
                    .collect())
            })
            .await
    }

    /// The scheme with `id` in `state` (or the default state).
    ///
    /// # Errors
    /// Returns [`AgroError::NotFound`] if the resolved state has no such scheme.
    #[instrument(skip(self))]
    pub fn get_scheme(&self, id: &str, state: &str) -> Result<Scheme> {
        self.catalogue
            .find(id, state)
            .cloned()
            .ok_or_else(|| AgroError::not_found("scheme", id))
    }

    /// Distinct categories across every state, in first-seen order.
    #[must_use]
    pub fn list_categories(&self) -> Vec<String> {
        self.catalogue.categories()
    }
}
