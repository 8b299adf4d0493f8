#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/agroconnect/agro/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! data.gov.in commodity price source.
//!
//! This crate implements [`MarketSource`] for the Open Government Data
//! platform's daily mandi price resource, which republishes AGMARKNET data.
//!
//! # Usage
//!
//! ```rust,ignore
//! use agro_datagov::DataGovClient;
//! use agro_core::MarketSource;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> agro_core::Result<()> {
//!     let client = DataGovClient::new("your_api_key", Duration::from_secs(5))?;
//!     let records = client.fetch_records("Onion", "Maharashtra").await?;
//!     println!("{} records", records.len());
//!     Ok(())
//! }
//! ```

use agro_core::{AgroError, DataSource, MarketRecord, MarketSource, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Base URL for the data.gov.in API.
pub const DATAGOV_BASE_URL: &str = "https://api.data.gov.in";

/// Resource id of the "current daily price of various commodities" dataset.
const PRICE_RESOURCE_ID: &str = "9ef84268-d588-465a-a308-a864a43d0070";

/// data.gov.in commodity price client.
#[derive(Clone)]
pub struct DataGovClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for DataGovClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataGovClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DataGovClient {
    /// Create a new client whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns [`AgroError::Config`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgroError::Config(format!("failed to build data.gov.in client: {e}")))?;
        Ok(Self::with_client(client, api_key))
    }

    /// Create a new client with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: DATAGOV_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (mirrors, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/resource/{PRICE_RESOURCE_ID}", self.base_url)
    }

    fn query(&self, crop: &str, state: &str) -> Vec<(&'static str, String)> {
        vec![
            ("api-key", self.api_key.clone()),
            ("format", "json".to_string()),
            ("filters[commodity]", crop.to_string()),
            ("filters[state]", state.to_string()),
        ]
    }
}

impl DataSource for DataGovClient {
    fn name(&self) -> &str {
        "AGMARKNET"
    }

    fn description(&self) -> &str {
        "data.gov.in - Daily mandi prices of agricultural commodities"
    }
}

#[async_trait]
impl MarketSource for DataGovClient {
    async fn fetch_records(&self, crop: &str, state: &str) -> Result<Vec<MarketRecord>> {
        debug!(crop, state, "data.gov.in price request");

        let response = self
            .client
            .get(self.url())
            .query(&self.query(crop, state))
            .send()
            .await
            .map_err(|e| AgroError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(500).collect();
            return Err(AgroError::Network(format!("HTTP {status}: {snippet}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AgroError::Network(e.to_string()))?;

        parse_records(&text)
    }
}

/// Parses a data.gov.in resource payload, keeping only records with a usable price.
///
/// # Errors
/// Returns [`AgroError::Parse`] if the payload is not a resource response.
pub fn parse_records(text: &str) -> Result<Vec<MarketRecord>> {
    let payload: DataGovResponse =
        serde_json::from_str(text).map_err(|e| AgroError::Parse(format!("data.gov.in: {e}")))?;

    Ok(payload
        .records
        .into_iter()
        .map(|r| MarketRecord {
            modal_price: r.modal_price,
            min_price: r.min_price,
            market: r.market.filter(|m| !m.trim().is_empty()),
        })
        .filter(|r| r.quoted_price().is_some())
        .collect())
}

// ============================================================================
// data.gov.in Response Types
// ============================================================================

/// Resource query response.
#[derive(Debug, Deserialize)]
struct DataGovResponse {
    #[serde(default)]
    records: Vec<DataGovRecord>,
}

/// A single mandi price row.
#[derive(Debug, Deserialize)]
struct DataGovRecord {
    #[serde(default, deserialize_with = "flexible_price")]
    modal_price: Option<f64>,
    #[serde(default, deserialize_with = "flexible_price")]
    min_price: Option<f64>,
    #[serde(default)]
    market: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// The API reports prices as strings; accept numbers as well.
fn flexible_price<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    }
    .filter(|p| p.is_finite()))
}
