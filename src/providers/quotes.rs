use super::util::{RawTimestamp, fetch_json, normalize};
use crate::core::error::Result;
use serde::Deserialize;
use tracing::{debug, instrument};

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(alias = "rate", alias = "value")]
    price: f64,
    #[serde(default, alias = "timestamp", alias = "time")]
    updated: Option<RawTimestamp>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub timestamp: Option<String>,
}

/// Client for a single-value quote service: currency cross rates under
/// `/rate/{from}/{to}` and asset prices under `/price/{symbol}`.
pub struct QuoteProvider {
    base_url: String,
    retries: usize,
}

impl QuoteProvider {
    pub fn new(base_url: &str, retries: usize) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
        }
    }

    async fn fetch_quote(&self, url: &str) -> Result<Quote> {
        let data: QuoteResponse = fetch_json(url, self.retries).await?;
        debug!(price = data.price, "Received quote");
        Ok(Quote {
            price: data.price,
            timestamp: normalize(data.updated.as_ref()),
        })
    }

    /// Units of `to` per one unit of `from`.
    #[instrument(name = "RateFetch", skip(self))]
    pub async fn get_rate(&self, from: &str, to: &str) -> Result<Quote> {
        let url = format!("{}/rate/{}/{}", self.base_url, from, to);
        self.fetch_quote(&url).await
    }

    /// USD price of `symbol`.
    #[instrument(name = "PriceFetch", skip(self))]
    pub async fn get_price(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/price/{}", self.base_url, symbol);
        self.fetch_quote(&url).await
    }
}
