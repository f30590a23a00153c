// src/loader.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, info};

use crate::error::CalculationError;
use crate::models::{HistoricalPriceResponse, PricePoint, PriceQuery};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of historical prices for a single ticker.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    /// Returns the observations for `query`, sorted by ascending date.
    async fn fetch(&self, query: &PriceQuery) -> Result<Vec<PricePoint>, CalculationError>;
}

// Client for the `/v1/pricing/historical/{currency}/{ticker}/` endpoint
pub struct HistoricalPriceClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HistoricalPriceClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HistoricalPriceClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Ticker and currency are pushed as escaped path segments, so a `/` or `?`
    /// in either can never change which resource is requested.
    pub fn endpoint(&self, query: &PriceQuery) -> Result<Url, CalculationError> {
        let invalid_base = |reason: String| CalculationError::UpstreamRequest {
            ticker: query.ticker.clone(),
            reason: format!("invalid base url {}: {}", self.base_url, reason),
        };

        let mut url = Url::parse(&self.base_url).map_err(|err| invalid_base(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid_base("cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "pricing",
                "historical",
                query.quote_currency.as_str(),
                query.ticker.as_str(),
                "",
            ]);
        Ok(url)
    }
}

#[async_trait]
impl PriceFetcher for HistoricalPriceClient {
    async fn fetch(&self, query: &PriceQuery) -> Result<Vec<PricePoint>, CalculationError> {
        let upstream = |reason: String| CalculationError::UpstreamRequest {
            ticker: query.ticker.clone(),
            reason,
        };

        let from = query.start_date.format(DATE_FORMAT).to_string();
        let to = query.end_date.format(DATE_FORMAT).to_string();
        info!(ticker = %query.ticker, %from, %to, "fetching price history");

        let params = [
            ("key", self.api_key.as_str()),
            ("from", from.as_str()),
            ("to", to.as_str()),
        ];
        // The url carries the key, so it is stripped from every error
        let response = self
            .client
            .get(self.endpoint(query)?)
            .query(&params)
            .send()
            .await
            .map_err(|err| upstream(err.without_url().to_string()))?;

        let status = response.status();
        debug!(ticker = %query.ticker, %status, "price history response");
        if !status.is_success() {
            return Err(upstream(format!("status_code: {}", status.as_u16())));
        }

        let body: HistoricalPriceResponse = response
            .json()
            .await
            .map_err(|err| {
                upstream(format!("malformed response body: {}", err.without_url()))
            })?;

        if body.error {
            let message = body
                .error_message
                .unwrap_or_else(|| "API reported an error".to_string());
            return Err(upstream(message));
        }

        Ok(body.into_price_points(&query.ticker))
    }
}
