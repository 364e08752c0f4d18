use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::rate_provider::RateProvider;

// CoindeskProvider implementation for RateProvider
pub struct CoindeskProvider {
    base_url: String,
    request_timeout: Duration,
}

impl CoindeskProvider {
    pub fn new(base_url: &str, request_timeout: Duration) -> Self {
        CoindeskProvider {
            base_url: base_url.to_string(),
            request_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentPriceResponse {
    bpi: Bpi,
}

#[derive(Debug, Deserialize)]
struct Bpi {
    #[serde(rename = "USD")]
    usd: UsdQuote,
}

#[derive(Debug, Deserialize)]
struct UsdQuote {
    rate_float: f64,
}

#[async_trait]
impl RateProvider for CoindeskProvider {
    #[instrument(name = "CoindeskRateFetch", skip(self))]
    async fn fetch_rate(&self) -> Result<f64> {
        let url = format!("{}/v1/bpi/currentprice.json", self.base_url);
        debug!("Requesting bitcoin rate from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("btcbook/1.0")
            .timeout(self.request_timeout)
            .build()?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for URL: {}", response.status(), url));
        }

        let text = response.text().await?;

        let data: CurrentPriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse bitcoin rate response: {}", e))?;

        Ok(data.bpi.usd.rate_float)
    }
}
