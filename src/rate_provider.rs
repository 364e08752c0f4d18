//! Remote exchange-rate abstraction

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches the current BTC/USD exchange rate.
    async fn fetch_rate(&self) -> Result<f64>;
}
