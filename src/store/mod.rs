//! Persistent record store for the wallet ledger.
//!
//! Two record kinds live here: the singleton balance and the append-only
//! transaction log, queried in pages ordered by date descending. The store
//! also carries the key-value slot that keeps the last fetched bitcoin rate
//! across restarts.

pub mod disk;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single ledger entry. Negative amounts are spends, positive are top-ups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub amount: Decimal,
    pub category: String,
    pub date: DateTime<Utc>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current balance. The singleton record is created lazily with a
    /// 1.0 BTC default the first time it is read.
    async fn balance(&self) -> Result<Decimal>;

    async fn set_balance(&self, amount: Decimal) -> Result<()>;

    /// Applies a signed delta to the balance as one serialized
    /// read-modify-write and returns the new balance. Concurrent
    /// adjustments never lose an update.
    async fn adjust_balance(&self, delta: Decimal) -> Result<Decimal>;

    /// Appends a transaction, assigning its id.
    async fn insert_transaction(
        &self,
        amount: Decimal,
        category: &str,
        date: DateTime<Utc>,
    ) -> Result<Transaction>;

    /// Returns `limit` transactions starting at `offset`, ordered by date
    /// descending (ties broken by newest insert first).
    async fn transactions(&self, limit: usize, offset: usize) -> Result<Vec<Transaction>>;
}

/// Key-value slot holding the last known bitcoin rate for offline mode.
/// Save failures are logged and swallowed: losing the cached rate only
/// degrades the next offline fallback.
#[async_trait]
pub trait RateCache: Send + Sync {
    async fn load(&self) -> Option<f64>;
    async fn save(&self, rate: f64);
}
