use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{RateCache, RecordStore, Transaction};

#[derive(Default)]
struct Inner {
    balance: Option<Decimal>,
    /// Kept sorted by date descending, newest insert first within a date.
    transactions: Vec<Transaction>,
    next_id: u64,
    cached_rate: Option<f64>,
}

/// In-memory record store with the same semantics as the fjall-backed one.
/// Used by tests and the ephemeral mode.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn balance(&self) -> Result<Decimal> {
        let mut inner = self.inner.lock().await;
        Ok(*inner.balance.get_or_insert(Decimal::ONE))
    }

    async fn set_balance(&self, amount: Decimal) -> Result<()> {
        self.inner.lock().await.balance = Some(amount);
        Ok(())
    }

    async fn adjust_balance(&self, delta: Decimal) -> Result<Decimal> {
        let mut inner = self.inner.lock().await;
        let updated = inner.balance.unwrap_or(Decimal::ONE) + delta;
        inner.balance = Some(updated);
        Ok(updated)
    }

    async fn insert_transaction(
        &self,
        amount: Decimal,
        category: &str,
        date: DateTime<Utc>,
    ) -> Result<Transaction> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let transaction = Transaction {
            id: inner.next_id,
            amount,
            category: category.to_string(),
            date,
        };
        let position = inner.transactions.partition_point(|t| t.date > date);
        inner.transactions.insert(position, transaction.clone());
        Ok(transaction)
    }

    async fn transactions(&self, limit: usize, offset: usize) -> Result<Vec<Transaction>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .transactions
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RateCache for MemoryStore {
    async fn load(&self) -> Option<f64> {
        self.inner.lock().await.cached_rate
    }

    async fn save(&self, rate: f64) {
        self.inner.lock().await.cached_rate = Some(rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn date(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    #[tokio::test]
    async fn test_balance_defaults_to_one() {
        let store = MemoryStore::new();
        assert_eq!(store.balance().await.unwrap(), Decimal::ONE);
    }

    #[tokio::test]
    async fn test_insert_keeps_descending_order() {
        let store = MemoryStore::new();
        store
            .insert_transaction("-0.1".parse().unwrap(), "old", date("2025-02-04 10:00:00"))
            .await
            .unwrap();
        store
            .insert_transaction("-0.2".parse().unwrap(), "new", date("2025-02-06 10:00:00"))
            .await
            .unwrap();
        store
            .insert_transaction("-0.3".parse().unwrap(), "mid", date("2025-02-05 10:00:00"))
            .await
            .unwrap();

        let all = store.transactions(10, 0).await.unwrap();
        let categories: Vec<&str> = all.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(categories, vec!["new", "mid", "old"]);

        let page = store.transactions(2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].category, "mid");
    }
}
