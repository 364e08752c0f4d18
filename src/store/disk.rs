use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use rust_decimal::Decimal;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

use super::{RateCache, RecordStore, Transaction};

const BALANCE_KEY: &str = "balance";
const NEXT_ID_KEY: &str = "next_transaction_id";
const CACHED_RATE_KEY: &str = "CachedBitcoinRate";

/// Initial balance written the first time the ledger is read.
const INITIAL_BALANCE: Decimal = Decimal::ONE;

/// Fjall-backed record store.
///
/// Transactions live in their own partition under a key that inverts the
/// timestamp and id, so a plain forward scan yields date-descending order.
/// The singleton balance, the id counter and the cached rate share the
/// `settings` partition. All writes go through one async mutex.
pub struct DiskStore {
    keyspace: Keyspace,
    transactions: PartitionHandle,
    settings: PartitionHandle,
    write_lock: Mutex<()>,
}

/// Maps (date, id) to a key whose ascending byte order is date-descending,
/// newest insert first within one millisecond.
fn transaction_key(date: &DateTime<Utc>, id: u64) -> [u8; 16] {
    let inverted_ts = (i64::MAX as i128 - date.timestamp_millis() as i128) as u64;
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&inverted_ts.to_be_bytes());
    key[8..].copy_from_slice(&(u64::MAX - id).to_be_bytes());
    key
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create ledger directory: {}", path.display()))?;

        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open ledger at {}", path.display()))?;
        let transactions =
            keyspace.open_partition("transactions", PartitionCreateOptions::default())?;
        let settings = keyspace.open_partition("settings", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            transactions,
            settings,
            write_lock: Mutex::new(()),
        })
    }

    fn read_balance(&self) -> Result<Option<Decimal>> {
        match self.settings.get(BALANCE_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn write_balance(&self, amount: Decimal) -> Result<()> {
        self.settings
            .insert(BALANCE_KEY, serde_json::to_vec(&amount)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn next_transaction_id(&self) -> Result<u64> {
        let id = match self.settings.get(NEXT_ID_KEY)? {
            Some(raw) => serde_json::from_slice(&raw)?,
            None => 1,
        };
        self.settings
            .insert(NEXT_ID_KEY, serde_json::to_vec(&(id + 1))?)?;
        Ok(id)
    }
}

#[async_trait]
impl RecordStore for DiskStore {
    async fn balance(&self) -> Result<Decimal> {
        let _guard = self.write_lock.lock().await;
        match self.read_balance()? {
            Some(amount) => Ok(amount),
            None => {
                // First run: create the singleton record.
                debug!("Initializing balance to {INITIAL_BALANCE} BTC");
                self.write_balance(INITIAL_BALANCE)?;
                Ok(INITIAL_BALANCE)
            }
        }
    }

    async fn set_balance(&self, amount: Decimal) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_balance(amount)
    }

    async fn adjust_balance(&self, delta: Decimal) -> Result<Decimal> {
        let _guard = self.write_lock.lock().await;
        let current = self.read_balance()?.unwrap_or(INITIAL_BALANCE);
        let updated = current + delta;
        self.write_balance(updated)?;
        Ok(updated)
    }

    async fn insert_transaction(
        &self,
        amount: Decimal,
        category: &str,
        date: DateTime<Utc>,
    ) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        let id = self.next_transaction_id()?;
        let transaction = Transaction {
            id,
            amount,
            category: category.to_string(),
            date,
        };
        self.transactions.insert(
            transaction_key(&date, id),
            serde_json::to_vec(&transaction)?,
        )?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(id, %amount, category, "Inserted transaction");
        Ok(transaction)
    }

    async fn transactions(&self, limit: usize, offset: usize) -> Result<Vec<Transaction>> {
        let mut page = Vec::with_capacity(limit);
        for item in self.transactions.iter().skip(offset).take(limit) {
            let (_key, value) = item?;
            page.push(serde_json::from_slice(&value)?);
        }
        Ok(page)
    }
}

#[async_trait]
impl RateCache for DiskStore {
    async fn load(&self) -> Option<f64> {
        match self.settings.get(CACHED_RATE_KEY) {
            Ok(Some(raw)) => serde_json::from_slice(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                debug!("Cached rate read error: {e}");
                None
            }
        }
    }

    async fn save(&self, rate: f64) {
        let res: Result<()> = (|| {
            self.settings
                .insert(CACHED_RATE_KEY, serde_json::to_vec(&rate)?)?;
            self.keyspace.persist(PersistMode::SyncAll)?;
            Ok(())
        })();
        if let Err(e) = res {
            debug!("Cached rate write error: {e}");
        }
    }
}
