//! Paginated wallet view over the record store.
//!
//! Accumulates transaction pages into a growing, de-duplicated, newest-first
//! list with a per-day grouping for display, and applies balance side
//! effects for new transactions and top-ups. Page loads are guarded so
//! repeated triggers produce at most one in-flight store query.

use anyhow::{Result, bail};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use crate::store::{RecordStore, Transaction};

/// Reserved category for synthetic top-up transactions.
pub const TOP_UP_CATEGORY: &str = "Top up balance";

/// One calendar day of transactions, local time.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone)]
pub enum WalletEvent {
    Balance(Decimal),
    Transactions(Vec<Transaction>),
    Grouped(Vec<DayGroup>),
}

#[derive(Default)]
struct WalletState {
    balance: Decimal,
    transactions: Vec<Transaction>,
    grouped: Vec<DayGroup>,
    offset: usize,
    is_fetching: bool,
    all_loaded: bool,
    // Bumped by refresh() so pages issued before the reset are discarded.
    generation: u64,
}

pub struct WalletService {
    store: Arc<dyn RecordStore>,
    page_size: usize,
    state: Mutex<WalletState>,
    events: broadcast::Sender<WalletEvent>,
}

/// Partitions transactions into local-calendar-day buckets. Buckets come out
/// newest day first; within a day the input order is preserved.
pub fn group_by_day(transactions: &[Transaction]) -> Vec<DayGroup> {
    let mut buckets: BTreeMap<NaiveDate, Vec<Transaction>> = BTreeMap::new();
    for transaction in transactions {
        let day = transaction.date.with_timezone(&Local).date_naive();
        buckets.entry(day).or_default().push(transaction.clone());
    }
    buckets
        .into_iter()
        .rev()
        .map(|(day, transactions)| DayGroup { day, transactions })
        .collect()
}

impl WalletService {
    pub fn new(store: Arc<dyn RecordStore>, page_size: usize) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            store,
            page_size,
            state: Mutex::new(WalletState::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    pub async fn balance(&self) -> Decimal {
        self.state.lock().await.balance
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.transactions.clone()
    }

    pub async fn grouped_transactions(&self) -> Vec<DayGroup> {
        self.state.lock().await.grouped.clone()
    }

    pub async fn all_loaded(&self) -> bool {
        self.state.lock().await.all_loaded
    }

    /// Loads the next page from the store. Returns `Ok(true)` when a page
    /// was appended, `Ok(false)` when there was nothing to do: a fetch is
    /// already in flight, the history is exhausted, or the page raced a
    /// refresh. Store failures propagate without corrupting the offset.
    pub async fn load_next_page(&self) -> Result<bool> {
        let (offset, generation) = {
            let mut state = self.state.lock().await;
            if state.is_fetching || state.all_loaded {
                return Ok(false);
            }
            state.is_fetching = true;
            (state.offset, state.generation)
        };

        let page = self.store.transactions(self.page_size, offset).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            debug!("Discarding transaction page issued before refresh");
            return Ok(false);
        }
        state.is_fetching = false;
        let page = page?;
        if page.is_empty() {
            state.all_loaded = true;
            return Ok(false);
        }

        state.offset += page.len();
        state.transactions.extend(page);
        state.grouped = group_by_day(&state.transactions);
        self.notify_transactions(&state);
        Ok(true)
    }

    /// Writes a transaction, adjusts the balance by its signed amount and
    /// prepends the record to the in-memory view without re-querying.
    pub async fn add_transaction(
        &self,
        amount: Decimal,
        category: &str,
        date: DateTime<Utc>,
    ) -> Result<Transaction> {
        let transaction = self.store.insert_transaction(amount, category, date).await?;
        let balance = self.store.adjust_balance(amount).await?;

        let mut state = self.state.lock().await;
        state.balance = balance;
        state.transactions.insert(0, transaction.clone());
        // The new record shifts every store offset by one; keep future
        // pages aligned so nothing is duplicated.
        state.offset += 1;
        state.grouped = group_by_day(&state.transactions);
        let _ = self.events.send(WalletEvent::Balance(balance));
        self.notify_transactions(&state);
        debug!(id = transaction.id, %amount, category, "Added transaction");
        Ok(transaction)
    }

    /// Records a positive balance adjustment as a synthetic transaction
    /// dated now.
    pub async fn top_up(&self, amount: Decimal) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            bail!("Top up amount must be positive, got {amount}");
        }
        self.add_transaction(amount, TOP_UP_CATEGORY, Utc::now())
            .await
    }

    /// Resets pagination, re-reads the balance and loads the first page.
    pub async fn refresh(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.offset = 0;
            state.transactions.clear();
            state.grouped.clear();
            state.all_loaded = false;
            state.is_fetching = false;
        }

        let balance = self.store.balance().await?;
        {
            let mut state = self.state.lock().await;
            state.balance = balance;
        }
        let _ = self.events.send(WalletEvent::Balance(balance));

        self.load_next_page().await?;
        Ok(())
    }

    fn notify_transactions(&self, state: &WalletState) {
        let _ = self
            .events
            .send(WalletEvent::Transactions(state.transactions.clone()));
        let _ = self
            .events
            .send(WalletEvent::Grouped(state.grouped.clone()));
    }
}
