use crate::store::RecordStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;

const CATEGORIES: [&str; 8] = [
    "Food",
    "Entertainment",
    "Transport",
    "Groceries",
    "Taxi",
    "Electronics",
    "Restaurant",
    "Other",
];
const DAYS_IN_PAST: usize = 7;
const TRANSACTIONS_PER_DAY: usize = 10;

/// Populates an empty ledger with a week of demo spends.
pub async fn run(store: &dyn RecordStore) -> Result<()> {
    if !store.transactions(1, 0).await?.is_empty() {
        anyhow::bail!("Ledger already contains transactions, refusing to seed");
    }

    for day in 0..DAYS_IN_PAST {
        for i in 0..TRANSACTIONS_PER_DAY {
            let index = day * TRANSACTIONS_PER_DAY + i;
            let category = CATEGORIES[index % CATEGORIES.len()];
            // Spends between -0.01 and -0.50 BTC.
            let amount = -Decimal::new((index as i64 % 50) + 1, 2);
            let date = Utc::now() - Duration::days(day as i64) - Duration::hours((i % 12) as i64);
            store.insert_transaction(amount, category, date).await?;
        }
    }

    let seeded = DAYS_IN_PAST * TRANSACTIONS_PER_DAY;
    info!("Seeded {seeded} demo transactions");
    println!("Seeded {seeded} demo transactions over the past {DAYS_IN_PAST} days");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_seed_populates_empty_ledger() {
        let store = MemoryStore::new();
        run(&store).await.unwrap();

        let all = store.transactions(1000, 0).await.unwrap();
        assert_eq!(all.len(), DAYS_IN_PAST * TRANSACTIONS_PER_DAY);
        assert!(all.iter().all(|t| t.amount < Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_seed_refuses_nonempty_ledger() {
        let store = MemoryStore::new();
        store
            .insert_transaction("-0.1".parse().unwrap(), "Taxi", Utc::now())
            .await
            .unwrap();

        let result = run(&store).await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("refusing to seed")
        );
    }
}
