pub mod analytics;
pub mod cli;
pub mod config;
pub mod log;
pub mod providers;
pub mod rate;
pub mod rate_provider;
pub mod store;
pub mod wallet;

use crate::analytics::{Analytics, MemoryAnalytics};
use crate::providers::coindesk::CoindeskProvider;
use crate::rate::RateService;
use crate::store::{RateCache, RecordStore, disk::DiskStore};
use crate::wallet::WalletService;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Dashboard {
        pages: usize,
    },
    Add {
        amount: Decimal,
        category: String,
        date: Option<DateTime<Utc>>,
    },
    TopUp {
        amount: Decimal,
    },
    Watch {
        interval: Option<Duration>,
    },
    Seed,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Wallet Tracker starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = Arc::new(DiskStore::open(&config.ledger_path()?)?);
    let analytics: Arc<dyn Analytics> = Arc::new(MemoryAnalytics::new());

    let provider = Arc::new(CoindeskProvider::new(
        &config.rate.base_url,
        Duration::from_secs(config.rate.request_timeout_secs),
    ));
    let rate_service = Arc::new(
        RateService::new(
            provider,
            Arc::clone(&store) as Arc<dyn RateCache>,
            Arc::clone(&analytics),
            Duration::from_secs(config.rate.update_interval_secs),
        )
        .await,
    );

    let wallet = WalletService::new(
        Arc::clone(&store) as Arc<dyn RecordStore>,
        config.wallet.page_size,
    );

    match command {
        AppCommand::Dashboard { pages } => {
            cli::dashboard::run(&wallet, &rate_service, pages).await
        }
        AppCommand::Add {
            amount,
            category,
            date,
        } => {
            let transaction = wallet
                .add_transaction(amount, &category, date.unwrap_or_else(Utc::now))
                .await?;
            println!(
                "Recorded {} BTC ({}) on {}",
                transaction.amount,
                transaction.category,
                transaction.date.with_timezone(&chrono::Local)
            );
            println!("New balance: {} BTC", wallet.balance().await);
            Ok(())
        }
        AppCommand::TopUp { amount } => {
            wallet.top_up(amount).await?;
            println!("Topped up {amount} BTC");
            println!("New balance: {} BTC", wallet.balance().await);
            Ok(())
        }
        AppCommand::Watch { interval } => {
            cli::watch::run(rate_service, analytics, interval).await
        }
        AppCommand::Seed => cli::seed::run(store.as_ref()).await,
    }
}
