use super::ui;
use crate::analytics::Analytics;
use crate::rate::RateService;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Runs the rate poller in the foreground, printing every update until
/// Ctrl-C, then a summary of the tracked outcomes.
pub async fn run(
    rate_service: Arc<RateService>,
    analytics: Arc<dyn Analytics>,
    interval: Option<Duration>,
) -> Result<()> {
    if let Some(interval) = interval {
        rate_service.update_fetch_interval(interval);
    }

    let mut updates = rate_service.subscribe();
    let handle = rate_service.start();
    println!(
        "{}",
        ui::style_text("Watching bitcoin rate, Ctrl-C to stop", ui::StyleType::Subtle)
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => match update {
                Ok(rate) => {
                    let now = chrono::Local::now().format("%H:%M:%S");
                    let value = format!("{rate:.2} USD");
                    println!("{now}  1 BTC = {}", ui::style_text(&value, ui::StyleType::TotalValue));
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    }
    handle.abort();

    let updates = analytics.events(Some("rate_update"), None, None).len();
    let errors = analytics.events(Some("rate_update_error"), None, None).len();
    println!("\n{updates} rate updates, {errors} fetch errors");
    Ok(())
}
