//! Bitcoin rate cache and poller.
//!
//! Fetches the BTC/USD rate on a timer, keeps the last known value for
//! offline mode and broadcasts updates to subscribers. Fetch failures fall
//! back to the cached value when one exists; every outcome is recorded with
//! the analytics sink. Errors never propagate to callers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::analytics::Analytics;
use crate::rate_provider::RateProvider;
use crate::store::RateCache;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(300);

pub struct RateService {
    provider: Arc<dyn RateProvider>,
    cache: Arc<dyn RateCache>,
    analytics: Arc<dyn Analytics>,
    cached: Mutex<Option<f64>>,
    updates: broadcast::Sender<f64>,
    interval: watch::Sender<Duration>,
}

impl RateService {
    /// Creates the service, seeding the in-memory rate from the persisted
    /// slot so the first offline fallback works right after a restart.
    pub async fn new(
        provider: Arc<dyn RateProvider>,
        cache: Arc<dyn RateCache>,
        analytics: Arc<dyn Analytics>,
        update_interval: Duration,
    ) -> Self {
        let cached = cache.load().await;
        if let Some(rate) = cached {
            debug!("Seeded bitcoin rate from cache: {rate}");
        }
        let (updates, _) = broadcast::channel(16);
        let (interval, _) = watch::channel(update_interval);

        Self {
            provider,
            cache,
            analytics,
            cached: Mutex::new(cached),
            updates,
            interval,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<f64> {
        self.updates.subscribe()
    }

    pub async fn cached_rate(&self) -> Option<f64> {
        *self.cached.lock().await
    }

    /// Replaces the polling period. The pending timer is cancelled and a new
    /// one installed; the cached value is untouched.
    pub fn update_fetch_interval(&self, interval: Duration) {
        self.interval.send_replace(interval);
    }

    /// Spawns the polling task: one fetch immediately, then one per interval.
    /// An interval change interrupts the pending sleep, which triggers the
    /// fetch implied by rescheduling.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut interval_rx = self.interval.subscribe();
        tokio::spawn(async move {
            loop {
                service.fetch().await;
                let period = *interval_rx.borrow_and_update();
                tokio::select! {
                    _ = tokio::time::sleep(period) => {}
                    changed = interval_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// One fetch cycle. Public so the CLI and tests can trigger a fetch
    /// without waiting for the timer.
    pub async fn fetch(&self) {
        match self.provider.fetch_rate().await {
            Ok(rate) if rate == 0.0 => {
                // Zero is the decoder's "no data" sentinel, not a valid rate.
                debug!("Ignoring zero bitcoin rate");
            }
            Ok(rate) => {
                *self.cached.lock().await = Some(rate);
                self.cache.save(rate).await;
                let _ = self.updates.send(rate);
                self.analytics.track_event(
                    "rate_update",
                    HashMap::from([("rate".to_string(), format!("{rate:.2}"))]),
                );
            }
            Err(e) => {
                warn!("Bitcoin rate fetch failed: {e}");
                let cached = *self.cached.lock().await;
                match cached {
                    // Stale data beats no data: deliver the last known rate.
                    Some(rate) => {
                        let _ = self.updates.send(rate);
                        self.analytics.track_event(
                            "rate_update_error",
                            HashMap::from([
                                ("error".to_string(), e.to_string()),
                                ("fallback".to_string(), "cached".to_string()),
                                ("rate".to_string(), format!("{rate:.2}")),
                            ]),
                        );
                    }
                    None => {
                        self.analytics.track_event(
                            "rate_update_error",
                            HashMap::from([
                                ("error".to_string(), e.to_string()),
                                ("fallback".to_string(), "none".to_string()),
                            ]),
                        );
                    }
                }
            }
        }
    }
}
