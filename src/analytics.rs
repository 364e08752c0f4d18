//! In-memory analytics sink used by the rate poller to record fetch outcomes.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AnalyticsEvent {
    pub name: String,
    pub parameters: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

pub trait Analytics: Send + Sync {
    fn track_event(&self, name: &str, parameters: HashMap<String, String>);

    /// Returns tracked events, optionally filtered by name and an inclusive
    /// `[from, to]` timestamp range. `None` leaves a bound unrestricted.
    fn events(
        &self,
        name: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<AnalyticsEvent>;
}

/// Append-only event log. Events are never mutated or dropped.
#[derive(Default)]
pub struct MemoryAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemoryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Analytics for MemoryAnalytics {
    fn track_event(&self, name: &str, parameters: HashMap<String, String>) {
        let event = AnalyticsEvent {
            name: name.to_string(),
            parameters,
            timestamp: Utc::now(),
        };
        info!(name = %event.name, parameters = ?event.parameters, "Analytics event tracked");
        self.events.lock().unwrap().push(event);
    }

    fn events(
        &self,
        name: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<AnalyticsEvent> {
        let events = self.events.lock().unwrap();
        events
            .iter()
            .filter(|event| {
                let matches_name = name.is_none_or(|n| event.name == n);
                let matches_from = from.is_none_or(|f| event.timestamp >= f);
                let matches_to = to.is_none_or(|t| event.timestamp <= t);
                matches_name && matches_from && matches_to
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_track_event_appends() {
        let analytics = MemoryAnalytics::new();
        assert!(analytics.events(None, None, None).is_empty());

        analytics.track_event(
            "test_event",
            HashMap::from([("key".to_string(), "value".to_string())]),
        );

        let events = analytics.events(None, None, None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "test_event");
        assert_eq!(events[0].parameters.get("key"), Some(&"value".to_string()));
    }

    #[test]
    fn test_filter_by_name() {
        let analytics = MemoryAnalytics::new();
        analytics.track_event("A", HashMap::new());
        analytics.track_event("B", HashMap::new());
        analytics.track_event("A", HashMap::new());

        let events = analytics.events(Some("A"), None, None);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.name == "A"));

        assert_eq!(analytics.events(Some("B"), None, None).len(), 1);
        assert!(analytics.events(Some("C"), None, None).is_empty());
    }

    #[test]
    fn test_filter_by_date_range_is_inclusive() {
        let analytics = MemoryAnalytics::new();
        analytics.track_event("A", HashMap::new());
        let tracked_at = analytics.events(None, None, None)[0].timestamp;

        // Bounds exactly on the event timestamp keep it.
        let events = analytics.events(None, Some(tracked_at), Some(tracked_at));
        assert_eq!(events.len(), 1);

        // A window entirely in the past excludes it.
        let past = tracked_at - Duration::hours(2);
        assert!(
            analytics
                .events(None, Some(past), Some(past + Duration::hours(1)))
                .is_empty()
        );

        // A window entirely in the future excludes it.
        let future = tracked_at + Duration::hours(1);
        assert!(analytics.events(None, Some(future), None).is_empty());
    }
}
