use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::debug;

#[derive(Default)]
struct CooldownState {
    last_alert: HashMap<String, DateTime<Utc>>,
    in_flight: HashSet<String>,
}

/// Per-url alert rate limit. Lives for the process only: a restart forgets
/// every cooldown.
pub struct CooldownTracker {
    window: Duration,
    state: Mutex<CooldownState>,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(CooldownState::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// True when `url` was never alerted or its last alert is strictly
    /// older than the window.
    pub fn should_alert(&self, url: &str, now: DateTime<Utc>) -> bool {
        let state = self.state.lock();
        self.elapsed(&state, url, now)
    }

    /// Overwrites the last-alert time for `url`.
    pub fn record_alert(&self, url: &str, now: DateTime<Utc>) {
        self.state.lock().last_alert.insert(url.to_string(), now);
    }

    pub fn last_alert(&self, url: &str) -> Option<DateTime<Utc>> {
        self.state.lock().last_alert.get(url).copied()
    }

    /// Atomic check-and-reserve for `url`. While the returned permit is
    /// alive no other caller gets one for the same url. Committing the
    /// permit records the alert; dropping it uncommitted leaves the
    /// cooldown untouched.
    pub fn try_begin(self: &Arc<Self>, url: &str, now: DateTime<Utc>) -> Option<CooldownPermit> {
        let mut state = self.state.lock();
        if state.in_flight.contains(url) || !self.elapsed(&state, url, now) {
            debug!(url, "alert suppressed by cooldown");
            return None;
        }

        state.in_flight.insert(url.to_string());
        Some(CooldownPermit {
            tracker: Arc::clone(self),
            url: url.to_string(),
        })
    }

    fn elapsed(&self, state: &CooldownState, url: &str, now: DateTime<Utc>) -> bool {
        match state.last_alert.get(url) {
            None => true,
            Some(last) => now - *last > self.window,
        }
    }
}

/// Reservation handed out by [`CooldownTracker::try_begin`].
pub struct CooldownPermit {
    tracker: Arc<CooldownTracker>,
    url: String,
}

impl CooldownPermit {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Records the alert as delivered at `now` and releases the reservation.
    pub fn commit(self, now: DateTime<Utc>) {
        self.tracker.record_alert(&self.url, now);
    }
}

impl Drop for CooldownPermit {
    fn drop(&mut self) {
        self.tracker.state.lock().in_flight.remove(&self.url);
    }
}
