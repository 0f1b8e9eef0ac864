use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility. Cumulative over the
/// process lifetime; clones share the same cells.
#[derive(Clone, Default)]
pub struct Counters {
    pub products_checked: Arc<AtomicU64>,
    pub scrape_failures: Arc<AtomicU64>,
    pub store_failures: Arc<AtomicU64>,
    pub history_appends: Arc<AtomicU64>,

    pub drops_detected: Arc<AtomicU64>,
    pub alerts_sent: Arc<AtomicU64>,
    pub alerts_failed: Arc<AtomicU64>,
    pub alerts_suppressed: Arc<AtomicU64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub products_checked: u64,
    pub scrape_failures: u64,
    pub store_failures: u64,
    pub history_appends: u64,
    pub drops_detected: u64,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
    pub alerts_suppressed: u64,
}

impl Counters {
    pub fn bump(cell: &AtomicU64) {
        cell.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CountersSnapshot {
            products_checked: get(&self.products_checked),
            scrape_failures: get(&self.scrape_failures),
            store_failures: get(&self.store_failures),
            history_appends: get(&self.history_appends),
            drops_detected: get(&self.drops_detected),
            alerts_sent: get(&self.alerts_sent),
            alerts_failed: get(&self.alerts_failed),
            alerts_suppressed: get(&self.alerts_suppressed),
        }
    }
}
