//! Check cycles over every tracked product.
//!
//! Per product, strictly one after another on the shared fetcher:
//! read the last recorded price, scrape, record the reading, run the drop
//! detector and, when the cooldown allows, hand the alert to a notification
//! task. Notification tasks run concurrently with the remaining scrapes and
//! are awaited before the cycle returns.

use std::sync::Arc;
use std::time::Duration;

use alerts::{CooldownPermit, CooldownTracker, DropThresholds, Notifier, PriceDropAlert};
use chrono::{DateTime, Utc};
use common::logger::{TraceId, child_span, cycle_span};
use history::{PriceHistoryStore, Product, StoreError};
use retail::{PageFetcher, Retailer, RetailerUrls, ScrapeOrchestrator, Snapshot, clean_url};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, error, info, warn};

use crate::error::AppError;
use crate::metrics::Counters;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Outcome of one check cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub skipped: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    /// Shutdown was requested before every product was checked.
    pub cancelled: bool,
}

/// What happened to one product inside a cycle.
enum ProductOutcome {
    Unchanged,
    Recorded,
    Skipped,
    Alert(PriceDropAlert, CooldownPermit),
}

pub struct PriceMonitor {
    store: Arc<PriceHistoryStore>,
    orchestrator: ScrapeOrchestrator,
    thresholds: DropThresholds,
    cooldown: Arc<CooldownTracker>,
    notifier: Arc<dyn Notifier>,
    counters: Counters,
    clock: Clock,
}

impl PriceMonitor {
    pub fn new(
        store: Arc<PriceHistoryStore>,
        orchestrator: ScrapeOrchestrator,
        thresholds: DropThresholds,
        cooldown: Arc<CooldownTracker>,
        notifier: Arc<dyn Notifier>,
        counters: Counters,
    ) -> Self {
        Self {
            store,
            orchestrator,
            thresholds,
            cooldown,
            notifier,
            counters,
            clock: Arc::new(common::time::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Starts tracking a product listed at one or more retailers.
    ///
    /// URLs are stripped of tracking parameters first. With the
    /// all-retailers strategy every retailer that returns a price gets a
    /// product record; otherwise only the first one in priority order does.
    /// Returns the products that were created or refreshed.
    pub async fn track(
        &self,
        fetcher: &mut dyn PageFetcher,
        urls: &RetailerUrls,
    ) -> Result<Vec<Product>, AppError> {
        let trace_id = TraceId::new();
        let span = cycle_span("track", &trace_id);

        async {
            let cleaned: RetailerUrls = urls.iter().map(|(r, u)| (*r, clean_url(u))).collect();
            let snapshot = self.orchestrator.scrape(fetcher, &cleaned).await;
            log_failed_attempts(&snapshot);

            let mut tracked = Vec::new();
            for attempt in &snapshot.attempts {
                let Some(price) = attempt.result.price else {
                    continue;
                };
                let product = self
                    .store
                    .upsert_at(&attempt.url, attempt.retailer, price, &snapshot.name, self.now())
                    .await?;
                info!(
                    component = "monitor",
                    event = "tracked",
                    url = %product.url,
                    retailer = %product.retailer,
                    price,
                    "product tracked"
                );
                tracked.push(product);
            }

            if tracked.is_empty() {
                warn!(component = "monitor", event = "track_failed", "no retailer returned a price; nothing tracked");
            }
            Ok::<_, AppError>(tracked)
        }
        .instrument(span)
        .await
    }

    /// Runs one pass over every tracked product.
    ///
    /// Scrape failures and unavailable-store errors skip only the product
    /// at hand. Any other store error ends the cycle early, after pending
    /// notifications have finished. Shutdown is honoured between products.
    pub async fn run_cycle(
        &self,
        fetcher: &mut dyn PageFetcher,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<CycleReport, AppError> {
        let trace_id = TraceId::new();
        let span = cycle_span("check", &trace_id);

        async {
            let products = self.store.tracked().await?;
            info!(component = "monitor", event = "cycle_start", products = products.len(), "check cycle started");

            let mut report = CycleReport::default();
            let mut pending: JoinSet<bool> = JoinSet::new();
            let mut aborted: Option<StoreError> = None;

            for product in &products {
                if *shutdown.borrow() {
                    info!(component = "monitor", event = "cycle_cancelled", "shutdown requested; stopping between products");
                    report.cancelled = true;
                    break;
                }

                let span = child_span("product");
                span.record("url", product.url.as_str());
                span.record("retailer", product.retailer.as_str());

                match self.check_product(fetcher, product).instrument(span).await {
                    Ok(outcome) => {
                        report.checked += 1;
                        match outcome {
                            ProductOutcome::Skipped => report.skipped += 1,
                            ProductOutcome::Unchanged | ProductOutcome::Recorded => {}
                            ProductOutcome::Alert(alert, permit) => {
                                self.dispatch(&mut pending, alert, permit);
                            }
                        }
                    }
                    Err(e) if e.is_transient() => {
                        Counters::bump(&self.counters.store_failures);
                        warn!(url = %product.url, product_id = %product.product_id, error = %e, "store unavailable; product skipped this cycle");
                        report.skipped += 1;
                    }
                    Err(e) => {
                        error!(url = %product.url, product_id = %product.product_id, error = %e, "unexpected store error; ending cycle early");
                        aborted = Some(e);
                        break;
                    }
                }
            }

            while let Some(res) = pending.join_next().await {
                match res {
                    Ok(true) => report.alerts_sent += 1,
                    Ok(false) => report.alerts_failed += 1,
                    Err(e) => {
                        error!(error = %e, "notification task panicked");
                        report.alerts_failed += 1;
                    }
                }
            }

            let totals = self.counters.snapshot();
            info!(
                component = "monitor",
                event = "cycle_end",
                checked = report.checked,
                skipped = report.skipped,
                alerts_sent = report.alerts_sent,
                alerts_failed = report.alerts_failed,
                total_checked = totals.products_checked,
                total_alerts = totals.alerts_sent,
                "check cycle finished"
            );

            match aborted {
                Some(e) => Err(AppError::from(e)),
                None => Ok(report),
            }
        }
        .instrument(span)
        .await
    }

    async fn check_product(
        &self,
        fetcher: &mut dyn PageFetcher,
        tracked: &Product,
    ) -> Result<ProductOutcome, StoreError> {
        let url = tracked.url.as_str();
        let retailer = tracked.retailer;
        Counters::bump(&self.counters.products_checked);

        let Some(prior) = self.store.get(url).await? else {
            debug!(url, "product disappeared since listing; skipping");
            return Ok(ProductOutcome::Skipped);
        };
        let previous = prior.last_recorded_amount();

        let urls = RetailerUrls::from([(retailer, url.to_string())]);
        let snapshot = self.orchestrator.scrape(fetcher, &urls).await;

        let Some(current) = snapshot.price_for(retailer) else {
            Counters::bump(&self.counters.scrape_failures);
            let cause = snapshot
                .attempt_for(retailer)
                .and_then(|a| a.result.error.as_ref())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no price".to_string());
            warn!(url, %retailer, error = %cause, "scrape failed; product skipped this cycle");
            return Ok(ProductOutcome::Skipped);
        };

        let name = scraped_name(&snapshot, &prior);
        let updated = self.store.upsert_at(url, retailer, current, &name, self.now()).await?;
        let appended = updated.history.len() > prior.history.len();
        if appended {
            Counters::bump(&self.counters.history_appends);
        }

        if !self.thresholds.is_significant(current, previous) {
            debug!(url, previous, current, "no significant drop");
            return Ok(if appended {
                ProductOutcome::Recorded
            } else {
                ProductOutcome::Unchanged
            });
        }

        Counters::bump(&self.counters.drops_detected);
        info!(url, %retailer, previous, current, "significant price drop detected");

        let Some(permit) = self.cooldown.try_begin(url, self.now()) else {
            Counters::bump(&self.counters.alerts_suppressed);
            info!(url, %retailer, "alert suppressed by cooldown");
            return Ok(ProductOutcome::Recorded);
        };

        let alert = PriceDropAlert {
            product_name: updated.name.clone(),
            old_price: previous,
            new_price: current,
            url: updated.url.clone(),
            retailer,
        };
        Ok(ProductOutcome::Alert(alert, permit))
    }

    /// Sends `alert` on its own task. The cooldown is recorded only when
    /// the notifier reports delivery.
    fn dispatch(&self, pending: &mut JoinSet<bool>, alert: PriceDropAlert, permit: CooldownPermit) {
        let notifier = Arc::clone(&self.notifier);
        let counters = self.counters.clone();
        let clock = Arc::clone(&self.clock);

        pending.spawn(
            async move {
                let delivered = notifier.send_alert(&alert).await;
                if delivered {
                    permit.commit(clock());
                    Counters::bump(&counters.alerts_sent);
                } else {
                    Counters::bump(&counters.alerts_failed);
                    warn!(url = %alert.url, retailer = %alert.retailer, "alert not delivered; cooldown left open for retry");
                }
                delivered
            }
            .in_current_span(),
        );
    }

    /// Runs a check cycle every `interval` until `shutdown` flips to true
    /// or its sender goes away. Missed ticks are skipped, not replayed.
    pub async fn run(
        &self,
        fetcher: &mut dyn PageFetcher,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {}
            }
            if shutdown.has_changed().is_err() && !*shutdown.borrow() {
                error!(component = "monitor", event = "shutdown", "shutdown channel closed unexpectedly; monitor loop stopped");
                return;
            }
            if *shutdown.borrow() {
                info!(component = "monitor", event = "shutdown", "monitor loop stopped");
                return;
            }

            match self.run_cycle(fetcher, &shutdown).await {
                Ok(report) if report.cancelled => {
                    info!(component = "monitor", event = "shutdown", "monitor loop stopped mid-cycle");
                    return;
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "check cycle aborted; retrying next tick"),
            }
        }
    }
}

/// Name from this scrape when there is one, otherwise the stored name.
fn scraped_name(snapshot: &Snapshot, prior: &Product) -> String {
    let fresh = snapshot
        .attempts
        .iter()
        .find_map(|a| a.result.name.clone())
        .filter(|n| !n.trim().is_empty());
    fresh.unwrap_or_else(|| prior.name.clone())
}

fn log_failed_attempts(snapshot: &Snapshot) {
    for attempt in &snapshot.attempts {
        if let Some(err) = &attempt.result.error {
            if attempt.result.price.is_none() {
                warn!(url = %attempt.url, retailer = %attempt.retailer, error = %err, "retailer attempt failed");
            }
        }
    }
}

/// Retailer map for `track`, skipping blanks.
pub fn retailer_urls(amazon: Option<String>, flipkart: Option<String>, croma: Option<String>) -> RetailerUrls {
    [
        (Retailer::Amazon, amazon),
        (Retailer::Flipkart, flipkart),
        (Retailer::Croma, croma),
    ]
    .into_iter()
    .filter_map(|(r, u)| u.filter(|u| !u.trim().is_empty()).map(|u| (r, u)))
    .collect()
}
