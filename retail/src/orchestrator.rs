//! Scrape orchestration across retailers.
//!
//! Responsibilities:
//! - Issue one fetch per attempted retailer against the caller's fetcher,
//!   strictly one at a time.
//! - Apply the configured strategy: every retailer (`AllRetailers`) or the
//!   first retailer in priority order that yields a price (`FirstAvailable`).
//! - Pick a display name by name priority.
//!
//! Non-responsibilities:
//! - Retrying. A failed attempt is reported in the snapshot; the monitor
//!   picks the product up again next cycle.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::logger::warn_if_slow;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::errors::ScrapeError;
use crate::extract::{ScrapeResult, extract};
use crate::page::PageFetcher;
use crate::retailer::{Retailer, RetailerUrls};

pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const MAX_NAME_LEN: usize = 500;

/// Retailers whose titles are preferred for display, best first.
pub const NAME_PRIORITY: [Retailer; 3] = [Retailer::Flipkart, Retailer::Amazon, Retailer::Croma];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrapeStrategy {
    /// Attempt every configured retailer and aggregate all prices.
    AllRetailers,
    /// Attempt retailers in priority order, stop at the first price.
    #[default]
    FirstAvailable,
}

impl FromStr for ScrapeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_retailers" | "all" | "multi" => Ok(Self::AllRetailers),
            "single_best" | "first_available" | "single" => Ok(Self::FirstAvailable),
            other => Err(format!("unknown scrape strategy '{other}'")),
        }
    }
}

/// One attempted retailer inside a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    pub retailer: Retailer,
    pub url: String,
    pub result: ScrapeResult,
}

/// Aggregated result of one orchestration pass.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub name: String,
    /// Price per attempted retailer (`None` when the attempt failed).
    pub prices: BTreeMap<Retailer, Option<i64>>,
    /// Attempts in the order they were made.
    pub attempts: Vec<Attempt>,
}

impl Snapshot {
    pub fn price_for(&self, retailer: Retailer) -> Option<i64> {
        self.prices.get(&retailer).copied().flatten()
    }

    pub fn attempt_for(&self, retailer: Retailer) -> Option<&Attempt> {
        self.attempts.iter().find(|a| a.retailer == retailer)
    }

    /// First attempt (in attempt order) that produced a price.
    pub fn best(&self) -> Option<(Retailer, i64)> {
        self.attempts
            .iter()
            .find_map(|a| a.result.price.map(|p| (a.retailer, p)))
    }
}

#[derive(Clone, Debug)]
pub struct ScrapeOrchestrator {
    strategy: ScrapeStrategy,
    priority: Vec<Retailer>,
    locator_wait: Duration,
}

impl ScrapeOrchestrator {
    /// Default priority is Flipkart, Amazon, Croma.
    pub fn new(strategy: ScrapeStrategy, locator_wait: Duration) -> Self {
        Self {
            strategy,
            priority: NAME_PRIORITY.to_vec(),
            locator_wait,
        }
    }

    pub fn with_priority(mut self, priority: Vec<Retailer>) -> Self {
        self.priority = priority;
        self
    }

    pub fn strategy(&self) -> ScrapeStrategy {
        self.strategy
    }

    /// Runs one pass over `urls`. Retailers absent from `urls` are skipped;
    /// retailers absent from the priority list are attempted last.
    #[instrument(skip_all, fields(strategy = ?self.strategy, retailers = urls.len()))]
    pub async fn scrape(&self, fetcher: &mut dyn PageFetcher, urls: &RetailerUrls) -> Snapshot {
        let mut attempts = Vec::with_capacity(urls.len());

        for retailer in self.attempt_order(urls) {
            let Some(url) = urls.get(&retailer) else {
                continue;
            };

            let span = info_span!("retailer_attempt", %retailer, %url);
            let result = match scrape_retailer(fetcher, retailer, url, self.locator_wait)
                .instrument(span)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(%retailer, %url, error = %e, "retailer attempt failed");
                    ScrapeResult::failed(e)
                }
            };

            let priced = result.price.is_some();
            attempts.push(Attempt {
                retailer,
                url: url.clone(),
                result,
            });

            if priced && self.strategy == ScrapeStrategy::FirstAvailable {
                debug!(%retailer, "price found; skipping remaining retailers");
                break;
            }
        }

        let snapshot = Snapshot {
            taken_at: common::time::now(),
            name: display_name(&attempts),
            prices: attempts
                .iter()
                .map(|a| (a.retailer, a.result.price))
                .collect(),
            attempts,
        };

        info!(
            name = %snapshot.name,
            prices = ?snapshot.prices,
            "scrape pass complete"
        );

        snapshot
    }

    fn attempt_order(&self, urls: &RetailerUrls) -> Vec<Retailer> {
        let mut order: Vec<Retailer> = self
            .priority
            .iter()
            .copied()
            .filter(|r| urls.contains_key(r))
            .collect();
        for r in urls.keys() {
            if !order.contains(r) {
                order.push(*r);
            }
        }
        order
    }
}

/// Fetches `url` and extracts from the page. Fetch failures are the only
/// error; extraction problems live inside the returned result.
pub async fn scrape_retailer(
    fetcher: &mut dyn PageFetcher,
    retailer: Retailer,
    url: &str,
    locator_wait: Duration,
) -> Result<ScrapeResult, ScrapeError> {
    let page = warn_if_slow("page_fetch", Duration::from_secs(10), fetcher.fetch(url)).await?;
    Ok(extract(retailer, page.as_ref(), locator_wait).await)
}

fn display_name(attempts: &[Attempt]) -> String {
    let name = NAME_PRIORITY
        .iter()
        .filter_map(|r| attempts.iter().find(|a| a.retailer == *r))
        .find_map(|a| a.result.name.as_deref().filter(|n| !n.trim().is_empty()))
        .unwrap_or(UNKNOWN_PRODUCT);

    name.chars().take(MAX_NAME_LEN).collect()
}
