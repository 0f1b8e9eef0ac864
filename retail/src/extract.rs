//! Per-retailer extraction.
//!
//! Each retailer is a fixed table of name and price locators. Extraction walks
//! the name locators until one yields non-empty text, then the price locators
//! until one yields text the normalizer accepts. Every lookup is bounded by
//! the locator wait; nothing here returns an error past its boundary, failures
//! land in [`ScrapeResult::error`].

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::ScrapeError;
use crate::normalize::normalize;
use crate::page::{Element, Locator, Page};
use crate::retailer::Retailer;

/// Outcome of one (product, retailer) attempt.
///
/// `price` is the success signal. `error` is `PriceNotFound` or a fetch
/// failure when `price` is `None`, and `NameNotFound` when only the name
/// could not be located.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrapeResult {
    pub name: Option<String>,
    pub price: Option<i64>,
    pub error: Option<ScrapeError>,
}

impl ScrapeResult {
    pub fn failed(error: ScrapeError) -> Self {
        Self {
            name: None,
            price: None,
            error: Some(error),
        }
    }
}

struct RetailerProfile {
    names: &'static [Locator],
    prices: &'static [Locator],
    /// Read the raw `textContent` before the visible text (off-screen price spans).
    prefer_text_content: bool,
}

static AMAZON: RetailerProfile = RetailerProfile {
    names: &[Locator::Id("productTitle")],
    prices: &[
        Locator::Css("span.a-price-whole"),
        Locator::Css("span[class*='priceToPay'] span.a-offscreen"),
        Locator::Css("span[class*='a-price'] span[class*='a-offscreen']"),
        Locator::Css("span[class*='apexPriceToPay'] span[class*='a-offscreen']"),
    ],
    prefer_text_content: true,
};

static FLIPKART: RetailerProfile = RetailerProfile {
    names: &[Locator::Class("B_NuCI"), Locator::Css("h1 span")],
    prices: &[
        Locator::Css("div[class*='_30jeq3']"),
        Locator::OwnText {
            tag: "div",
            needle: "₹",
        },
    ],
    prefer_text_content: false,
};

static CROMA: RetailerProfile = RetailerProfile {
    names: &[Locator::Class("pdp-product-title"), Locator::Tag("h1")],
    prices: &[
        Locator::Css("span[class*='amount']"),
        Locator::Css("span[class*='price']"),
    ],
    prefer_text_content: false,
};

fn profile(retailer: Retailer) -> &'static RetailerProfile {
    match retailer {
        Retailer::Amazon => &AMAZON,
        Retailer::Flipkart => &FLIPKART,
        Retailer::Croma => &CROMA,
    }
}

/// Extracts name and price for `retailer` from an already fetched page.
pub async fn extract(retailer: Retailer, page: &dyn Page, wait: Duration) -> ScrapeResult {
    let profile = profile(retailer);

    let name = first_name(page, profile, wait).await;
    if name.is_none() {
        debug!(%retailer, url = %page.url(), "product name not located");
    }

    match first_price(page, profile, wait).await {
        Some(price) => {
            // A missing name never discards a price; it is reported alongside it.
            let error = name.is_none().then_some(ScrapeError::NameNotFound);
            ScrapeResult {
                name,
                price: Some(price),
                error,
            }
        }
        None => {
            warn!(%retailer, url = %page.url(), "no price locator produced a numeric value");
            ScrapeResult {
                name,
                price: None,
                error: Some(ScrapeError::PriceNotFound),
            }
        }
    }
}

async fn first_name(page: &dyn Page, profile: &RetailerProfile, wait: Duration) -> Option<String> {
    for locator in profile.names {
        let Some(el) = locate(page, locator, wait).await else {
            continue;
        };
        let text = el.text().trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    None
}

async fn first_price(page: &dyn Page, profile: &RetailerProfile, wait: Duration) -> Option<i64> {
    for locator in profile.prices {
        let Some(el) = locate(page, locator, wait).await else {
            continue;
        };

        let text = price_text(&el, profile.prefer_text_content);
        match normalize(text) {
            Ok(amount) if amount > 0 => return Some(amount),
            Ok(_) => debug!(?locator, "ignoring zero price"),
            Err(e) => debug!(?locator, error = %e, "price text rejected"),
        }
    }
    None
}

fn price_text(el: &Element, prefer_text_content: bool) -> &str {
    let content = el
        .attribute("textContent")
        .filter(|t| prefer_text_content && !t.trim().is_empty());
    content.unwrap_or_else(|| el.text())
}

async fn locate(page: &dyn Page, locator: &Locator, wait: Duration) -> Option<Element> {
    match timeout(wait, page.find(locator)).await {
        Ok(found) => found,
        Err(_) => {
            debug!(?locator, wait_ms = wait.as_millis() as u64, "locator wait elapsed");
            None
        }
    }
}
