use chrono::{DateTime, Utc};
use retail::{CURRENCY, Retailer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_URL_LEN: usize = 500;
pub const MAX_RETAILER_LEN: usize = 50;

/// One price observation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub amount: i64,
    pub currency: String,
    pub recorded_at: DateTime<Utc>,
}

impl PricePoint {
    pub fn inr(amount: i64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            amount,
            currency: CURRENCY.to_string(),
            recorded_at,
        }
    }
}

/// A tracked product page, keyed by URL.
///
/// `history` is append-only and only grows when the amount changes, so after
/// any successful update `latest.amount == history.last().amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: Uuid,
    pub url: String,
    pub retailer: Retailer,
    pub name: String,
    pub latest: PricePoint,
    pub history: Vec<PricePoint>,
}

impl Product {
    /// Product as created by its first successful scrape.
    pub fn first_seen(url: &str, retailer: Retailer, amount: i64, name: &str, now: DateTime<Utc>) -> Self {
        let point = PricePoint::inr(amount, now);
        Self {
            product_id: Uuid::new_v4(),
            url: truncate(url, MAX_URL_LEN),
            retailer,
            name: name.to_string(),
            latest: point.clone(),
            history: vec![point],
        }
    }

    /// Amount new readings are compared against: the most recent history
    /// entry, falling back to the latest reading for an empty history.
    pub fn last_recorded_amount(&self) -> i64 {
        self.history
            .last()
            .map(|p| p.amount)
            .unwrap_or(self.latest.amount)
    }

    /// Applies a reading in memory. `latest` is always refreshed; the new
    /// point is appended (and returned) only when the amount changed.
    pub fn apply_reading(&mut self, amount: i64, name: &str, now: DateTime<Utc>) -> Option<PricePoint> {
        let point = PricePoint::inr(amount, now);
        self.latest = point.clone();
        if !name.is_empty() {
            self.name = name.to_string();
        }

        let changed = self.history.last().is_none_or(|last| last.amount != amount);
        if changed {
            self.history.push(point.clone());
            Some(point)
        } else {
            None
        }
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
