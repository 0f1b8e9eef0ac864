use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use retail::Retailer;
use tracing::{debug, info, instrument, warn};

use common::logger::warn_if_slow;

use crate::errors::StoreError;
use crate::locks::KeyedLocks;
use crate::model::{MAX_URL_LEN, Product, truncate};
use crate::repository::ProductRepository;

/// Monitor-facing store. Owns the merge policy (refresh latest, append on
/// change) and serializes writers per url; the repository only persists.
pub struct PriceHistoryStore {
    repo: Arc<dyn ProductRepository>,
    locks: KeyedLocks,
}

impl PriceHistoryStore {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self {
            repo,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn upsert(
        &self,
        url: &str,
        retailer: Retailer,
        amount: i64,
        name: &str,
    ) -> Result<Product, StoreError> {
        self.upsert_at(url, retailer, amount, name, common::time::now())
            .await
    }

    /// Records one successful reading for `url` as of `now`.
    ///
    /// Creates the product on first sight. Otherwise `latest` is always
    /// replaced and history grows only when `amount` differs from the last
    /// entry. Writers to the same url are serialized.
    #[instrument(skip(self, name, now), target = "store", fields(url = %url, retailer = %retailer))]
    pub async fn upsert_at(
        &self,
        url: &str,
        retailer: Retailer,
        amount: i64,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Product, StoreError> {
        let key = truncate(url, MAX_URL_LEN);
        let _guard = self.locks.lock(&key).await;

        let existing = warn_if_slow("db_fetch_by_url", Duration::from_millis(100), async {
            self.repo.fetch_by_url(&key).await
        })
        .await?;

        match existing {
            Some(product) => self.apply(product, amount, name, now).await,
            None => {
                let product = Product::first_seen(&key, retailer, amount, name, now);
                let inserted = warn_if_slow("db_insert", Duration::from_millis(100), async {
                    self.repo.insert(&product).await
                })
                .await;

                match inserted {
                    Ok(()) => {
                        info!(product_id = %product.product_id, "started tracking product");
                        Ok(product)
                    }
                    Err(StoreError::Duplicate { .. }) => {
                        warn!("insert raced with another writer; merging into existing record");
                        let winner = self.repo.fetch_by_url(&key).await?.ok_or_else(|| {
                            StoreError::Unavailable(format!("{key} reported duplicate but cannot be read"))
                        })?;
                        self.apply(winner, amount, name, now).await
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn apply(
        &self,
        mut product: Product,
        amount: i64,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Product, StoreError> {
        let previous = product.last_recorded_amount();
        let appended = product.apply_reading(amount, name, now);

        warn_if_slow("db_record_reading", Duration::from_millis(100), async {
            self.repo
                .record_reading(&product.product_id, &product.latest, &product.name, appended.as_ref())
                .await
        })
        .await?;

        if appended.is_some() {
            info!(product_id = %product.product_id, previous, amount, "price changed");
        } else {
            debug!(product_id = %product.product_id, "price unchanged; refreshed latest");
        }

        Ok(product)
    }

    #[instrument(skip(self), target = "store")]
    pub async fn get(&self, url: &str) -> Result<Option<Product>, StoreError> {
        let key = truncate(url, MAX_URL_LEN);
        self.repo.fetch_by_url(&key).await
    }

    /// Every tracked product, ordered by url.
    #[instrument(skip(self), target = "store")]
    pub async fn tracked(&self) -> Result<Vec<Product>, StoreError> {
        warn_if_slow("db_fetch_all", Duration::from_millis(200), async {
            self.repo.fetch_all().await
        })
        .await
    }
}
