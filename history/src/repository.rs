use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::model::{PricePoint, Product};

/// Persistence backend for products. Implementations only store and map
/// rows; the merge policy lives in [`crate::store::PriceHistoryStore`].
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn fetch_by_url(&self, url: &str) -> Result<Option<Product>, StoreError>;

    async fn fetch_all(&self) -> Result<Vec<Product>, StoreError>;

    /// Inserts a new product with its seed history. Fails with
    /// [`StoreError::Duplicate`] when the url is already present.
    async fn insert(&self, product: &Product) -> Result<(), StoreError>;

    /// Atomically replaces the latest reading (and name) and, when `appended`
    /// is set, appends it to the product's history.
    async fn record_reading(
        &self,
        product_id: &Uuid,
        latest: &PricePoint,
        name: &str,
        appended: Option<&PricePoint>,
    ) -> Result<(), StoreError>;
}
