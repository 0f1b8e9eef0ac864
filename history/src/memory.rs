use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::model::{PricePoint, Product};
use crate::repository::ProductRepository;

/// Process-local repository. It can be told to fail or to lose an insert
/// race on purpose, which the store and monitor tests rely on.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: Mutex<HashMap<String, Product>>,
    fail_with: Mutex<Option<StoreError>>,
    racing_insert: Mutex<Option<Product>>,
    writes: Mutex<usize>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.products.lock();
            for p in products {
                map.insert(p.url.clone(), p);
            }
        }
        repo
    }

    /// Every call fails with `err` until [`Self::heal`] is called.
    pub fn fail_with(&self, err: StoreError) {
        *self.fail_with.lock() = Some(err);
    }

    pub fn heal(&self) {
        *self.fail_with.lock() = None;
    }

    /// The next insert finds `competitor` already stored and reports a
    /// duplicate, as if another writer won the race.
    pub fn lose_next_insert_to(&self, competitor: Product) {
        *self.racing_insert.lock() = Some(competitor);
    }

    /// Number of successful insert and record_reading calls.
    pub fn writes(&self) -> usize {
        *self.writes.lock()
    }

    pub fn snapshot(&self, url: &str) -> Option<Product> {
        self.products.lock().get(url).cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        match &*self.fail_with.lock() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn fetch_by_url(&self, url: &str) -> Result<Option<Product>, StoreError> {
        self.check()?;
        Ok(self.products.lock().get(url).cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<Product>, StoreError> {
        self.check()?;
        let mut all: Vec<Product> = self.products.lock().values().cloned().collect();
        all.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(all)
    }

    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        self.check()?;
        let mut map = self.products.lock();

        if let Some(competitor) = self.racing_insert.lock().take() {
            map.insert(competitor.url.clone(), competitor);
        }

        if map.contains_key(&product.url) {
            return Err(StoreError::Duplicate {
                url: product.url.clone(),
            });
        }

        map.insert(product.url.clone(), product.clone());
        *self.writes.lock() += 1;
        Ok(())
    }

    async fn record_reading(
        &self,
        product_id: &Uuid,
        latest: &PricePoint,
        name: &str,
        appended: Option<&PricePoint>,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut map = self.products.lock();
        let product = map
            .values_mut()
            .find(|p| p.product_id == *product_id)
            .ok_or_else(|| StoreError::Unavailable(format!("product {product_id} vanished during update")))?;

        product.latest = latest.clone();
        product.name = name.to_string();
        if let Some(point) = appended {
            product.history.push(point.clone());
        }

        *self.writes.lock() += 1;
        Ok(())
    }
}
