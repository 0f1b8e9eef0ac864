use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use common::time::{from_ms, to_ms};

use crate::errors::StoreError;
use crate::model::{MAX_RETAILER_LEN, PricePoint, Product, truncate};
use crate::repository::ProductRepository;

/// SQLx-backed implementation of ProductRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxProductRepository {
    pool: AnyPool,
}

impl SqlxProductRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    async fn history_for(&self, product_id: &str) -> Result<Vec<PricePoint>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT amount, currency, recorded_at_ms
FROM price_history
WHERE product_id = ?
ORDER BY seq ASC;
"#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_point).collect()
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn fetch_by_url(&self, url: &str) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
SELECT product_id, url, retailer, name, latest_amount, latest_currency, latest_recorded_at_ms
FROM products
WHERE url = ?;
"#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("product_id")?;
        let history = self.history_for(&id).await?;
        Ok(Some(row_to_product(&row, history)?))
    }

    async fn fetch_all(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT product_id, url, retailer, name, latest_amount, latest_currency, latest_recorded_at_ms
FROM products
ORDER BY url ASC;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let history_rows = sqlx::query(
            r#"
SELECT product_id, amount, currency, recorded_at_ms
FROM price_history
ORDER BY product_id ASC, seq ASC;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut histories: HashMap<String, Vec<PricePoint>> = HashMap::new();
        let mut unreadable: HashSet<String> = HashSet::new();
        for r in &history_rows {
            let id: String = r.try_get("product_id")?;
            match row_to_point(r) {
                Ok(point) => histories.entry(id).or_default().push(point),
                Err(e) => {
                    tracing::warn!(error = %e, product_id = %id, "skipping product with malformed history row");
                    unreadable.insert(id);
                }
            }
        }

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let id: String = r.try_get("product_id")?;
            if unreadable.contains(&id) {
                continue;
            }
            let history = histories.remove(&id).unwrap_or_default();
            match row_to_product(&r, history) {
                Ok(p) => out.push(p),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the listing
                    tracing::warn!(error = %e, product_id = %id, "skipping malformed product row");
                }
            }
        }

        Ok(out)
    }

    async fn insert(&self, product: &Product) -> Result<(), StoreError> {
        let id = product.product_id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
INSERT INTO products
  (product_id, url, retailer, name, latest_amount, latest_currency, latest_recorded_at_ms)
VALUES (?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(&id)
        .bind(&product.url)
        .bind(truncate(product.retailer.as_str(), MAX_RETAILER_LEN))
        .bind(&product.name)
        .bind(product.latest.amount)
        .bind(&product.latest.currency)
        .bind(to_ms(product.latest.recorded_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Duplicate { .. } => StoreError::Duplicate {
                url: product.url.clone(),
            },
            other => other,
        })?;

        for (seq, point) in product.history.iter().enumerate() {
            sqlx::query(
                r#"
INSERT INTO price_history (product_id, seq, amount, currency, recorded_at_ms)
VALUES (?, ?, ?, ?, ?);
"#,
            )
            .bind(&id)
            .bind(seq as i64 + 1)
            .bind(point.amount)
            .bind(&point.currency)
            .bind(to_ms(point.recorded_at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn record_reading(
        &self,
        product_id: &Uuid,
        latest: &PricePoint,
        name: &str,
        appended: Option<&PricePoint>,
    ) -> Result<(), StoreError> {
        let id = product_id.to_string();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
UPDATE products
SET latest_amount = ?, latest_currency = ?, latest_recorded_at_ms = ?, name = ?
WHERE product_id = ?;
"#,
        )
        .bind(latest.amount)
        .bind(&latest.currency)
        .bind(to_ms(latest.recorded_at))
        .bind(name)
        .bind(&id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Unavailable(format!("product {id} vanished during update")));
        }

        if let Some(point) = appended {
            sqlx::query(
                r#"
INSERT INTO price_history (product_id, seq, amount, currency, recorded_at_ms)
SELECT ?, COALESCE(MAX(seq), 0) + 1, ?, ?, ?
FROM price_history
WHERE product_id = ?;
"#,
            )
            .bind(&id)
            .bind(point.amount)
            .bind(&point.currency)
            .bind(to_ms(point.recorded_at))
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/* =========================
Row mapping
========================= */

fn row_to_point(r: &sqlx::any::AnyRow) -> Result<PricePoint, StoreError> {
    let ms: i64 = r.try_get("recorded_at_ms")?;
    Ok(PricePoint {
        amount: r.try_get("amount")?,
        currency: r.try_get("currency")?,
        recorded_at: from_ms(ms).ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {ms}")))?,
    })
}

fn row_to_product(r: &sqlx::any::AnyRow, history: Vec<PricePoint>) -> Result<Product, StoreError> {
    let id_str: String = r.try_get("product_id")?;
    let product_id =
        Uuid::parse_str(&id_str).map_err(|e| StoreError::Corrupt(format!("invalid product_id: {e}")))?;

    let retailer_str: String = r.try_get("retailer")?;
    let retailer = retailer_str
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("{e}")))?;

    let ms: i64 = r.try_get("latest_recorded_at_ms")?;

    Ok(Product {
        product_id,
        url: r.try_get("url")?,
        retailer,
        name: r.try_get("name")?,
        latest: PricePoint {
            amount: r.try_get("latest_amount")?,
            currency: r.try_get("latest_currency")?,
            recorded_at: from_ms(ms)
                .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {ms}")))?,
        },
        history,
    })
}
