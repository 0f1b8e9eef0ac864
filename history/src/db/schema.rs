use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Products (one row per tracked url)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS products (
  product_id TEXT PRIMARY KEY,
  url VARCHAR(500) NOT NULL UNIQUE,
  retailer VARCHAR(50) NOT NULL,
  name TEXT NOT NULL,
  latest_amount BIGINT NOT NULL,
  latest_currency TEXT NOT NULL,
  latest_recorded_at_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Append-only history, ordered by seq within a product
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS price_history (
  product_id TEXT NOT NULL,
  seq BIGINT NOT NULL,
  amount BIGINT NOT NULL,
  currency TEXT NOT NULL,
  recorded_at_ms BIGINT NOT NULL,
  PRIMARY KEY (product_id, seq)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_products_retailer ON products(retailer);"#)
        .execute(pool)
        .await?;

    Ok(())
}
