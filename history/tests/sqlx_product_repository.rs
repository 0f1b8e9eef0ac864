use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::Row;
use uuid::Uuid;

use history::db::Db;
use history::repository_sqlx::SqlxProductRepository;
use history::{PriceHistoryStore, Product, ProductRepository, StoreError};
use retail::Retailer;

/// Isolated in-memory SQLite database per test; the unique name keeps
/// parallel tests from sharing tables.
async fn setup_db() -> Db {
    let conn_str = format!("sqlite:file:{}?mode=memory&cache=shared", Uuid::new_v4());
    let db = Db::connect(&conn_str).await.unwrap();
    db.migrate().await.unwrap();
    db
}

fn t(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
}

const URL: &str = "https://www.amazon.in/dp/B0TEST";

#[tokio::test]
async fn migrate_is_idempotent() {
    let db = setup_db().await;
    db.migrate().await.unwrap();
}

#[tokio::test]
async fn insert_then_fetch_round_trip() {
    let db = setup_db().await;
    let repo = SqlxProductRepository::new(db.pool.clone());

    let product = Product::first_seen(URL, Retailer::Amazon, 79900, "Phone", t(0));
    repo.insert(&product).await.unwrap();

    let loaded = repo.fetch_by_url(URL).await.unwrap().unwrap();
    assert_eq!(loaded, product);
    assert!(repo.fetch_by_url("https://www.amazon.in/dp/OTHER").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_url_reports_duplicate_with_real_url() {
    let db = setup_db().await;
    let repo = SqlxProductRepository::new(db.pool.clone());

    repo.insert(&Product::first_seen(URL, Retailer::Amazon, 100, "A", t(0)))
        .await
        .unwrap();
    let err = repo
        .insert(&Product::first_seen(URL, Retailer::Amazon, 200, "B", t(1)))
        .await
        .unwrap_err();

    assert_eq!(err, StoreError::Duplicate { url: URL.to_string() });

    let rows = sqlx::query("SELECT COUNT(*) AS n FROM products")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    let n: i64 = rows.try_get("n").unwrap();
    assert_eq!(n, 1);
}

#[tokio::test]
async fn store_over_sqlx_appends_only_on_change() {
    let db = setup_db().await;
    let store = PriceHistoryStore::new(Arc::new(SqlxProductRepository::new(db.pool.clone())));

    for (i, amount) in [79900, 79900, 72900, 72900, 72900].into_iter().enumerate() {
        store
            .upsert_at(URL, Retailer::Amazon, amount, "Phone", t(i as i64 * 60))
            .await
            .unwrap();
    }

    let p = store.get(URL).await.unwrap().unwrap();
    let amounts: Vec<i64> = p.history.iter().map(|h| h.amount).collect();
    assert_eq!(amounts, vec![79900, 72900]);
    assert_eq!(p.history[1].recorded_at, t(120));
    assert_eq!(p.latest.amount, 72900);
    assert_eq!(p.latest.recorded_at, t(240));
}

#[tokio::test]
async fn fetch_all_groups_history_per_product() {
    let db = setup_db().await;
    let store = PriceHistoryStore::new(Arc::new(SqlxProductRepository::new(db.pool.clone())));

    let croma = "https://www.croma.com/phone/p/123";
    store.upsert_at(URL, Retailer::Amazon, 100, "A", t(0)).await.unwrap();
    store.upsert_at(croma, Retailer::Croma, 500, "C", t(0)).await.unwrap();
    store.upsert_at(URL, Retailer::Amazon, 90, "A", t(1)).await.unwrap();
    store.upsert_at(croma, Retailer::Croma, 450, "C", t(1)).await.unwrap();
    store.upsert_at(croma, Retailer::Croma, 500, "C", t(2)).await.unwrap();

    let all = store.tracked().await.unwrap();
    assert_eq!(all.len(), 2);

    let amazon = all.iter().find(|p| p.url == URL).unwrap();
    let c = all.iter().find(|p| p.url == croma).unwrap();
    assert_eq!(amazon.history.len(), 2);
    assert_eq!(c.history.iter().map(|h| h.amount).collect::<Vec<_>>(), vec![500, 450, 500]);
    assert_eq!(c.retailer, Retailer::Croma);
}

#[tokio::test]
async fn unknown_retailer_row_is_skipped_in_listing() {
    let db = setup_db().await;
    let repo = SqlxProductRepository::new(db.pool.clone());

    repo.insert(&Product::first_seen(URL, Retailer::Amazon, 100, "A", t(0)))
        .await
        .unwrap();
    sqlx::query(
        r#"INSERT INTO products VALUES (?, 'https://example.com/x', 'ebay', 'X', 1, 'INR', 0)"#,
    )
    .bind(Uuid::new_v4().to_string())
    .execute(&db.pool)
    .await
    .unwrap();

    let all = repo.fetch_all().await.unwrap();
    assert_eq!(all.len(), 1);

    let err = repo.fetch_by_url("https://example.com/x").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[tokio::test]
async fn product_with_unreadable_history_is_skipped_in_listing() {
    let db = setup_db().await;
    let store = PriceHistoryStore::new(Arc::new(SqlxProductRepository::new(db.pool.clone())));
    let croma = "https://www.croma.com/phone/p/300001";

    store.upsert_at(URL, Retailer::Amazon, 100, "A", t(0)).await.unwrap();
    store.upsert_at(croma, Retailer::Croma, 500, "C", t(0)).await.unwrap();
    store.upsert_at(croma, Retailer::Croma, 450, "C", t(1)).await.unwrap();

    let broken = store.get(croma).await.unwrap().unwrap().product_id.to_string();
    sqlx::query("UPDATE price_history SET recorded_at_ms = ? WHERE product_id = ? AND seq = 2")
        .bind(i64::MAX)
        .bind(&broken)
        .execute(&db.pool)
        .await
        .unwrap();

    let all = store.tracked().await.unwrap();
    let urls: Vec<&str> = all.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec![URL]);

    let err = store.get(croma).await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)));
}

#[tokio::test]
async fn unreachable_backend_is_unavailable() {
    let db = setup_db().await;
    let repo = SqlxProductRepository::new(db.pool.clone());
    db.pool.close().await;

    let err = repo.fetch_by_url(URL).await.unwrap_err();
    assert!(err.is_transient(), "expected transient error, got {err:?}");
}
