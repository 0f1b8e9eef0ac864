use std::sync::atomic::Ordering;

use chrono::Duration;
use history::{ProductRepository, StoreError};
use monitor::AppError;
use retail::{FetchError, Retailer, RetailerUrls, ScrapeStrategy};
use tokio::sync::watch;
use tracing_test::traced_test;

use mock_monitor::*;

fn idle() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    std::mem::forget(tx);
    rx
}

async fn seed(h: &Harness, url: &str, retailer: Retailer, amount: i64) {
    h.store
        .upsert_at(url, retailer, amount, "Phone", h.clock.now())
        .await
        .unwrap();
}

#[tokio::test]
async fn drop_is_recorded_alerted_and_not_repeated() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();
    seed(&h, AMAZON, Retailer::Amazon, 79900).await;

    fetcher.set(AMAZON, amazon_html("Phone X", "₹72,900"));
    h.clock.advance(Duration::hours(1));

    let report = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.alerts_sent, 1);

    let product = h.store.get(AMAZON).await.unwrap().unwrap();
    let amounts: Vec<i64> = product.history.iter().map(|p| p.amount).collect();
    assert_eq!(amounts, vec![79900, 72900]);
    assert_eq!(product.name, "Phone X");

    let alerts = h.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!((alerts[0].old_price, alerts[0].new_price), (79900, 72900));
    assert_eq!(alerts[0].retailer, Retailer::Amazon);
    assert_eq!(h.cooldown.last_alert(AMAZON), Some(h.clock.now()));

    // unchanged price: no append, no drop, no alert
    h.clock.advance(Duration::hours(1));
    let report = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();
    assert_eq!(report.alerts_sent, 0);

    let product = h.store.get(AMAZON).await.unwrap().unwrap();
    assert_eq!(product.history.len(), 2);
    assert_eq!(product.latest.recorded_at, h.clock.now());
    assert_eq!(h.notifier.alerts().len(), 1);

    let totals = h.monitor.counters().snapshot();
    assert_eq!(totals.products_checked, 2);
    assert_eq!(totals.history_appends, 1);
    assert_eq!(totals.drops_detected, 1);
    assert_eq!(totals.alerts_sent, 1);
}

#[tokio::test]
async fn small_drop_is_recorded_without_alert() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();
    seed(&h, CROMA, Retailer::Croma, 79900).await;

    fetcher.set(CROMA, croma_html("Phone", "₹79,400"));
    let report = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();

    assert_eq!(report.alerts_sent + report.alerts_failed, 0);
    assert_eq!(h.store.get(CROMA).await.unwrap().unwrap().history.len(), 2);
    assert!(h.notifier.alerts().is_empty());
}

#[tokio::test]
async fn cooldown_suppresses_until_window_passes() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();
    seed(&h, AMAZON, Retailer::Amazon, 79900).await;

    fetcher.set(AMAZON, amazon_html("Phone", "₹72,900"));
    h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();

    h.clock.advance(Duration::hours(1));
    fetcher.set(AMAZON, amazon_html("Phone", "₹65,000"));
    let report = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();
    assert_eq!(report.alerts_sent, 0);
    assert_eq!(h.monitor.counters().alerts_suppressed.load(Ordering::Relaxed), 1);

    h.clock.advance(Duration::hours(25));
    fetcher.set(AMAZON, amazon_html("Phone", "₹58,000"));
    let report = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();
    assert_eq!(report.alerts_sent, 1);

    let prices: Vec<(i64, i64)> = h
        .notifier
        .alerts()
        .iter()
        .map(|a| (a.old_price, a.new_price))
        .collect();
    assert_eq!(prices, vec![(79900, 72900), (65000, 58000)]);
}

#[tokio::test]
#[traced_test]
async fn undelivered_alert_does_not_start_cooldown() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    h.notifier.set_deliver(false);
    let mut fetcher = ScriptedFetcher::default();
    seed(&h, AMAZON, Retailer::Amazon, 79900).await;

    fetcher.set(AMAZON, amazon_html("Phone", "₹72,900"));
    let report = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();

    assert_eq!(report.alerts_failed, 1);
    assert_eq!(h.cooldown.last_alert(AMAZON), None);
    assert!(h.cooldown.should_alert(AMAZON, h.clock.now()));
    assert!(logs_contain("cooldown left open for retry"));

    // history still advanced
    assert_eq!(h.store.get(AMAZON).await.unwrap().unwrap().history.len(), 2);
}

#[tokio::test]
#[traced_test]
async fn one_failing_product_does_not_stop_the_cycle() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();
    seed(&h, AMAZON, Retailer::Amazon, 79900).await;
    seed(&h, CROMA, Retailer::Croma, 50000).await;
    seed(&h, FLIPKART, Retailer::Flipkart, 20000).await;

    fetcher.set(AMAZON, amazon_html("Phone", "₹72,900"));
    fetcher.fail(CROMA, FetchError::Status { status: 503, url: CROMA.into() });
    fetcher.set(FLIPKART, flipkart_html("Phone", "no price here"));

    let report = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();

    assert_eq!(report.checked, 3);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.alerts_sent, 1);
    assert_eq!(fetcher.visits().len(), 3);

    // failed products keep their history untouched
    assert_eq!(h.store.get(CROMA).await.unwrap().unwrap().history.len(), 1);
    assert_eq!(h.store.get(FLIPKART).await.unwrap().unwrap().latest.amount, 20000);
    assert_eq!(h.monitor.counters().scrape_failures.load(Ordering::Relaxed), 2);
    assert!(logs_contain("scrape failed; product skipped this cycle"));
}

#[tokio::test]
async fn unavailable_store_fails_the_cycle_without_scraping() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();
    seed(&h, AMAZON, Retailer::Amazon, 79900).await;
    h.repo.fail_with(StoreError::Unavailable("connection refused".into()));

    let err = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap_err();
    assert!(matches!(err, AppError::Store(StoreError::Unavailable(_))));
    assert!(fetcher.visits().is_empty());

    // next cycle recovers
    h.repo.heal();
    fetcher.set(AMAZON, amazon_html("Phone", "₹79,900"));
    let report = h.monitor.run_cycle(&mut fetcher, &idle()).await.unwrap();
    assert_eq!(report.checked, 1);
}

#[tokio::test]
async fn shutdown_stops_between_products() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();
    seed(&h, AMAZON, Retailer::Amazon, 79900).await;
    seed(&h, CROMA, Retailer::Croma, 50000).await;
    fetcher.set(AMAZON, amazon_html("Phone", "₹72,900"));
    fetcher.set(CROMA, croma_html("Phone", "₹50,000"));

    let (tx, rx) = watch::channel(false);
    fetcher.stop_after(1, tx);

    let report = h.monitor.run_cycle(&mut fetcher, &rx).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.checked, 1);
    assert_eq!(fetcher.visits().len(), 1);
    // the product in flight finished, including its alert
    assert_eq!(report.alerts_sent, 1);
}

#[tokio::test]
async fn track_all_retailers_creates_one_product_per_priced_listing() {
    let h = harness(ScrapeStrategy::AllRetailers);
    let mut fetcher = ScriptedFetcher::default();

    fetcher.set(AMAZON, amazon_html("Amazon Title", "₹71,999"));
    fetcher.set(FLIPKART, flipkart_html("Flipkart Title", "₹72,499"));
    fetcher.fail(CROMA, FetchError::Timeout(std::time::Duration::from_secs(15)));

    let urls = RetailerUrls::from([
        (Retailer::Amazon, format!("{AMAZON}?ref=sr_1_1&tag=aff-21")),
        (Retailer::Flipkart, format!("{FLIPKART}&otracker=search#reviews")),
        (Retailer::Croma, CROMA.to_string()),
    ]);

    let tracked = h.monitor.track(&mut fetcher, &urls).await.unwrap();
    assert_eq!(tracked.len(), 2);

    let all = h.repo.fetch_all().await.unwrap();
    let urls: Vec<&str> = all.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec![AMAZON, FLIPKART]);
    assert!(all.iter().all(|p| p.name == "Flipkart Title"));
    assert_eq!(h.store.get(AMAZON).await.unwrap().unwrap().latest.amount, 71999);
}

#[tokio::test]
async fn track_single_best_records_only_the_first_priced_retailer() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();

    fetcher.set(FLIPKART, flipkart_html("Phone", "sold out"));
    fetcher.set(AMAZON, amazon_html("Phone", "₹71,999"));
    fetcher.set(CROMA, croma_html("Phone", "₹70,000"));

    let urls = RetailerUrls::from([
        (Retailer::Amazon, AMAZON.to_string()),
        (Retailer::Flipkart, FLIPKART.to_string()),
        (Retailer::Croma, CROMA.to_string()),
    ]);

    let tracked = h.monitor.track(&mut fetcher, &urls).await.unwrap();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].retailer, Retailer::Amazon);
    assert_eq!(fetcher.visits(), vec![FLIPKART.to_string(), AMAZON.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn run_repeats_on_interval_until_shutdown() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();
    seed(&h, CROMA, Retailer::Croma, 50000).await;
    fetcher.set(CROMA, croma_html("Phone", "₹50,000"));

    let (tx, rx) = watch::channel(false);
    let stopper = async move {
        tokio::time::sleep(std::time::Duration::from_secs(150)).await;
        tx.send(true).unwrap();
    };

    let probe = fetcher.clone();
    tokio::join!(
        h.monitor.run(&mut fetcher, std::time::Duration::from_secs(60), rx),
        stopper
    );

    // ticks at 0s, 60s and 120s
    assert_eq!(probe.visits().len(), 3);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn run_reports_a_closed_shutdown_channel_as_an_error() {
    let h = harness(ScrapeStrategy::FirstAvailable);
    let mut fetcher = ScriptedFetcher::default();

    let (tx, rx) = watch::channel(false);
    drop(tx);

    h.monitor.run(&mut fetcher, std::time::Duration::from_secs(60), rx).await;

    assert!(fetcher.visits().is_empty());
    assert!(logs_contain("shutdown channel closed unexpectedly"));
}
