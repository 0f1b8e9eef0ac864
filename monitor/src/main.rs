mod cli;

use std::sync::Arc;

use alerts::{CooldownTracker, DiscordNotifier};
use anyhow::Context;
use clap::Parser;
use common::logger::init_logger;
use history::PriceHistoryStore;
use history::db::Db;
use history::repository_sqlx::SqlxProductRepository;
use monitor::monitor::retailer_urls;
use monitor::{AppConfig, Counters, PriceMonitor};
use retail::{HttpPageFetcher, ScrapeOrchestrator};
use tokio::sync::watch;

use cli::{Cli, Command};

/// Connects, migrates and wraps the database in the history store.
async fn init_store(cfg: &AppConfig) -> anyhow::Result<Arc<PriceHistoryStore>> {
    let db = Db::connect(&cfg.database_url)
        .await
        .with_context(|| format!("failed to connect to {}", cfg.database_url))?;
    db.migrate().await.context("schema migration failed")?;

    let repo = Arc::new(SqlxProductRepository::new(db.pool.clone()));
    Ok(Arc::new(PriceHistoryStore::new(repo)))
}

fn build_monitor(store: Arc<PriceHistoryStore>, cfg: &AppConfig) -> anyhow::Result<PriceMonitor> {
    let notifier = DiscordNotifier::new(cfg.discord_webhook_url.clone(), cfg.min_drop_percentage)?;
    if !notifier.is_configured() {
        tracing::warn!("DISCORD_WEBHOOK_URL not set; drops will be logged but not delivered");
    }

    Ok(PriceMonitor::new(
        store,
        ScrapeOrchestrator::new(cfg.scrape_strategy, cfg.locator_wait),
        cfg.thresholds(),
        Arc::new(CooldownTracker::new(cfg.alert_cooldown)),
        Arc::new(notifier),
        Counters::default(),
    ))
}

/// Flips the returned receiver to `true` on ctrl-c.
fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c; stop the process externally");
            // Dropping the sender would read as a shutdown request.
            tx.closed().await;
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = tx.send(true);
    });
    rx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;
    init_logger("pricewatch", cfg.log_format);

    tracing::info!(strategy = ?cfg.scrape_strategy, "Starting pricewatch...");

    let store = init_store(&cfg).await?;
    let monitor = build_monitor(store, &cfg)?;
    let mut fetcher = HttpPageFetcher::new(cfg.fetch_timeout, cfg.headless)?;

    match cli.command {
        Command::Run => {
            let shutdown = shutdown_on_ctrl_c();
            monitor.run(&mut fetcher, cfg.check_interval, shutdown).await;
        }
        Command::Once => {
            let shutdown = shutdown_on_ctrl_c();
            let report = monitor.run_cycle(&mut fetcher, &shutdown).await?;
            tracing::info!(?report, "single check cycle complete");
        }
        Command::Track { amazon, flipkart, croma } => {
            let urls = retailer_urls(amazon, flipkart, croma);
            if urls.is_empty() {
                anyhow::bail!("pass at least one of --amazon, --flipkart, --croma");
            }
            let tracked = monitor.track(&mut fetcher, &urls).await?;
            if tracked.is_empty() {
                anyhow::bail!("no retailer returned a price; nothing was tracked");
            }
        }
    }

    Ok(())
}
