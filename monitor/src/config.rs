use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use alerts::DropThresholds;
use common::logger::LogFormat;
use retail::ScrapeStrategy;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    // =========================
    // Alerting
    // =========================
    /// Discord webhook. Without it every alert is reported undelivered.
    pub discord_webhook_url: Option<String>,

    /// Notifier-side minimum drop, in percent (5.0 = 5%).
    pub min_drop_percentage: f64,

    /// Detector-side minimum drop, as a fraction (0.05 = 5%).
    pub price_drop_threshold: f64,

    /// Detector-side minimum drop in whole rupees.
    pub min_absolute_drop: i64,

    /// Minimum time between two alerts for the same url.
    pub alert_cooldown: chrono::Duration,

    /// Reserved. Drops are compared against the last recorded price only.
    pub max_history_days: u32,

    // =========================
    // Scraping
    // =========================
    pub headless: bool,

    /// Whole-page fetch timeout.
    pub fetch_timeout: Duration,

    /// Bound on each locator lookup inside a fetched page.
    pub locator_wait: Duration,

    pub scrape_strategy: ScrapeStrategy,

    /// Time between two check cycles in `run` mode.
    pub check_interval: Duration,

    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys take defaults and
    /// set-but-invalid keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cooldown_hours: i64 = parse(&get, "ALERT_COOLDOWN_HOURS", 24)?;
        if cooldown_hours < 0 {
            return Err(invalid("ALERT_COOLDOWN_HOURS", cooldown_hours, "must not be negative"));
        }

        let alert_cooldown = chrono::Duration::try_hours(cooldown_hours)
            .ok_or_else(|| invalid("ALERT_COOLDOWN_HOURS", cooldown_hours, "out of range"))?;

        let interval_secs: u64 = parse(&get, "CHECK_INTERVAL_SECS", 3600)?;
        if interval_secs == 0 {
            return Err(invalid("CHECK_INTERVAL_SECS", interval_secs, "must be positive"));
        }

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite://pricewatch.db?mode=rwc".to_string()),

            discord_webhook_url: get("DISCORD_WEBHOOK_URL"),
            min_drop_percentage: parse(&get, "MIN_DROP_PERCENTAGE", 5.0)?,
            price_drop_threshold: parse(&get, "PRICE_DROP_THRESHOLD", 0.05)?,
            min_absolute_drop: parse(&get, "MIN_ABSOLUTE_DROP", 500)?,
            alert_cooldown,
            max_history_days: parse(&get, "MAX_HISTORY_DAYS", 30)?,

            headless: parse_bool(&get, "HEADLESS", true)?,
            fetch_timeout: Duration::from_secs(parse(&get, "FETCH_TIMEOUT_SECS", 15)?),
            locator_wait: Duration::from_secs(parse(&get, "LOCATOR_WAIT_SECS", 5)?),
            scrape_strategy: parse(&get, "SCRAPE_STRATEGY", ScrapeStrategy::FirstAvailable)?,
            check_interval: Duration::from_secs(interval_secs),

            log_format: parse(&get, "LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    pub fn thresholds(&self) -> DropThresholds {
        DropThresholds::new(self.price_drop_threshold, self.min_absolute_drop)
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| AppError::Config {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, AppError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "expected true or false")),
    }
}

fn invalid(key: &'static str, value: impl Display, reason: &str) -> AppError {
    AppError::Config {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
