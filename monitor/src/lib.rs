//! The price watch loop: scrape every tracked product, record the reading,
//! and alert on significant drops.

pub mod config;
pub mod error;
pub mod metrics;
pub mod monitor;

pub use config::AppConfig;
pub use error::AppError;
pub use metrics::{Counters, CountersSnapshot};
pub use monitor::{CycleReport, PriceMonitor};
