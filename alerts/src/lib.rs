//! Deciding whether a price change deserves an alert, rate-limiting alerts
//! per product, and delivering them.

pub mod cooldown;
pub mod detector;
pub mod discord;
pub mod errors;
pub mod notifier;
pub mod payload;

pub use cooldown::{CooldownPermit, CooldownTracker};
pub use detector::{DropThresholds, drop_percentage, is_significant_drop};
pub use discord::DiscordNotifier;
pub use errors::NotifyError;
pub use notifier::{Notifier, PriceDropAlert, notify_all};
