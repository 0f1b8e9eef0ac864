use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{info, instrument, warn};

use common::logger::warn_if_slow;

use crate::detector::drop_percentage;
use crate::errors::NotifyError;
use crate::notifier::{Notifier, PriceDropAlert};
use crate::payload;

/// Posts alerts to a Discord webhook. Only `204 No Content` counts as
/// delivered.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Client,
    webhook_url: Option<String>,
    /// Percent, not a fraction. Checked against the drop recomputed from
    /// the alert's own prices.
    min_drop_percentage: f64,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>, min_drop_percentage: f64) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            min_drop_percentage,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Same as [`Notifier::send_alert`] but keeps the reason for failure.
    #[instrument(
        skip(self, alert),
        fields(url = %alert.url, retailer = %alert.retailer),
        level = "debug"
    )]
    pub async fn deliver(&self, alert: &PriceDropAlert) -> Result<(), NotifyError> {
        let webhook = self.webhook_url.as_deref().ok_or(NotifyError::NotConfigured)?;

        let percentage = drop_percentage(alert.old_price, alert.new_price);
        if percentage < self.min_drop_percentage {
            return Err(NotifyError::BelowMinimum {
                percentage,
                minimum: self.min_drop_percentage,
            });
        }

        let body = payload::build(alert, percentage);

        let resp = warn_if_slow("discord_webhook", Duration::from_secs(2), async {
            self.http.post(webhook).json(&body).send().await
        })
        .await
        .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body: text,
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_alert(&self, alert: &PriceDropAlert) -> bool {
        match self.deliver(alert).await {
            Ok(()) => {
                info!(url = %alert.url, retailer = %alert.retailer, product = %alert.product_name, "price drop alert sent");
                true
            }
            Err(e @ NotifyError::BelowMinimum { .. }) => {
                info!(url = %alert.url, reason = %e, "alert not sent");
                false
            }
            Err(e) => {
                warn!(url = %alert.url, retailer = %alert.retailer, error = %e, "failed to send price drop alert");
                false
            }
        }
    }
}
