use async_trait::async_trait;
use futures::future::join_all;
use retail::Retailer;
use serde::Serialize;

/// Everything a channel needs to describe one price drop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceDropAlert {
    pub product_name: String,
    pub old_price: i64,
    pub new_price: i64,
    pub url: String,
    pub retailer: Retailer,
}

/// Outbound alert channel.
///
/// `false` means "not delivered, carry on": implementations never panic or
/// propagate errors into the monitor loop.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, alert: &PriceDropAlert) -> bool;
}

/// Sends every alert concurrently and returns the outcomes in input order.
pub async fn notify_all(notifier: &dyn Notifier, alerts: &[PriceDropAlert]) -> Vec<bool> {
    join_all(alerts.iter().map(|a| notifier.send_alert(a))).await
}
