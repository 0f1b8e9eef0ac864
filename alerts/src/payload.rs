//! Discord webhook body for a price drop.

use reqwest::Url;
use retail::Retailer;
use serde_json::{Value, json};

use crate::notifier::PriceDropAlert;

/// Embed side bar color (green).
pub const EMBED_COLOR: u32 = 3_066_993;

const MAX_NAME_CHARS: usize = 200;

pub fn retailer_icon(retailer: Retailer) -> &'static str {
    match retailer {
        Retailer::Amazon => {
            "https://upload.wikimedia.org/wikipedia/commons/thumb/a/a9/Amazon_logo.svg/1024px-Amazon_logo.svg.png"
        }
        Retailer::Flipkart => {
            "https://upload.wikimedia.org/wikipedia/commons/thumb/2/2f/Flipkart_logo.png/800px-Flipkart_logo.png"
        }
        Retailer::Croma => "https://www.croma.com/assets/images/croma-logo.png",
    }
}

/// Whole rupees with thousands grouping and two decimals: `₹1,234.00`.
pub fn format_inr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}₹{grouped}.00")
}

/// Host plus path, without scheme or query. Falls back to the input.
pub fn display_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => format!("{}{}", u.host_str().unwrap_or_default(), u.path()),
        Err(_) => url.to_string(),
    }
}

pub fn build(alert: &PriceDropAlert, percentage: f64) -> Value {
    let name: String = alert.product_name.chars().take(MAX_NAME_CHARS).collect();

    let description = format!(
        "**{name}**\n\n\
         🔻 **{percentage:.1}%** price drop!\n\
         📉 Old price: {old}\n\
         📈 New price: **{new}**\n\
         🛒 [View Product]({url})",
        old = format_inr(alert.old_price),
        new = format_inr(alert.new_price),
        url = alert.url,
    );

    json!({
        "embeds": [{
            "title": format!("💰 Price Drop Alert! ({})", alert.retailer.as_str().to_uppercase()),
            "description": description,
            "color": EMBED_COLOR,
            "footer": { "text": format!("Tracked from {}", display_url(&alert.url)) },
            "thumbnail": { "url": retailer_icon(alert.retailer) },
        }]
    })
}
