use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::UnknownRetailer;

/// All prices are tracked in whole rupees.
pub const CURRENCY: &str = "INR";

/// Supported storefronts. Declaration order is the map ordering only;
/// priority orders live with the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retailer {
    Amazon,
    Flipkart,
    Croma,
}

/// Per-retailer product page URLs for one product.
pub type RetailerUrls = BTreeMap<Retailer, String>;

impl Retailer {
    pub const ALL: [Retailer; 3] = [Retailer::Amazon, Retailer::Flipkart, Retailer::Croma];

    pub fn as_str(&self) -> &'static str {
        match self {
            Retailer::Amazon => "amazon",
            Retailer::Flipkart => "flipkart",
            Retailer::Croma => "croma",
        }
    }

    /// Classifies a product URL by its host.
    pub fn from_url(url: &str) -> Result<Self, UnknownRetailer> {
        let parsed = Url::parse(url).map_err(|_| UnknownRetailer(url.to_string()))?;
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

        Retailer::ALL
            .into_iter()
            .find(|r| host.contains(r.host_marker()))
            .ok_or_else(|| UnknownRetailer(url.to_string()))
    }

    fn host_marker(&self) -> &'static str {
        match self {
            Retailer::Amazon => "amazon.",
            Retailer::Flipkart => "flipkart.",
            Retailer::Croma => "croma.",
        }
    }

    /// Query parameters that identify the product; everything else is tracking noise.
    fn kept_query_params(&self) -> &'static [&'static str] {
        match self {
            Retailer::Amazon => &["dp", "product"],
            Retailer::Flipkart => &["pid", "lid"],
            Retailer::Croma => &["p"],
        }
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Retailer {
    type Err = UnknownRetailer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amazon" => Ok(Retailer::Amazon),
            "flipkart" => Ok(Retailer::Flipkart),
            "croma" => Ok(Retailer::Croma),
            other => Err(UnknownRetailer(other.to_string())),
        }
    }
}

/// Strips the fragment and tracking parameters from a product URL, keeping
/// only the retailer's identifying query parameters (first value wins).
/// Input that does not parse is returned unchanged.
pub fn clean_url(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            warn!(%url, error = %e, "url cleaning failed; keeping original");
            return url.to_string();
        }
    };

    let keep: &[&str] = Retailer::from_url(url)
        .map(|r| r.kept_query_params())
        .unwrap_or(&[]);

    let mut kept: Vec<(String, String)> = Vec::new();
    for (k, v) in parsed.query_pairs() {
        if keep.contains(&k.as_ref()) && !kept.iter().any(|(seen, _)| seen == k.as_ref()) {
            kept.push((k.into_owned(), v.into_owned()));
        }
    }

    parsed.set_fragment(None);
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }

    parsed.to_string()
}
