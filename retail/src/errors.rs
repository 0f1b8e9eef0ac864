use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("price text is not numeric: {0:?}")]
    NotNumeric(String),
}

/// Failure of the page fetcher itself. Messages are flattened to strings so
/// the error can travel inside a `ScrapeResult`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(String),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("page fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Why a retailer attempt produced no usable price.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("no price locator matched a numeric value")]
    PriceNotFound,

    #[error("no name locator matched")]
    NameNotFound,

    #[error("fetch failure: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("url does not belong to a supported retailer: {0}")]
pub struct UnknownRetailer(pub String);
