//! Retailer page scraping: locating product name and price on a fetched
//! page and normalizing price text into whole rupees.

pub mod errors;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod normalize;
pub mod orchestrator;
pub mod page;
pub mod retailer;

pub use errors::{FetchError, NormalizeError, ScrapeError, UnknownRetailer};
pub use extract::{ScrapeResult, extract};
pub use fetch::HttpPageFetcher;
pub use normalize::normalize;
pub use orchestrator::{ScrapeOrchestrator, ScrapeStrategy, Snapshot};
pub use page::{Element, Locator, Page, PageFetcher};
pub use retailer::{CURRENCY, Retailer, RetailerUrls, clean_url};
