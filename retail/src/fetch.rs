use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::errors::FetchError;
use crate::html::HtmlPage;
use crate::page::{Page, PageFetcher};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Plain HTTP fetcher that hands back the server-rendered HTML.
///
/// It has no rendering engine, so it always runs headless; pages that only
/// render prices client-side will surface as `PriceNotFound`.
pub struct HttpPageFetcher {
    http: Client,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, headless: bool) -> Result<Self, FetchError> {
        if !headless {
            warn!("headed fetch mode requested; the http fetcher always runs headless");
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self { http, timeout })
    }

    fn map_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            return FetchError::Timeout(self.timeout);
        }
        match e.status() {
            Some(status) => FetchError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => FetchError::Http(e.to_string()),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    async fn fetch(&mut self, url: &str) -> Result<Box<dyn Page>, FetchError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_error(e))?;

        let body = resp.text().await.map_err(|e| self.map_error(e))?;

        debug!(bytes = body.len(), "page fetched");

        Ok(Box::new(HtmlPage::new(url, body)))
    }
}
