use crate::parser::{COORDINATES_SELECTOR, ParseError, parse_coordinates, parse_selector};
use crate::types::PopCode;

use reqwest::{Client, StatusCode};
use scraper::Selector;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error(transparent)]
    Selector(#[from] ParseError),
}

/// Why a single PoP page yielded no coordinates. Never fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,
    #[error("Server responded with HTTP {0}")]
    Status(StatusCode),
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status)
        } else {
            FetchError::Http(e)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Prefix the lower-cased code is appended to; must end with `/`.
    pub base_url: String,
    pub timeout: Duration,
    pub selector: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: crate::BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
            selector: COORDINATES_SELECTOR.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    base_url: String,
    selector: Selector,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_config(ScraperConfig::default())
    }

    pub fn with_config(config: ScraperConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        let mut base_url = config.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            selector: parse_selector(&config.selector)?,
        })
    }

    pub fn pop_url(&self, code: &PopCode) -> String {
        format!("{}{}/", self.base_url, code.slug())
    }

    pub async fn fetch_coordinates(&self, code: &PopCode) -> Result<String, FetchError> {
        let url = self.pop_url(code);
        log::debug!("Fetching PoP page: {}", url);
        let html = self.get_html(&url).await?;
        Ok(parse_coordinates(&html, &self.selector)?)
    }

    async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}
