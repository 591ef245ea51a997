//! Transcript page retrieval.
//!
//! Parliament's site sits behind a bot challenge that plain HTTP clients
//! sometimes fail, so a headless-browser session is tried first when one is
//! configured. Any browser failure falls through to a direct request with a
//! desktop user agent. Nothing is retried beyond that single fallback.

use crate::config::Settings;
use crate::errors::FetchError;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// A Browserless-compatible `/content` endpoint returning rendered HTML.
#[derive(Debug, Clone)]
pub struct BrowserSession {
    endpoint: String,
    token: Option<String>,
}

impl BrowserSession {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            endpoint: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Full URL of the content endpoint, token included.
    pub fn content_url(&self) -> String {
        match &self.token {
            Some(token) => format!("{}/content?token={}", self.endpoint, urlencoding::encode(token)),
            None => format!("{}/content", self.endpoint),
        }
    }

    async fn content(&self, client: &Client, url: &str) -> Result<String, FetchError> {
        let resp = client
            .post(self.content_url())
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| network_error(url, e))?;
        read_body(resp, url).await
    }
}

/// Fetches raw HTML, browser first, direct HTTP second.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    browser: Option<BrowserSession>,
}

impl Fetcher {
    /// Build a fetcher from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (e.g. TLS
    /// backend initialisation fails).
    pub fn from_settings(settings: &Settings) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        let browser = settings
            .browserless_url
            .as_deref()
            .map(|url| BrowserSession::new(url, settings.browserless_token.as_deref()));
        info!(browser = browser.is_some(), "Fetcher ready");
        Ok(Self { client, browser })
    }

    /// Retrieve `url`, returning its HTML body.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(browser) = &self.browser {
            match browser.content(&self.client, url).await {
                Ok(html) => {
                    debug!(bytes = html.len(), "Used browser fetch");
                    return Ok(html);
                }
                Err(e) => warn!(error = %e, "Browser fetch failed; falling back to direct fetch"),
            }
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;
        let html = read_body(resp, url).await?;
        debug!(bytes = html.len(), "Used direct fetch");
        Ok(html)
    }
}

/// The browser endpoint URL carries its token, so reqwest's URL is dropped
/// from the message; `url` is the page that was asked for.
fn network_error(url: &str, e: reqwest::Error) -> FetchError {
    FetchError::Network {
        url: url.to_string(),
        message: e.without_url().to_string(),
    }
}

async fn read_body(resp: reqwest::Response, url: &str) -> Result<String, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let body = resp.text().await.map_err(|e| network_error(url, e))?;
    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody {
            url: url.to_string(),
        });
    }
    Ok(body)
}
