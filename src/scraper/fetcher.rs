//! HTTP fetcher
//!
//! This module builds the HTTP client used for all outbound requests and
//! performs plain GET fetches of page markup. Transport failures (non-2xx
//! status, body decode errors) are fatal to the current fetch attempt;
//! any retry or backoff policy is layered externally via the rate-limiter
//! scope, never here.

use crate::{Result, ScrapeError};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds the HTTP client used for all fetches
///
/// # Arguments
///
/// * `user_agent` - Optional user agent string from the configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua.to_string());
    }

    Ok(builder.build()?)
}

/// Fetches a page as raw markup
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
///
/// # Returns
///
/// * `Ok(String)` - The response body
/// * `Err(ScrapeError)` - Transport failure, non-2xx status, or decode error
pub async fn fetch_text(client: &Client, url: Url) -> Result<String> {
    tracing::info!("Fetching {}", url);

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ScrapeError::Http {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| ScrapeError::Http {
        url: url.to_string(),
        source: e,
    })
}
