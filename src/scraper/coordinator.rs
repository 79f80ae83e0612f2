//! Scrape pipeline coordinator
//!
//! Owns the HTTP client, rate limiter, cache, and storage, and drives the
//! two pipeline stages: refreshing the auction index and fetching item
//! pages for auctions that still need one. Every outbound request is
//! admitted through the origin-host scope; cached pages bypass the
//! limiter entirely.

use crate::cache::HtmlCache;
use crate::config::Config;
use crate::limiter::RateLimiter;
use crate::scraper::fetcher::{build_http_client, fetch_text};
use crate::scraper::listing::parse_listing;
use crate::scraper::rows::{parse_auction_page, parse_item_row};
use crate::storage::{SqliteStorage, Storage};
use crate::{Result, ScrapeError};
use chrono::Utc;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Coordinates listing refresh and per-auction fetches
pub struct Scraper {
    client: Client,
    limiter: RateLimiter,
    cache: HtmlCache,
    storage: SqliteStorage,
    base_url: Url,
    scope: String,
}

impl Scraper {
    /// Builds the full pipeline from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Scraper)` - Pipeline ready to run
    /// * `Err(ScrapeError)` - A component failed to initialize
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = Url::parse(&config.origin.base_url)?;
        let scope = base_url.host_str().unwrap_or("origin").to_string();

        let client = build_http_client(config.origin.user_agent.as_deref())?;
        let limiter = RateLimiter::new(
            config.rate_limit.calls,
            Duration::from_secs(config.rate_limit.period_secs),
        );
        let cache = HtmlCache::load(Path::new(&config.output.cache_path))?;
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

        Ok(Self {
            client,
            limiter,
            cache,
            storage,
            base_url,
            scope,
        })
    }

    /// Read access to the backing storage
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Fetches the auction index and records newly seen auctions
    ///
    /// Known auction ids are left untouched, so titles and end times keep
    /// their first-seen values. Malformed index rows are logged and
    /// skipped without affecting their neighbors.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of newly inserted auctions
    /// * `Err(ScrapeError)` - The index page could not be fetched
    pub async fn refresh_list(&mut self) -> Result<usize> {
        self.limiter.acquire(&self.scope).await;
        let html = fetch_text(&self.client, self.base_url.clone()).await?;

        let mut inserted = 0;
        for row in parse_listing(&html) {
            match row {
                Ok(stub) => {
                    if self.storage.insert_auction_stub(&stub)? {
                        tracing::debug!("New auction {}: {}", stub.id, stub.title);
                        inserted += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!("Skipping malformed index row: {}", err);
                }
            }
        }

        tracing::info!("Index refresh recorded {} new auctions", inserted);
        Ok(inserted)
    }

    /// Fetches item pages for every auction that still needs one
    ///
    /// Auctions are processed sequentially in end-time order. A failure on
    /// one auction is logged and the rest still run.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of auctions fetched without error
    pub async fn fetch_updates(&mut self) -> Result<usize> {
        let pending = self.storage.pending_auctions()?;
        tracing::info!("{} auctions need a fetch", pending.len());

        let mut fetched = 0;
        for auction in pending {
            let allow_cached = auction.is_complete == Some(true);
            match self.fetch_auction(&auction.id, allow_cached).await {
                Ok(()) => fetched += 1,
                Err(err) => {
                    tracing::error!("Auction {} failed: {}", auction.id, err);
                }
            }
        }

        Ok(fetched)
    }

    /// Fetches, parses, and commits one auction's item page
    ///
    /// The page lives at `itemlist{id}` under the origin root, which is
    /// also its cache key. A cached copy stands in for the live fetch only
    /// when `allow_cached` is set; a live fetch records the observed
    /// completion state on the auction row before any item rows commit.
    pub async fn fetch_auction(&mut self, auction_id: &str, allow_cached: bool) -> Result<()> {
        let page_path = format!("itemlist{}", auction_id);

        let (html, live) = match self.cache.get(&page_path) {
            Some(cached) if allow_cached => {
                tracing::debug!("Using cached page for auction {}", auction_id);
                (cached.to_string(), false)
            }
            _ => {
                self.limiter.acquire(&self.scope).await;
                let url = self.base_url.join(&page_path)?;
                let html = fetch_text(&self.client, url).await?;
                self.cache.put(&page_path, &html)?;
                (html, true)
            }
        };

        let mut page = parse_auction_page(&html);
        if live {
            self.storage
                .record_fetch(auction_id, page.ended, Utc::now().timestamp())?;
        }
        let items: Vec<_> = page
            .rows
            .iter_mut()
            .enumerate()
            .map(|(ordinal, row)| parse_item_row(auction_id, row, ordinal))
            .collect();

        tracing::info!(
            "Auction {}: {} rows, ended={}",
            auction_id,
            items.len(),
            page.ended
        );
        self.storage
            .commit_page(auction_id, &items)
            .map_err(ScrapeError::Storage)
    }
}
