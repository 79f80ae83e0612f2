//! Lotkeeper: an auction-listing scraper and normalizer
//!
//! This crate ingests auction listings and per-auction item rows from a
//! semi-structured HTML source, normalizes them into typed equip/material
//! records, and persists them to SQLite for later querying. Fetches are
//! rate-limited per named scope and cached so completed auctions are never
//! re-fetched.

pub mod cache;
pub mod config;
pub mod limiter;
pub mod scraper;
pub mod storage;

use thiserror::Error;

/// Main error type for lotkeeper operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for lotkeeper operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::HtmlCache;
pub use config::Config;
pub use limiter::RateLimiter;
pub use crate::scraper::Scraper;
pub use storage::{SqliteStorage, Storage};
