use serde::Deserialize;

/// Main configuration structure for lotkeeper
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub origin: OriginConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub output: OutputConfig,
}

/// Origin site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OriginConfig {
    /// Base URL of the auction site (index page lives at the root)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Optional user agent override for outbound requests
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

/// Outbound request throttling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Number of fetches admitted per rolling period
    pub calls: u32,

    /// Rolling period length in seconds
    #[serde(rename = "period-secs")]
    pub period_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the serialized HTML cache document
    #[serde(rename = "cache-path")]
    pub cache_path: String,
}
