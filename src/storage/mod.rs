//! Storage module for auctions, items, and parse failures
//!
//! This module defines the persisted record types, the storage trait, and
//! the SQLite implementation. Item rows are keyed by
//! `(item_code, auction_id)` and replaced wholesale on every successful
//! parse; a failing row is captured as a parse-failure record for the same
//! key instead.

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::collections::BTreeMap;

/// An auction as first seen on the index page
///
/// Title and end time are immutable after the first sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionStub {
    /// Stable auction identifier extracted from the thread link
    pub id: String,

    /// Auction title
    pub title: String,

    /// Auction end time (unix timestamp, UTC midnight of the listed date)
    pub end_time: i64,
}

/// A stored auction row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionRecord {
    pub id: String,
    pub title: String,
    pub end_time: i64,

    /// Tri-state completion: None until a fetch has observed the page
    pub is_complete: Option<bool>,

    /// Unix timestamp of the last live fetch, None before the first
    pub last_fetch_time: Option<i64>,
}

/// A normalized equip row
#[derive(Debug, Clone, PartialEq)]
pub struct EquipRecord {
    pub item_code: String,
    pub auction_id: String,
    pub name: String,

    /// External equip identifier from the detail link
    pub eid: i64,

    /// 10-character alphanumeric key from the detail link
    pub key: String,

    /// Item-variant flag encoded in the detail link
    pub is_isekai: bool,

    /// Item level; 0 means "unassigned", None means not applicable
    pub level: Option<i64>,

    /// Stat name -> value mapping, order-insensitive
    pub stats: BTreeMap<String, String>,

    pub price: Option<i64>,
    pub bid_link: Option<String>,
    pub buyer: Option<String>,
    pub seller: String,
}

/// A normalized material row
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub item_code: String,
    pub auction_id: String,
    pub name: String,
    pub quantity: i64,

    /// price / quantity when sold, None when unsold
    pub unit_price: Option<f64>,

    pub price: Option<i64>,
    pub bid_link: Option<String>,
    pub buyer: Option<String>,
    pub seller: String,
}

/// A captured row-parse failure
///
/// Present instead of an equip/material row for its key, and superseded
/// once the row parses cleanly on a later fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub item_code: String,
    pub auction_id: String,

    /// Human-readable summary of what went wrong
    pub summary: String,

    /// Raw row markup, kept for auditing
    pub raw_html: String,
}

/// Outcome of parsing one item row, ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    Equip(EquipRecord),
    Material(MaterialRecord),
    Failed(FailureRecord),
}

impl PageItem {
    /// The row key this item writes under
    pub fn item_code(&self) -> &str {
        match self {
            PageItem::Equip(e) => &e.item_code,
            PageItem::Material(m) => &m.item_code,
            PageItem::Failed(f) => &f.item_code,
        }
    }
}

/// Stored-record counts for the stats mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub auctions: u64,
    pub pending_auctions: u64,
    pub equips: u64,
    pub materials: u64,
    pub failures: u64,
}
