//! Storage trait and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    AuctionRecord, AuctionStub, EquipRecord, FailureRecord, MaterialRecord, PageItem, StoreStats,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Auction not found: {0}")]
    AuctionNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// All writes belonging to one fetched page go through `commit_page`,
/// which commits them atomically.
pub trait Storage {
    // ===== Auctions =====

    /// Inserts an auction if its id is unseen
    ///
    /// Title and end time are never overwritten for an existing id.
    ///
    /// # Returns
    ///
    /// `true` if a new row was inserted, `false` if the id already existed
    fn insert_auction_stub(&mut self, stub: &AuctionStub) -> StorageResult<bool>;

    /// Gets an auction by id
    fn get_auction(&self, id: &str) -> StorageResult<Option<AuctionRecord>>;

    /// Gets auctions that still need a fetch
    ///
    /// An auction is pending while it has never been fetched or its
    /// completion state is unknown or false.
    fn pending_auctions(&self) -> StorageResult<Vec<AuctionRecord>>;

    /// Records the outcome of a live fetch on the auction row
    ///
    /// Sets the completion flag and the fetch timestamp; never touches
    /// title or end time.
    fn record_fetch(&mut self, id: &str, is_complete: bool, fetched_at: i64) -> StorageResult<()>;

    // ===== Page commits =====

    /// Commits all rows of one fetched page atomically
    ///
    /// Successful rows replace the stored row for their key and clear any
    /// stale failure; failed rows replace the failure for their key and
    /// remove any stale item rows.
    fn commit_page(&mut self, auction_id: &str, items: &[PageItem]) -> StorageResult<()>;

    // ===== Row lookups =====

    /// Gets an equip row by key
    fn get_equip(&self, item_code: &str, auction_id: &str) -> StorageResult<Option<EquipRecord>>;

    /// Gets a material row by key
    fn get_material(
        &self,
        item_code: &str,
        auction_id: &str,
    ) -> StorageResult<Option<MaterialRecord>>;

    /// Gets a parse failure by key
    fn get_failure(&self, item_code: &str, auction_id: &str)
        -> StorageResult<Option<FailureRecord>>;

    // ===== Statistics =====

    /// Counts stored records for the stats mode
    fn stats(&self) -> StorageResult<StoreStats>;
}
