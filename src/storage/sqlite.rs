//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    AuctionRecord, AuctionStub, EquipRecord, FailureRecord, MaterialRecord, PageItem, StoreStats,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn auction_from_row(row: &Row<'_>) -> rusqlite::Result<AuctionRecord> {
        Ok(AuctionRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            end_time: row.get(2)?,
            is_complete: row.get(3)?,
            last_fetch_time: row.get(4)?,
        })
    }

    fn equip_from_row(row: &Row<'_>) -> rusqlite::Result<(EquipRecord, String)> {
        let stats_json: String = row.get(7)?;
        Ok((
            EquipRecord {
                item_code: row.get(0)?,
                auction_id: row.get(1)?,
                name: row.get(2)?,
                eid: row.get(3)?,
                key: row.get(4)?,
                is_isekai: row.get(5)?,
                level: row.get(6)?,
                stats: BTreeMap::new(),
                price: row.get(8)?,
                bid_link: row.get(9)?,
                buyer: row.get(10)?,
                seller: row.get(11)?,
            },
            stats_json,
        ))
    }
}

impl Storage for SqliteStorage {
    // ===== Auctions =====

    fn insert_auction_stub(&mut self, stub: &AuctionStub) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO auctions (id, title, end_time, is_complete, last_fetch_time)
             VALUES (?1, ?2, ?3, NULL, NULL)",
            params![stub.id, stub.title, stub.end_time],
        )?;
        Ok(changed > 0)
    }

    fn get_auction(&self, id: &str) -> StorageResult<Option<AuctionRecord>> {
        let auction = self
            .conn
            .query_row(
                "SELECT id, title, end_time, is_complete, last_fetch_time
                 FROM auctions WHERE id = ?1",
                params![id],
                Self::auction_from_row,
            )
            .optional()?;

        Ok(auction)
    }

    fn pending_auctions(&self) -> StorageResult<Vec<AuctionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, end_time, is_complete, last_fetch_time
             FROM auctions
             WHERE last_fetch_time IS NULL
                OR is_complete IS NULL
                OR is_complete = 0
             ORDER BY end_time",
        )?;

        let auctions = stmt
            .query_map([], Self::auction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(auctions)
    }

    fn record_fetch(&mut self, id: &str, is_complete: bool, fetched_at: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE auctions SET is_complete = ?1, last_fetch_time = ?2 WHERE id = ?3",
            params![is_complete, fetched_at, id],
        )?;

        if changed == 0 {
            return Err(StorageError::AuctionNotFound(id.to_string()));
        }

        Ok(())
    }

    // ===== Page commits =====

    fn commit_page(&mut self, auction_id: &str, items: &[PageItem]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        for item in items {
            match item {
                PageItem::Equip(equip) => {
                    let stats_json = serde_json::to_string(&equip.stats)
                        .map_err(|e| StorageError::Serialization(e.to_string()))?;

                    tx.execute(
                        "INSERT OR REPLACE INTO equip_items
                         (item_code, auction_id, name, eid, key, is_isekai, level, stats,
                          price, bid_link, buyer, seller)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                        params![
                            equip.item_code,
                            auction_id,
                            equip.name,
                            equip.eid,
                            equip.key,
                            equip.is_isekai,
                            equip.level,
                            stats_json,
                            equip.price,
                            equip.bid_link,
                            equip.buyer,
                            equip.seller,
                        ],
                    )?;

                    tx.execute(
                        "DELETE FROM parse_failures WHERE item_code = ?1 AND auction_id = ?2",
                        params![equip.item_code, auction_id],
                    )?;
                }

                PageItem::Material(mat) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO material_items
                         (item_code, auction_id, name, quantity, unit_price,
                          price, bid_link, buyer, seller)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            mat.item_code,
                            auction_id,
                            mat.name,
                            mat.quantity,
                            mat.unit_price,
                            mat.price,
                            mat.bid_link,
                            mat.buyer,
                            mat.seller,
                        ],
                    )?;

                    tx.execute(
                        "DELETE FROM parse_failures WHERE item_code = ?1 AND auction_id = ?2",
                        params![mat.item_code, auction_id],
                    )?;
                }

                PageItem::Failed(failure) => {
                    // A failure stands in for the row, so stale successes
                    // for the key must not survive it.
                    tx.execute(
                        "DELETE FROM equip_items WHERE item_code = ?1 AND auction_id = ?2",
                        params![failure.item_code, auction_id],
                    )?;
                    tx.execute(
                        "DELETE FROM material_items WHERE item_code = ?1 AND auction_id = ?2",
                        params![failure.item_code, auction_id],
                    )?;
                    tx.execute(
                        "INSERT OR REPLACE INTO parse_failures
                         (item_code, auction_id, summary, raw_html)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            failure.item_code,
                            auction_id,
                            failure.summary,
                            failure.raw_html,
                        ],
                    )?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    // ===== Row lookups =====

    fn get_equip(&self, item_code: &str, auction_id: &str) -> StorageResult<Option<EquipRecord>> {
        let found = self
            .conn
            .query_row(
                "SELECT item_code, auction_id, name, eid, key, is_isekai, level, stats,
                        price, bid_link, buyer, seller
                 FROM equip_items WHERE item_code = ?1 AND auction_id = ?2",
                params![item_code, auction_id],
                Self::equip_from_row,
            )
            .optional()?;

        match found {
            Some((mut equip, stats_json)) => {
                equip.stats = serde_json::from_str(&stats_json)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(equip))
            }
            None => Ok(None),
        }
    }

    fn get_material(
        &self,
        item_code: &str,
        auction_id: &str,
    ) -> StorageResult<Option<MaterialRecord>> {
        let material = self
            .conn
            .query_row(
                "SELECT item_code, auction_id, name, quantity, unit_price,
                        price, bid_link, buyer, seller
                 FROM material_items WHERE item_code = ?1 AND auction_id = ?2",
                params![item_code, auction_id],
                |row| {
                    Ok(MaterialRecord {
                        item_code: row.get(0)?,
                        auction_id: row.get(1)?,
                        name: row.get(2)?,
                        quantity: row.get(3)?,
                        unit_price: row.get(4)?,
                        price: row.get(5)?,
                        bid_link: row.get(6)?,
                        buyer: row.get(7)?,
                        seller: row.get(8)?,
                    })
                },
            )
            .optional()?;

        Ok(material)
    }

    fn get_failure(
        &self,
        item_code: &str,
        auction_id: &str,
    ) -> StorageResult<Option<FailureRecord>> {
        let failure = self
            .conn
            .query_row(
                "SELECT item_code, auction_id, summary, raw_html
                 FROM parse_failures WHERE item_code = ?1 AND auction_id = ?2",
                params![item_code, auction_id],
                |row| {
                    Ok(FailureRecord {
                        item_code: row.get(0)?,
                        auction_id: row.get(1)?,
                        summary: row.get(2)?,
                        raw_html: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(failure)
    }

    // ===== Statistics =====

    fn stats(&self) -> StorageResult<StoreStats> {
        let count = |sql: &str| -> StorageResult<u64> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        Ok(StoreStats {
            auctions: count("SELECT COUNT(*) FROM auctions")?,
            pending_auctions: count(
                "SELECT COUNT(*) FROM auctions
                 WHERE last_fetch_time IS NULL OR is_complete IS NULL OR is_complete = 0",
            )?,
            equips: count("SELECT COUNT(*) FROM equip_items")?,
            materials: count("SELECT COUNT(*) FROM material_items")?,
            failures: count("SELECT COUNT(*) FROM parse_failures")?,
        })
    }
}
