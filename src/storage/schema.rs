//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the lotkeeper
//! database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Auctions seen on the index page
CREATE TABLE IF NOT EXISTS auctions (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    end_time INTEGER NOT NULL,
    is_complete INTEGER,
    last_fetch_time INTEGER
);

-- Equip rows, replaced wholesale on each successful parse
CREATE TABLE IF NOT EXISTS equip_items (
    item_code TEXT NOT NULL,
    auction_id TEXT NOT NULL REFERENCES auctions(id),
    name TEXT NOT NULL,
    eid INTEGER NOT NULL,
    key TEXT NOT NULL,
    is_isekai INTEGER NOT NULL,
    level INTEGER,
    stats TEXT NOT NULL,
    price INTEGER,
    bid_link TEXT,
    buyer TEXT,
    seller TEXT NOT NULL,
    PRIMARY KEY (item_code, auction_id)
);

CREATE INDEX IF NOT EXISTS idx_equip_auction ON equip_items(auction_id);

-- Material rows, replaced wholesale on each successful parse
CREATE TABLE IF NOT EXISTS material_items (
    item_code TEXT NOT NULL,
    auction_id TEXT NOT NULL REFERENCES auctions(id),
    name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price REAL,
    price INTEGER,
    bid_link TEXT,
    buyer TEXT,
    seller TEXT NOT NULL,
    PRIMARY KEY (item_code, auction_id)
);

CREATE INDEX IF NOT EXISTS idx_material_auction ON material_items(auction_id);

-- Captured row-parse failures, present instead of an item row for the key
CREATE TABLE IF NOT EXISTS parse_failures (
    item_code TEXT NOT NULL,
    auction_id TEXT NOT NULL REFERENCES auctions(id),
    summary TEXT NOT NULL,
    raw_html TEXT NOT NULL,
    PRIMARY KEY (item_code, auction_id)
);

CREATE INDEX IF NOT EXISTS idx_failures_auction ON parse_failures(auction_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
