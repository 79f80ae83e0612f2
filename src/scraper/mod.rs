//! Scraping pipeline: fetch, parse, classify
//!
//! Fetching is async and rate-limited; all markup parsing is synchronous
//! and returns owned records, so no parsed document is ever held across
//! an await point.

mod coordinator;
mod fetcher;
mod listing;
mod quirks;
mod rows;

pub use coordinator::Scraper;
pub use fetcher::{build_http_client, fetch_text};
pub use listing::{parse_listing, ListingRowError};
pub use rows::{
    parse_auction_page, parse_equip_link, parse_info_cell, parse_item_row, price_to_int,
    AuctionPage, Cell, ItemRow, RowError,
};
