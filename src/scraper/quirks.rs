//! Known per-auction markup anomalies
//!
//! A closed allow-list of rewrites applied before classification. Each
//! entry targets one specific auction (or one observed markup defect) and
//! restores the shape the parsers expect; anything not listed here flows
//! through untouched and, if malformed, is captured as a parse failure.

use crate::scraper::rows::{ItemRow, CODE, INFO, NAME};

/// Applies known row rewrites for the given auction
pub fn apply_quirks(auction_id: &str, row: &mut ItemRow) {
    // Auction 194262 lists its first material without a quantity token.
    if auction_id == "194262"
        && row.cells.get(CODE).map(|c| c.text.as_str()) == Some("Mat00")
    {
        if let Some(name) = row.cells.get_mut(NAME) {
            name.text.insert_str(0, "1 ");
            tracing::info!("Applied quantity rewrite to 194262/Mat00");
        }
    }

    // Some sellers paste their own name into the info cell; the cell is
    // meaningless for stats and would otherwise poison the row.
    if let Some(info) = row.cells.get_mut(INFO) {
        if info.text.starts_with("seller: ") {
            tracing::info!(
                "Discarding seller-tagged info cell in auction {}: {:?}",
                auction_id,
                info.text
            );
            info.text.clear();
        }
    }
}
