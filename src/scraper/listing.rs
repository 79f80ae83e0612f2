//! Auction index parsing
//!
//! The index page lists one auction per table row: the title in the first
//! cell, an end date in a fixed `MM-DD-YYYY` column, and a thread link
//! whose `showtopic` parameter carries the stable auction id. A malformed
//! row fails on its own; the caller still processes the rest of the page.

use crate::storage::AuctionStub;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;

static SHOWTOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"showtopic=(\d+)").expect("showtopic pattern is valid")
});

/// Errors for a single malformed listing row
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingRowError {
    #[error("listing row has {found} cells, expected 6")]
    CellCount { found: usize },

    #[error("listing row has no thread link")]
    MissingThreadLink,

    #[error("thread link carries no auction id: {0:?}")]
    BadThreadLink(String),

    #[error("unparseable end date: {0:?}")]
    BadDate(String),
}

/// Parses the auction index page into per-row results
///
/// Each visible row yields either an auction stub or a row-local error;
/// one bad row never hides its neighbors.
pub fn parse_listing(html: &str) -> Vec<Result<AuctionStub, ListingRowError>> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tbody > tr").expect("row selector is valid");
    let cell_selector = Selector::parse("td").expect("cell selector is valid");
    let link_selector = Selector::parse("a").expect("link selector is valid");

    document
        .select(&row_selector)
        .map(|row| {
            let cells: Vec<_> = row.select(&cell_selector).collect();
            if cells.len() != 6 {
                return Err(ListingRowError::CellCount { found: cells.len() });
            }

            let title = cell_text(&cells[0]);
            let end_time = parse_end_date(&cell_text(&cells[1]))?;

            let href = cells[5]
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .ok_or(ListingRowError::MissingThreadLink)?;

            let id = SHOWTOPIC
                .captures(href)
                .map(|caps| caps[1].to_string())
                .ok_or_else(|| ListingRowError::BadThreadLink(href.to_string()))?;

            Ok(AuctionStub {
                id,
                title,
                end_time,
            })
        })
        .collect()
}

/// Parses the fixed `MM-DD-YYYY` end-date column as UTC midnight
fn parse_end_date(text: &str) -> Result<i64, ListingRowError> {
    let date = NaiveDate::parse_from_str(text, "%m-%d-%Y")
        .map_err(|_| ListingRowError::BadDate(text.to_string()))?;

    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| ListingRowError::BadDate(text.to_string()))
}

fn cell_text(cell: &scraper::ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
