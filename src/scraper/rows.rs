//! Per-auction item-row classification and parsing
//!
//! An item-list page is a table of six-cell rows: code, name, info,
//! current-bid, next-bid, seller. Each cell exposes its display text and
//! an optional embedded link target, since the bid link and the bid price
//! (and likewise the equip name and its detail link) are consumed
//! independently downstream.
//!
//! Classification is ordered: quirk rewrites first (a closed allow-list
//! of known markup anomalies), then the code-prefix rule routing `Mat*`
//! codes to the material parser and everything else to the equip parser.
//! Every row parses independently; a failing row becomes a stored parse
//! failure, never an aborted batch.

use crate::scraper::quirks::apply_quirks;
use crate::storage::{EquipRecord, FailureRecord, MaterialRecord, PageItem};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use thiserror::Error;

/// Code prefix routing a row to the material parser
pub const MATERIAL_PREFIX: &str = "Mat";

/// Marker text proving the auction has ended
const ENDED_MARKER: &str = "Auction ended";

// Cell positions within an item row
pub const CODE: usize = 0;
pub const NAME: usize = 1;
pub const INFO: usize = 2;
pub const CURRENT_BID: usize = 3;
pub const SELLER: usize = 5;

// e.g. "1803k (sickentide #66.5)"
static PRICE_BUYER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+[mkc]) \((.*) #[\d.]+\)$").expect("price/buyer pattern is valid")
});

// e.g. "30 Binding of Slaughter"
static QUANT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+) (.*)$").expect("quantity/name pattern is valid"));

// e.g. "455, MDB 36%, Holy EDB 73%"
static LEVEL_STATS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+|Unassigned|n/a)(?:, (.*))?$").expect("level/stats pattern is valid")
});

// e.g. http://hentaiverse.org/equip/123487856/579b582136
static EQUIP_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)hentaiverse\.org/(isekai/)?equip/(\d+)/([A-Za-z0-9]{10})")
        .expect("equip link pattern is valid")
});

// legacy form -- http://hentaiverse.org/pages/showequip.php?eid=...&key=...
static LEGACY_EID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)eid=(\d+)").expect("eid pattern is valid"));
static LEGACY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)key=([A-Za-z0-9]{10})").expect("key pattern is valid"));

/// One table cell: display text plus optional embedded link target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub link: Option<String>,
}

impl Cell {
    pub fn new(text: impl Into<String>, link: Option<String>) -> Self {
        Self {
            text: text.into(),
            link,
        }
    }
}

/// One extracted item row with its raw markup kept for failure capture
#[derive(Debug, Clone)]
pub struct ItemRow {
    pub cells: Vec<Cell>,
    pub raw_html: String,
}

/// An extracted item-list page
#[derive(Debug)]
pub struct AuctionPage {
    /// Whether the page carries the fixed "auction ended" marker
    pub ended: bool,

    pub rows: Vec<ItemRow>,
}

/// Errors for a single unparseable item row
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {found} cells, expected 6")]
    CellCount { found: usize },

    #[error("unparseable bid cell: {0:?}")]
    BadBid(String),

    #[error("sold bid cell has no link")]
    MissingBidLink,

    #[error("unparseable price: {0:?}")]
    BadPrice(String),

    #[error("unparseable material name cell: {0:?}")]
    BadMaterialName(String),

    #[error("material quantity must be positive: {0:?}")]
    BadQuantity(String),

    #[error("equip name cell has no detail link")]
    MissingEquipLink,

    #[error("unrecognized equip link: {0:?}")]
    BadEquipLink(String),

    #[error("unparseable info cell: {0:?}")]
    BadInfo(String),
}

/// Parsed bid state shared by both row kinds
///
/// Price, buyer, and bid link are jointly present (sold) or jointly
/// absent (unsold); any disagreement is a parse error upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bid {
    price: Option<i64>,
    buyer: Option<String>,
    link: Option<String>,
}

/// Extracts the ended marker and all item rows from a page
///
/// Pure markup extraction; classification and parsing happen per row in
/// [`parse_item_row`]. Parsing is synchronous so no parsed DOM ever
/// crosses an await point.
pub fn parse_auction_page(html: &str) -> AuctionPage {
    let document = Html::parse_document(html);
    let timing_selector = Selector::parse("#timing").expect("timing selector is valid");
    let row_selector = Selector::parse("tbody > tr").expect("row selector is valid");
    let cell_selector = Selector::parse("td").expect("cell selector is valid");
    let link_selector = Selector::parse("a").expect("link selector is valid");

    let ended = document
        .select(&timing_selector)
        .next()
        .map(|el| el.text().collect::<String>().contains(ENDED_MARKER))
        .unwrap_or(false);

    let rows = document
        .select(&row_selector)
        .map(|row| {
            let cells = row
                .select(&cell_selector)
                .map(|cell| {
                    let text = cell.text().collect::<String>().trim().to_string();
                    let link = cell
                        .select(&link_selector)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .map(String::from);
                    Cell { text, link }
                })
                .collect();

            ItemRow {
                cells,
                raw_html: row.html(),
            }
        })
        .collect();

    AuctionPage { ended, rows }
}

/// Classifies and parses one item row into a persistable outcome
///
/// Quirk rewrites run first, then the code-prefix rule picks the parser.
/// A parse failure is captured with the row's code and raw markup; the
/// `ordinal` only keys rows whose code cell itself is unreadable.
pub fn parse_item_row(auction_id: &str, row: &mut ItemRow, ordinal: usize) -> PageItem {
    apply_quirks(auction_id, row);

    let item_code = row
        .cells
        .first()
        .filter(|cell| !cell.text.is_empty())
        .map(|cell| cell.text.clone())
        .unwrap_or_else(|| format!("row{}", ordinal));

    match classify_and_parse(auction_id, row) {
        Ok(item) => item,
        Err(err) => {
            tracing::warn!(
                "Row {} in auction {} failed to parse: {}",
                item_code,
                auction_id,
                err
            );
            PageItem::Failed(FailureRecord {
                item_code,
                auction_id: auction_id.to_string(),
                summary: err.to_string(),
                raw_html: row.raw_html.clone(),
            })
        }
    }
}

fn classify_and_parse(auction_id: &str, row: &ItemRow) -> Result<PageItem, RowError> {
    if row.cells.len() != 6 {
        return Err(RowError::CellCount {
            found: row.cells.len(),
        });
    }

    if row.cells[CODE].text.starts_with(MATERIAL_PREFIX) {
        Ok(PageItem::Material(parse_material_row(auction_id, row)?))
    } else {
        Ok(PageItem::Equip(parse_equip_row(auction_id, row)?))
    }
}

/// Parses a material row: `"<quantity> <name>"` plus the shared bid cell
fn parse_material_row(auction_id: &str, row: &ItemRow) -> Result<MaterialRecord, RowError> {
    let name_text = &row.cells[NAME].text;
    let caps = QUANT_NAME
        .captures(name_text)
        .ok_or_else(|| RowError::BadMaterialName(name_text.clone()))?;

    let quantity: i64 = caps[1]
        .parse()
        .map_err(|_| RowError::BadQuantity(caps[1].to_string()))?;
    if quantity < 1 {
        return Err(RowError::BadQuantity(caps[1].to_string()));
    }

    let bid = parse_bid_cell(&row.cells[CURRENT_BID])?;
    let unit_price = bid.price.map(|p| p as f64 / quantity as f64);

    Ok(MaterialRecord {
        item_code: row.cells[CODE].text.clone(),
        auction_id: auction_id.to_string(),
        name: caps[2].to_string(),
        quantity,
        unit_price,
        price: bid.price,
        bid_link: bid.link,
        buyer: bid.buyer,
        seller: row.cells[SELLER].text.clone(),
    })
}

/// Parses an equip row: detail link, optional level/stats, shared bid cell
fn parse_equip_row(auction_id: &str, row: &ItemRow) -> Result<EquipRecord, RowError> {
    let link = row.cells[NAME]
        .link
        .as_deref()
        .ok_or(RowError::MissingEquipLink)?;
    let (eid, key, is_isekai) =
        parse_equip_link(link).ok_or_else(|| RowError::BadEquipLink(link.to_string()))?;

    let (level, stats) = parse_info_cell(&row.cells[INFO].text)?;
    let bid = parse_bid_cell(&row.cells[CURRENT_BID])?;

    Ok(EquipRecord {
        item_code: row.cells[CODE].text.clone(),
        auction_id: auction_id.to_string(),
        name: row.cells[NAME].text.clone(),
        eid,
        key,
        is_isekai,
        level,
        stats,
        price: bid.price,
        bid_link: bid.link,
        buyer: bid.buyer,
        seller: row.cells[SELLER].text.clone(),
    })
}

/// Parses the shared current-bid cell
///
/// Sold rows match `"<price><unit> (<buyer> #<lot>)"` and must also carry
/// the bid link on the cell; the literal `"0"` means unsold and maps all
/// three fields to None. Anything else is a parse error.
fn parse_bid_cell(cell: &Cell) -> Result<Bid, RowError> {
    if cell.text == "0" {
        return Ok(Bid {
            price: None,
            buyer: None,
            link: None,
        });
    }

    let caps = PRICE_BUYER
        .captures(&cell.text)
        .ok_or_else(|| RowError::BadBid(cell.text.clone()))?;

    let price = price_to_int(&caps[1])?;
    let link = cell.link.clone().ok_or(RowError::MissingBidLink)?;

    Ok(Bid {
        price: Some(price),
        buyer: Some(caps[2].to_string()),
        link: Some(link),
    })
}

/// Converts a suffixed price token to its numeric value
///
/// Units: `c` = 1, `k` = 1,000, `m` = 1,000,000. Commas and surrounding
/// whitespace are tolerated; a bare number means the smallest unit.
pub fn price_to_int(text: &str) -> Result<i64, RowError> {
    let cleaned = text.replace(',', "");
    let cleaned = cleaned.trim();

    let (digits, mult) = match cleaned.chars().last() {
        Some('c') => (&cleaned[..cleaned.len() - 1], 1),
        Some('k') => (&cleaned[..cleaned.len() - 1], 1_000),
        Some('m') => (&cleaned[..cleaned.len() - 1], 1_000_000),
        Some(c) if c.is_ascii_digit() => (cleaned, 1),
        _ => return Err(RowError::BadPrice(text.to_string())),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(RowError::BadPrice(text.to_string()));
    }

    let base: i64 = digits
        .parse()
        .map_err(|_| RowError::BadPrice(text.to_string()))?;
    Ok(base * mult)
}

/// Extracts `(eid, key, is_isekai)` from an equip detail link
///
/// Two shapes are accepted, matched case-insensitively: the modern path
/// form `.../(isekai/)?equip/<eid>/<key>` and the legacy query form
/// `...showequip.php?eid=...&key=...`.
pub fn parse_equip_link(href: &str) -> Option<(i64, String, bool)> {
    if let Some(caps) = EQUIP_LINK.captures(href) {
        let is_isekai = caps.get(1).is_some();
        let eid: i64 = caps[2].parse().ok()?;
        return Some((eid, caps[3].to_string(), is_isekai));
    }

    let eid = LEGACY_EID.captures(href)?;
    let key = LEGACY_KEY.captures(href)?;
    let is_isekai = href.contains("/isekai/");
    let eid: i64 = eid[1].parse().ok()?;
    Some((eid, key[1].to_string(), is_isekai))
}

/// Parses the info cell into a level and a stat map
///
/// An empty cell means the seller provided no info: level None, empty
/// stats, not an error. Otherwise the cell must match
/// `"<level-or-sentinel>(, <stat> <value>)*"`; `Unassigned` is stored as
/// level 0 and `n/a` as no level. Each stat entry splits on its trailing
/// whitespace token: the value is the last token, the name the rest.
#[allow(clippy::type_complexity)]
pub fn parse_info_cell(text: &str) -> Result<(Option<i64>, BTreeMap<String, String>), RowError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok((None, BTreeMap::new()));
    }

    let caps = LEVEL_STATS
        .captures(text)
        .ok_or_else(|| RowError::BadInfo(text.to_string()))?;

    let level = match &caps[1] {
        "Unassigned" => Some(0),
        "n/a" => None,
        digits => Some(
            digits
                .parse()
                .map_err(|_| RowError::BadInfo(text.to_string()))?,
        ),
    };

    let mut stats = BTreeMap::new();
    if let Some(rest) = caps.get(2) {
        for entry in rest.as_str().split(',') {
            let entry = entry.trim();
            let (name, value) = entry
                .rsplit_once(' ')
                .ok_or_else(|| RowError::BadInfo(text.to_string()))?;
            stats.insert(name.trim().to_string(), value.trim().to_string());
        }
    }

    Ok((level, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str) -> Cell {
        Cell::new(text, None)
    }

    fn linked_cell(text: &str, link: &str) -> Cell {
        Cell::new(text, Some(link.to_string()))
    }

    fn row(cells: Vec<Cell>) -> ItemRow {
        ItemRow {
            cells,
            raw_html: "<tr>raw</tr>".to_string(),
        }
    }

    fn equip_row(code: &str, bid: Cell) -> ItemRow {
        row(vec![
            cell(code),
            linked_cell(
                "Peerless Staff",
                "https://hentaiverse.org/equip/123487856/579b582136",
            ),
            cell("455, MDB 36%, Holy EDB 73%"),
            bid,
            cell("500k"),
            cell("Super"),
        ])
    }

    // ===== bid cell =====

    #[test]
    fn test_bid_zero_means_unsold() {
        let bid = parse_bid_cell(&cell("0")).unwrap();
        assert_eq!(bid.price, None);
        assert_eq!(bid.buyer, None);
        assert_eq!(bid.link, None);
    }

    #[test]
    fn test_bid_sold_shapes() {
        let bid = parse_bid_cell(&linked_cell("500k (Foo #1.2)", "https://f/1")).unwrap();
        assert_eq!(bid.price, Some(500_000));
        assert_eq!(bid.buyer, Some("Foo".to_string()));
        assert_eq!(bid.link, Some("https://f/1".to_string()));

        let bid = parse_bid_cell(&linked_cell("2m (Bar #3)", "https://f/2")).unwrap();
        assert_eq!(bid.price, Some(2_000_000));

        let bid = parse_bid_cell(&linked_cell("750c (Baz #1.1)", "https://f/3")).unwrap();
        assert_eq!(bid.price, Some(750));
    }

    #[test]
    fn test_bid_sold_without_link_is_error() {
        let result = parse_bid_cell(&cell("500k (Foo #1.2)"));
        assert_eq!(result, Err(RowError::MissingBidLink));
    }

    #[test]
    fn test_bid_garbage_is_error() {
        assert!(matches!(
            parse_bid_cell(&cell("sold to someone")),
            Err(RowError::BadBid(_))
        ));
        // Not the literal "0"
        assert!(matches!(
            parse_bid_cell(&cell("00")),
            Err(RowError::BadBid(_))
        ));
    }

    // ===== prices =====

    #[test]
    fn test_price_units() {
        assert_eq!(price_to_int("750c").unwrap(), 750);
        assert_eq!(price_to_int("500k").unwrap(), 500_000);
        assert_eq!(price_to_int("2m").unwrap(), 2_000_000);
        assert_eq!(price_to_int("1803k").unwrap(), 1_803_000);
        assert_eq!(price_to_int("42").unwrap(), 42);
        assert_eq!(price_to_int("1,500k").unwrap(), 1_500_000);
    }

    #[test]
    fn test_price_rejects_garbage() {
        assert!(price_to_int("").is_err());
        assert!(price_to_int("k").is_err());
        assert!(price_to_int("12x").is_err());
        assert!(price_to_int("1.5k").is_err());
    }

    // ===== equip links =====

    #[test]
    fn test_equip_link_modern() {
        let parsed =
            parse_equip_link("https://hentaiverse.org/equip/123487856/579b582136").unwrap();
        assert_eq!(parsed, (123487856, "579b582136".to_string(), false));
    }

    #[test]
    fn test_equip_link_modern_isekai() {
        let parsed =
            parse_equip_link("https://hentaiverse.org/isekai/equip/123487856/579b582136").unwrap();
        assert_eq!(parsed, (123487856, "579b582136".to_string(), true));
    }

    #[test]
    fn test_equip_link_case_insensitive() {
        let parsed =
            parse_equip_link("HTTPS://HentaiVerse.org/EQUIP/123487856/579B582136").unwrap();
        assert_eq!(parsed.0, 123487856);
    }

    #[test]
    fn test_equip_link_legacy() {
        let parsed = parse_equip_link(
            "http://hentaiverse.org/pages/showequip.php?eid=123487856&key=579b582136",
        )
        .unwrap();
        assert_eq!(parsed, (123487856, "579b582136".to_string(), false));
    }

    #[test]
    fn test_equip_link_unrecognized() {
        assert_eq!(parse_equip_link("https://example.com/other"), None);
    }

    // ===== info cell =====

    #[test]
    fn test_info_level_and_stats() {
        let (level, stats) = parse_info_cell("455, MDB 36%, Holy EDB 73%").unwrap();
        assert_eq!(level, Some(455));
        assert_eq!(stats.get("MDB"), Some(&"36%".to_string()));
        assert_eq!(stats.get("Holy EDB"), Some(&"73%".to_string()));
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_info_unassigned_is_level_zero() {
        let (level, stats) = parse_info_cell("Unassigned").unwrap();
        assert_eq!(level, Some(0));
        assert!(stats.is_empty());
    }

    #[test]
    fn test_info_na_is_no_level() {
        let (level, stats) = parse_info_cell("n/a").unwrap();
        assert_eq!(level, None);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_info_empty_is_not_an_error() {
        let (level, stats) = parse_info_cell("").unwrap();
        assert_eq!(level, None);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_info_garbage_is_error() {
        assert!(parse_info_cell("weird text").is_err());
    }

    // ===== full rows =====

    #[test]
    fn test_material_row_sold() {
        let mut r = row(vec![
            cell("Mat03"),
            cell("30 Binding of Slaughter"),
            cell(""),
            linked_cell("90k (Foo #1.2)", "https://f/9"),
            cell("95k"),
            cell("Super"),
        ]);

        let item = parse_item_row("194262", &mut r, 0);
        match item {
            PageItem::Material(mat) => {
                assert_eq!(mat.name, "Binding of Slaughter");
                assert_eq!(mat.quantity, 30);
                assert_eq!(mat.price, Some(90_000));
                assert_eq!(mat.unit_price, Some(3000.0));
                assert_eq!(mat.buyer, Some("Foo".to_string()));
                assert_eq!(mat.seller, "Super");
            }
            other => panic!("expected material, got {:?}", other),
        }
    }

    #[test]
    fn test_material_row_unsold() {
        let mut r = row(vec![
            cell("Mat01"),
            cell("5 Crystal"),
            cell(""),
            cell("0"),
            cell("10k"),
            cell("Super"),
        ]);

        match parse_item_row("1", &mut r, 0) {
            PageItem::Material(mat) => {
                assert_eq!(mat.price, None);
                assert_eq!(mat.unit_price, None);
                assert_eq!(mat.buyer, None);
                assert_eq!(mat.bid_link, None);
            }
            other => panic!("expected material, got {:?}", other),
        }
    }

    #[test]
    fn test_material_name_without_quantity_fails() {
        let mut r = row(vec![
            cell("Mat01"),
            cell("Crystal"),
            cell(""),
            cell("0"),
            cell("10k"),
            cell("Super"),
        ]);

        match parse_item_row("1", &mut r, 0) {
            PageItem::Failed(failure) => {
                assert_eq!(failure.item_code, "Mat01");
                assert!(failure.summary.contains("material name"));
                assert_eq!(failure.raw_html, "<tr>raw</tr>");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_equip_row_parses() {
        let mut r = equip_row("Staff00", linked_cell("500k (Foo #1.2)", "https://f/1"));

        match parse_item_row("1", &mut r, 0) {
            PageItem::Equip(equip) => {
                assert_eq!(equip.item_code, "Staff00");
                assert_eq!(equip.eid, 123487856);
                assert_eq!(equip.key, "579b582136");
                assert!(!equip.is_isekai);
                assert_eq!(equip.level, Some(455));
                assert_eq!(equip.stats.len(), 2);
                assert_eq!(equip.price, Some(500_000));
                assert_eq!(equip.buyer, Some("Foo".to_string()));
            }
            other => panic!("expected equip, got {:?}", other),
        }
    }

    #[test]
    fn test_equip_row_without_link_fails() {
        let mut r = equip_row("Staff00", cell("0"));
        r.cells[NAME].link = None;

        assert!(matches!(
            parse_item_row("1", &mut r, 0),
            PageItem::Failed(_)
        ));
    }

    #[test]
    fn test_wrong_cell_count_fails() {
        let mut r = row(vec![cell("Staff00"), cell("x")]);
        match parse_item_row("1", &mut r, 0) {
            PageItem::Failed(failure) => {
                assert!(failure.summary.contains("cells"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_code_keys_by_ordinal() {
        let mut r = row(vec![]);
        match parse_item_row("1", &mut r, 7) {
            PageItem::Failed(failure) => assert_eq!(failure.item_code, "row7"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    // ===== page extraction =====

    #[test]
    fn test_parse_auction_page_ended_marker() {
        let html = r#"<html><body>
            <div id="timing">Auction ended 3 days ago</div>
            <table><tbody></tbody></table>
        </body></html>"#;
        let page = parse_auction_page(html);
        assert!(page.ended);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn test_parse_auction_page_running() {
        let html = r#"<html><body>
            <div id="timing">Ends in 2 days</div>
            <table><tbody>
            <tr><td>Mat01</td><td>5 Crystal</td><td></td><td>0</td><td>10k</td><td>Super</td></tr>
            </tbody></table>
        </body></html>"#;
        let page = parse_auction_page(html);
        assert!(!page.ended);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].cells.len(), 6);
        assert_eq!(page.rows[0].cells[CODE].text, "Mat01");
    }

    #[test]
    fn test_parse_auction_page_missing_marker_element() {
        let page = parse_auction_page("<html><body></body></html>");
        assert!(!page.ended);
    }

    #[test]
    fn test_page_cells_capture_links() {
        let html = r#"<html><body><table><tbody>
            <tr>
                <td>Staff00</td>
                <td><a href="https://hentaiverse.org/equip/1/abcdefghij">Staff</a></td>
                <td></td>
                <td><a href="https://f/1">500k (Foo #1.2)</a></td>
                <td>505k</td>
                <td>Super</td>
            </tr>
        </tbody></table></body></html>"#;
        let page = parse_auction_page(html);
        let cells = &page.rows[0].cells;
        assert_eq!(
            cells[NAME].link.as_deref(),
            Some("https://hentaiverse.org/equip/1/abcdefghij")
        );
        assert_eq!(cells[CURRENT_BID].link.as_deref(), Some("https://f/1"));
        assert_eq!(cells[CURRENT_BID].text, "500k (Foo #1.2)");
    }
}
