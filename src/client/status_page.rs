//! Status-page extraction
//!
//! The `/main` page is generated HTML and varies subtly between
//! firmware revisions, so extraction is deliberately forgiving: both
//! entry points are pure, total functions over the document. Malformed
//! or missing fragments degrade to omitted fields; a completely
//! unparseable document yields an empty outlet list and all-`None`
//! metrics, never an error. Partial data beats a hard failure here.

use crate::client::{DeviceMetrics, OutletInfo};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

static OUTLET_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.grid-grey > div.grid-block").expect("static selector"));
static OUTLET_INDEX: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".grid-index-label > span").expect("static selector"));
static OUTLET_NAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.grid-list > li.grid-head").expect("static selector"));
static OUTLET_TOGGLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input[id^='outlet']").expect("static selector"));
static OUTLET_STATS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[style*='margin-top'] p").expect("static selector"));
static TOTALS_CELL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.grid-block div.grid-text ul.primary-text li table td")
        .expect("static selector")
});
static VOLTAGE_SPAN: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.grid-block[style*='background'] span").expect("static selector"));

/// Parse the outlet cards out of a status page.
///
/// Each outlet is one repeated layout block; a block missing its index
/// label, name label or toggle control is skipped. The result is sorted
/// ascending by outlet number regardless of document order, and a
/// duplicated number keeps the first block encountered.
pub fn parse_outlets(html: &str) -> Vec<OutletInfo> {
    let document = Html::parse_document(html);
    let mut outlets = Vec::new();
    let mut seen = HashSet::new();

    for block in document.select(&OUTLET_BLOCK) {
        let (Some(index_el), Some(name_el), Some(toggle_el)) = (
            block.select(&OUTLET_INDEX).next(),
            block.select(&OUTLET_NAME).next(),
            block.select(&OUTLET_TOGGLE).next(),
        ) else {
            continue;
        };

        let Ok(number) = element_text(&index_el).parse::<u32>() else {
            continue;
        };
        if number == 0 || !seen.insert(number) {
            continue;
        }

        // checked and disabled are independent markers: an outlet can
        // be powered yet locked to reset-only control.
        let is_on = toggle_el.value().attr("checked").is_some();
        let is_reset_only = toggle_el.value().attr("disabled").is_some();

        let mut stats = block.select(&OUTLET_STATS);
        let watts = stats.next().and_then(|p| parse_reading(&element_text(&p), 'W'));
        let amps = stats.next().and_then(|p| parse_reading(&element_text(&p), 'A'));

        outlets.push(OutletInfo {
            number,
            name: element_text(&name_el),
            is_on,
            is_reset_only,
            watts,
            amps,
        });
    }

    outlets.sort_unstable_by_key(|o| o.number);
    outlets
}

/// Parse the aggregate metrics out of a status page.
///
/// Totals come from the cell labeled with both POWER and CURRENT; its
/// paired sibling cell holds the watt and amp lines. Voltage comes
/// from the first suffixed value in the highlighted block. Each field
/// is omitted independently when its fragment is missing or does not
/// parse.
pub fn parse_metrics(html: &str) -> DeviceMetrics {
    let document = Html::parse_document(html);

    let mut total_watts = None;
    let mut total_amps = None;
    for cell in document.select(&TOTALS_CELL) {
        let label = text_lines(&cell).join(" ");
        if label.contains("POWER") && label.contains("CURRENT") {
            if let Some(values) = next_sibling_cell(&cell) {
                let lines = text_lines(&values);
                if lines.len() >= 2 {
                    total_watts = parse_reading(&lines[0], 'W');
                    total_amps = parse_reading(&lines[1], 'A');
                }
            }
            break;
        }
    }

    let mut voltage = None;
    for span in document.select(&VOLTAGE_SPAN) {
        let text = element_text(&span);
        if text.ends_with('V') {
            voltage = parse_reading(&text, 'V');
            break;
        }
    }

    DeviceMetrics {
        voltage,
        total_watts,
        total_amps,
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Collect the non-empty text lines of an element, splitting both
/// between text nodes and on embedded newlines
fn text_lines(el: &ElementRef) -> Vec<String> {
    el.text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn next_sibling_cell<'a>(cell: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    cell.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")
}

/// Parse a numeric reading, stripping a trailing unit suffix.
/// Anything that does not parse as a float is reported as absent.
fn parse_reading(text: &str, unit: char) -> Option<f64> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix(unit).unwrap_or(trimmed).trim();
    trimmed.parse().ok()
}
