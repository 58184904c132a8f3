use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{missing, text_of, ParseError};
use crate::record::RawRow;

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table#pokedex").unwrap());
static TBODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static SMALL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("small").unwrap());

// number, name, type, then the seven stat columns
const CELLS_PER_ROW: usize = 10;

/// Parse the results table of the listing page into raw rows, in document order.
pub fn parse_listing(html: &str) -> Result<Vec<RawRow>, ParseError> {
    let doc = Html::parse_document(html);
    let table = doc
        .select(&TABLE)
        .next()
        .ok_or_else(|| missing("table#pokedex"))?;
    let body = table
        .select(&TBODY)
        .next()
        .ok_or_else(|| missing("table#pokedex tbody"))?;

    body.select(&ROW)
        .enumerate()
        .map(|(i, tr)| parse_row(i, tr))
        .collect()
}

fn parse_row(index: usize, tr: ElementRef) -> Result<RawRow, ParseError> {
    let cells: Vec<ElementRef> = tr.select(&CELL).collect();
    if cells.len() < CELLS_PER_ROW {
        return Err(missing(format!(
            "row {}: expected {} cells, found {}",
            index,
            CELLS_PER_ROW,
            cells.len()
        )));
    }

    let number = cells[0];
    let id = number
        .value()
        .attr("data-sort-value")
        .ok_or_else(|| missing(format!("row {}: data-sort-value on number cell", index)))?
        .to_string();
    let avatar = number
        .select(&IMG)
        .next()
        .and_then(|img| img.value().attr("src"))
        .ok_or_else(|| missing(format!("row {}: img src in number cell", index)))?
        .to_string();

    let name_cell = cells[1];
    let link = name_cell
        .select(&LINK)
        .next()
        .ok_or_else(|| missing(format!("row {}: link in name cell", index)))?;
    let details_path = link
        .value()
        .attr("href")
        .ok_or_else(|| missing(format!("row {}: href on name link", index)))?
        .to_string();
    // Regional and mega forms carry their short name in a <small> next to the link.
    let alt_name = name_cell.select(&SMALL).next().map(text_of);

    let types = cells[2].select(&LINK).map(text_of).collect();
    let stats = std::array::from_fn(|i| text_of(cells[3 + i]));

    Ok(RawRow {
        id,
        name: text_of(link),
        alt_name,
        avatar,
        details_path,
        types,
        stats,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn listing_rows_in_document_order() {
        let rows = parse_listing(&fixture("listing")).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "3", "3", "25"]);
    }

    #[test]
    fn bulbasaur_row_fields() {
        let rows = parse_listing(&fixture("listing")).unwrap();
        let bulbasaur = &rows[0];
        assert_eq!(bulbasaur.name, "Bulbasaur");
        assert_eq!(bulbasaur.alt_name, None);
        assert_eq!(bulbasaur.details_path, "/pokedex/bulbasaur");
        assert_eq!(
            bulbasaur.avatar,
            "https://img.pokemondb.net/sprites/scarlet-violet/icon/bulbasaur.png"
        );
        assert_eq!(bulbasaur.types, ["Grass", "Poison"]);
        assert_eq!(bulbasaur.stats, ["318", "45", "49", "49", "65", "65", "45"]);
    }

    #[test]
    fn mega_form_carries_alternate_name() {
        let rows = parse_listing(&fixture("listing")).unwrap();
        let mega = &rows[2];
        assert_eq!(mega.name, "Venusaur");
        assert_eq!(mega.alt_name.as_deref(), Some("Mega Venusaur"));
        assert_eq!(mega.details_path, "/pokedex/venusaur");
    }

    #[test]
    fn single_type_row() {
        let rows = parse_listing(&fixture("listing")).unwrap();
        assert_eq!(rows[3].types, ["Electric"]);
    }

    #[test]
    fn missing_table_is_structural_error() {
        let err = parse_listing("<html><body><table id=\"other\"></table></body></html>")
            .unwrap_err();
        assert!(err.to_string().contains("table#pokedex"));
    }

    #[test]
    fn short_row_is_structural_error() {
        let html = r#"<table id="pokedex"><tbody>
            <tr><td data-sort-value="1"><img src="a.png"></td><td><a href="/x">X</a></td></tr>
        </tbody></table>"#;
        let err = parse_listing(html).unwrap_err();
        assert!(err.to_string().contains("expected 10 cells, found 2"));
    }

    #[test]
    fn empty_body_yields_no_rows() {
        let html = r#"<table id="pokedex"><thead><tr><th>#</th></tr></thead><tbody></tbody></table>"#;
        assert!(parse_listing(html).unwrap().is_empty());
    }
}
