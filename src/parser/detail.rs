use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::error;

use super::{missing, text_of, ParseError};

static MAIN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("main").unwrap());
static SCROLL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.resp-scroll").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// The Pokédex entries table is the third scroll container on the page.
const ENTRY_SCROLL_INDEX: usize = 2;

/// Extract the first Pokédex entry text, or fail naming the missing piece.
pub fn find_entry(html: &str) -> Result<String, ParseError> {
    let doc = Html::parse_document(html);
    let main = doc.select(&MAIN).next().ok_or_else(|| missing("main"))?;
    let scroll = main
        .select(&SCROLL)
        .nth(ENTRY_SCROLL_INDEX)
        .ok_or_else(|| missing("third div.resp-scroll in main"))?;
    let row = scroll
        .select(&ROW)
        .next()
        .ok_or_else(|| missing("entry table row"))?;
    let cell = row
        .select(&CELL)
        .next()
        .ok_or_else(|| missing("entry table cell"))?;
    Ok(text_of(cell))
}

/// Best-effort entry text: empty when the page doesn't have the expected shape.
pub fn parse_entry(html: &str) -> String {
    find_entry(html).unwrap_or_else(|e| {
        error!("Error extracting entry text: {}", e);
        String::new()
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulbasaur_entry() {
        let html = std::fs::read_to_string("tests/fixtures/detail.html").unwrap();
        assert_eq!(
            parse_entry(&html),
            "A strange seed was planted on its back at birth. The plant sprouts and grows with this Pokémon."
        );
    }

    #[test]
    fn missing_main_falls_back_to_empty() {
        assert_eq!(parse_entry("<html><body><p>gone</p></body></html>"), "");
    }

    #[test]
    fn too_few_scroll_containers_falls_back_to_empty() {
        let html = r#"<main>
            <div class="resp-scroll"><table><tr><td>base stats</td></tr></table></div>
            <div class="resp-scroll"><table><tr><td>moves</td></tr></table></div>
        </main>"#;
        assert_eq!(parse_entry(html), "");
        let err = find_entry(html).unwrap_err();
        assert!(err.to_string().contains("third div.resp-scroll"));
    }

    #[test]
    fn scroll_container_outside_main_is_ignored() {
        let html = r#"
            <div class="resp-scroll"><table><tr><td>outside</td></tr></table></div>
            <main>
              <div class="resp-scroll"></div>
              <div class="resp-scroll"></div>
              <div class="resp-scroll"><table><tr><th>Red</th><td>inside</td></tr></table></div>
            </main>"#;
        assert_eq!(find_entry(html).unwrap(), "inside");
    }

    #[test]
    fn header_only_row_has_no_cell() {
        let html = r#"<main>
            <div class="resp-scroll"></div>
            <div class="resp-scroll"></div>
            <div class="resp-scroll"><table><tr><th>Red</th></tr></table></div>
        </main>"#;
        assert!(matches!(find_entry(html), Err(ParseError::Structure(_))));
        assert_eq!(parse_entry(html), "");
    }
}
