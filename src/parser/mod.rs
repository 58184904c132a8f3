pub mod detail;
pub mod listing;

use scraper::ElementRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// Markup no longer has the shape the selectors expect.
    #[error("page structure changed: {0}")]
    Structure(String),
}

fn missing(what: impl Into<String>) -> ParseError {
    ParseError::Structure(what.into())
}

/// Concatenated text content of an element.
fn text_of(el: ElementRef) -> String {
    el.text().collect()
}
