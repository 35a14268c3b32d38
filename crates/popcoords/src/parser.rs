use scraper::{ElementRef, Html, Selector};

/// Location of the coordinates paragraph on a PoP detail page.
pub const COORDINATES_SELECTOR: &str = "body > div > div > main > section.mx-auto.max-w-4xl.space-y-8 > div > div > div:nth-child(1) > div:nth-child(3) > div > p:nth-child(2)";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("Coordinates element not found")]
    MissingCoordinates,
    #[error("Coordinates element is empty")]
    EmptyCoordinates,
}

pub fn parse_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pulls the coordinates text out of a PoP page. Only the first match counts.
pub fn parse_coordinates(html: &str, selector: &Selector) -> Result<String, ParseError> {
    let document = Html::parse_document(html);
    let element = document
        .select(selector)
        .next()
        .ok_or(ParseError::MissingCoordinates)?;

    let coordinates = normalize_whitespace(&elem_text(element));
    if coordinates.is_empty() {
        return Err(ParseError::EmptyCoordinates);
    }
    Ok(coordinates)
}
