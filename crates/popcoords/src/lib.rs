pub mod codes;
mod parser;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod scraper;
pub mod types;

pub use parser::{COORDINATES_SELECTOR, ParseError};
pub use pipeline::{PipelineError, PipelineOptions};
pub use scraper::{FetchError, ScraperConfig, ScraperError, WebScraper};

pub(crate) const BASE_URL: &str = "https://mining.cloudflare.manfredi.io/pops/";
