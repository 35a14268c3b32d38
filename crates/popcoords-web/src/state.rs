use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use popcoords::codes::{default_codes, load_code_list};
use popcoords::pipeline::PipelineOptions;
use popcoords::render::{DEFAULT_WKHTMLTOPDF_PATH, WkhtmltopdfRenderer};
use popcoords::{ScraperConfig, WebScraper};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::generator::Generator;

/// Shared by every handler; cloning is an `Arc` bump.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<Generator>,
    /// Cancelled on shutdown; ends open `/logs` streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(generator: Generator, shutdown: CancellationToken) -> Self {
        Self {
            generator: Arc::new(generator),
            shutdown,
        }
    }

    pub fn from_config(config: &ServerConfig, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let codes = match &config.codes {
            Some(path) => load_code_list(path)?,
            None => default_codes(),
        };

        let mut scraper_config = ScraperConfig {
            timeout: config.timeout(),
            ..Default::default()
        };
        if let Some(base_url) = &config.base_url {
            scraper_config.base_url = base_url.clone();
        }
        let scraper = WebScraper::with_config(scraper_config).context("Failed to init scraper")?;

        let renderer = WkhtmltopdfRenderer::locate(config.wkhtmltopdf.as_deref())
            .unwrap_or_else(|e| {
                log::warn!("{e}; report generation will fail until it is installed");
                WkhtmltopdfRenderer::new(
                    config
                        .wkhtmltopdf
                        .clone()
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_WKHTMLTOPDF_PATH)),
                )
            });
        log::info!("Rendering with {}", renderer.binary_path().display());

        let options = PipelineOptions {
            delay: config.delay(),
            concurrency: usize::from(config.concurrency),
        };

        let generator = Generator::new(
            scraper,
            Arc::new(renderer),
            codes,
            config.output_path.clone(),
            options,
        );
        Ok(Self::new(generator, shutdown))
    }
}
