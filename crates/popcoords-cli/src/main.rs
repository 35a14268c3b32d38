use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use popcoords::codes::{default_codes, load_code_list, select_codes};
use popcoords::pipeline::{self, PipelineOptions};
use popcoords::progress::LogProgress;
use popcoords::render::{
    DEFAULT_OUTPUT_FILE, DocumentRenderer, HtmlRenderer, WkhtmltopdfRenderer,
};
use popcoords::types::PopCode;
use popcoords::{ScraperConfig, WebScraper};

#[derive(Parser)]
#[command(name = "popcoords")]
#[command(about = "A Cloudflare PoP coordinates scraper", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
enum DocumentFormat {
    Pdf,
    Html,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Read PoP codes from FILE instead of the bundled list"
    )]
    codes: Option<PathBuf>,

    #[arg(
        long,
        value_delimiter = ',',
        value_name = "CODE,...",
        help = "Only fetch these codes (kept in list order)"
    )]
    only: Vec<PopCode>,

    #[arg(long, help = "Base URL the lower-cased code is appended to")]
    base_url: Option<String>,

    #[arg(
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Per-request timeout in seconds"
    )]
    timeout: u64,

    #[arg(long, default_value_t = 0, help = "Pause after each code, in milliseconds")]
    delay_ms: u64,

    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..=32),
        help = "Number of pages fetched at once"
    )]
    concurrency: u16,
}

impl FetchArgs {
    fn codes(&self) -> Vec<PopCode> {
        let codes = match &self.codes {
            Some(path) => load_code_list(path).unwrap_or_else(|e| {
                log::error!("Error loading code list: {}", e);
                process::exit(1);
            }),
            None => default_codes(),
        };
        select_codes(codes, &self.only)
    }

    fn scraper(&self) -> WebScraper {
        let mut config = ScraperConfig {
            timeout: Duration::from_secs(self.timeout),
            ..Default::default()
        };
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        WebScraper::with_config(config).unwrap_or_else(|e| {
            log::error!("Error creating scraper: {}", e);
            process::exit(1);
        })
    }

    fn options(&self) -> PipelineOptions {
        PipelineOptions {
            delay: Duration::from_millis(self.delay_ms),
            concurrency: usize::from(self.concurrency),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch coordinates and print them
    List {
        #[command(flatten)]
        fetch: FetchArgs,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
    /// Fetch coordinates and write the report document
    Render {
        #[command(flatten)]
        fetch: FetchArgs,

        #[arg(
            long,
            value_name = "PATH",
            default_value = DEFAULT_OUTPUT_FILE,
            help = "Where to write the document"
        )]
        out: PathBuf,

        #[arg(long, value_enum, default_value = "pdf", help = "Document format")]
        format: DocumentFormat,

        #[arg(long, value_name = "PATH", help = "Path to the wkhtmltopdf binary")]
        wkhtmltopdf: Option<PathBuf>,
    },
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::List { fetch, format } => {
            let codes = fetch.codes();
            let scraper = fetch.scraper();

            let results =
                pipeline::fetch_all(&scraper, &codes, &fetch.options(), &LogProgress).await;

            match format {
                OutputFormat::Json => serialize_json(&results),
                OutputFormat::Text => {
                    if results.is_empty() {
                        println!("No codes to fetch.");
                    }
                    for (i, result) in results.iter().enumerate() {
                        println!("{:>3}. {}", i + 1, result);
                    }
                    let found = results.iter().filter(|r| r.is_found()).count();
                    println!("\n{} of {} PoPs resolved", found, results.len());
                }
            }
        }

        Commands::Render {
            fetch,
            out,
            format,
            wkhtmltopdf,
        } => {
            let renderer: Box<dyn DocumentRenderer> = match format {
                DocumentFormat::Html => Box::new(HtmlRenderer),
                DocumentFormat::Pdf => Box::new(
                    WkhtmltopdfRenderer::locate(wkhtmltopdf.as_deref()).unwrap_or_else(|e| {
                        log::error!("{}", e);
                        process::exit(1);
                    }),
                ),
            };

            let codes = fetch.codes();
            let scraper = fetch.scraper();

            let report = pipeline::run(
                &scraper,
                &codes,
                renderer.as_ref(),
                &out,
                &fetch.options(),
                &LogProgress,
            )
            .await
            .unwrap_or_else(|e| {
                log::error!("Error generating document: {}", e);
                process::exit(1);
            });

            print!("{}", report);
        }
    }
}
