use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use popcoords::render::DEFAULT_OUTPUT_FILE;

#[derive(Debug, Clone, Parser)]
#[command(name = "popcoords-web")]
#[command(about = "Serves the Cloudflare PoP coordinates report over HTTP", long_about = None)]
pub struct ServerConfig {
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    #[arg(long, env = "OUTPUT_PATH", default_value = DEFAULT_OUTPUT_FILE)]
    pub output_path: PathBuf,

    #[arg(long, env = "WKHTMLTOPDF_PATH")]
    pub wkhtmltopdf: Option<PathBuf>,

    #[arg(
        long,
        env = "CODES_FILE",
        help = "Read PoP codes from this file instead of the bundled list"
    )]
    pub codes: Option<PathBuf>,

    #[arg(long, env = "POPS_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(
        long,
        env = "FETCH_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    #[arg(long, env = "FETCH_DELAY_MS", default_value_t = 500)]
    pub delay_ms: u64,

    #[arg(
        long,
        env = "FETCH_CONCURRENCY",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..=32)
    )]
    pub concurrency: u16,

    #[arg(long, env = "CORS_ENABLED", help = "Allow cross-origin requests from any origin")]
    pub cors: bool,
}

impl ServerConfig {
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
