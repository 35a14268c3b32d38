//! Turns fetch results into the report document and writes it to disk.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::types::FetchResult;

pub const REPORT_TITLE: &str = "Cloudflare PoP Coordinates";
pub const DEFAULT_OUTPUT_FILE: &str = "Cloudflare_PoP_Coordinates.pdf";
pub const DEFAULT_WKHTMLTOPDF_PATH: &str = "/usr/bin/wkhtmltopdf";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("wkhtmltopdf not found (looked at {0} and in PATH)")]
    EngineNotFound(PathBuf),
    #[error("Failed to run {engine}: {source}")]
    Spawn {
        engine: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{engine} exited with {status}: {stderr}")]
    EngineFailed {
        engine: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("{0} produced an empty document")]
    EmptyOutput(PathBuf),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One `<li>` per result, in the order given.
pub fn list_items(results: &[FetchResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "<li><b>{}</b>: {}</li>",
                r.code(),
                escape_html(r.display_value())
            )
        })
        .collect()
}

pub fn build_html(results: &[FetchResult]) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1><ul>{items}</ul>\n</body>\n</html>\n",
        title = REPORT_TITLE,
        items = list_items(results)
    )
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError>;

    fn content_type(&self) -> &'static str;

    fn name(&self) -> &'static str;
}

/// Renders through an external `wkhtmltopdf` binary, HTML on stdin, PDF on stdout.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    binary_path: PathBuf,
}

impl WkhtmltopdfRenderer {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    pub fn from_path() -> Option<Self> {
        which::which("wkhtmltopdf").ok().map(Self::new)
    }

    /// Uses `preferred` (or the usual install location) when it exists,
    /// otherwise searches `PATH`.
    pub fn locate(preferred: Option<&Path>) -> Result<Self, RenderError> {
        let candidate = preferred.unwrap_or(Path::new(DEFAULT_WKHTMLTOPDF_PATH));
        if candidate.is_file() {
            return Ok(Self::new(candidate.to_path_buf()));
        }
        log::warn!(
            "wkhtmltopdf not found at {}, searching PATH",
            candidate.display()
        );
        Self::from_path().ok_or_else(|| RenderError::EngineNotFound(candidate.to_path_buf()))
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl DocumentRenderer for WkhtmltopdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let spawn_err = |source| RenderError::Spawn {
            engine: self.binary_path.clone(),
            source,
        };

        let mut child = Command::new(&self.binary_path)
            .args(["--quiet", "--encoding", "utf-8", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            let input = html.as_bytes().to_vec();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    log::error!("Failed to feed wkhtmltopdf: {e:?}");
                }
            });
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;

        if !output.status.success() {
            return Err(RenderError::EngineFailed {
                engine: self.binary_path.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput(self.binary_path.clone()));
        }

        log::debug!("wkhtmltopdf produced {} bytes", output.stdout.len());
        Ok(output.stdout)
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn name(&self) -> &'static str {
        "wkhtmltopdf"
    }
}

/// Emits the markup itself; useful where no PDF engine is installed.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer;

#[async_trait]
impl DocumentRenderer for HtmlRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        Ok(html.as_bytes().to_vec())
    }

    fn content_type(&self) -> &'static str {
        "text/html; charset=utf-8"
    }

    fn name(&self) -> &'static str {
        "html"
    }
}

/// Replaces `path` with `bytes` via a temporary sibling file and a rename, so
/// readers only ever see a complete document.
pub async fn write_document(path: &Path, bytes: Vec<u8>) -> Result<PathBuf, RenderError> {
    let path = path.to_path_buf();
    let target = path.clone();

    let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::Builder::new()
            .prefix(".popcoords-")
            .suffix(".part")
            .tempfile_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)
    .and_then(|r| r);

    match result {
        Ok(()) => {
            log::info!("Wrote {}", path.display());
            Ok(path)
        }
        Err(source) => Err(RenderError::Write { path, source }),
    }
}
