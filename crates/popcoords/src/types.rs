use std::{fmt::Display, path::PathBuf, str::FromStr, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder rendered in place of coordinates when a PoP could not be scraped.
pub const ERROR_PLACEHOLDER: &str = "Error fetching data";

static RE_POP_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("invalid regex: pop code"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid PoP code '{0}'. Expected three ASCII letters, e.g. 'NBO'")]
pub struct CodeParseError(String);

/// A three-letter Cloudflare PoP (point of presence) code, always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PopCode(String);

impl PopCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used in page URLs.
    pub fn slug(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl FromStr for PopCode {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if RE_POP_CODE.is_match(&upper) {
            Ok(PopCode(upper))
        } else {
            Err(CodeParseError(s.to_string()))
        }
    }
}

impl TryFrom<String> for PopCode {
    type Error = CodeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PopCode> for String {
    fn from(code: PopCode) -> Self {
        code.0
    }
}

impl Display for PopCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of scraping one PoP page. Exactly one is produced per code per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchResult {
    Found { code: PopCode, coordinates: String },
    Failed { code: PopCode, reason: String },
}

impl FetchResult {
    pub fn found(code: PopCode, coordinates: impl Into<String>) -> Self {
        FetchResult::Found {
            code,
            coordinates: coordinates.into(),
        }
    }

    pub fn failed(code: PopCode, reason: impl Into<String>) -> Self {
        FetchResult::Failed {
            code,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &PopCode {
        match self {
            FetchResult::Found { code, .. } | FetchResult::Failed { code, .. } => code,
        }
    }

    pub fn coordinates(&self) -> Option<&str> {
        match self {
            FetchResult::Found { coordinates, .. } => Some(coordinates),
            FetchResult::Failed { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FetchResult::Found { .. })
    }

    /// Text shown next to the code in the report.
    pub fn display_value(&self) -> &str {
        self.coordinates().unwrap_or(ERROR_PLACEHOLDER)
    }
}

impl Display for FetchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.display_value())
    }
}

/// Status line pushed to progress listeners while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusMessage(String);

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        StatusMessage(message.into())
    }

    pub fn grabbing(code: &PopCode) -> Self {
        StatusMessage(format!("Grabbing coordinates for {code}..."))
    }

    pub fn failed(code: &PopCode) -> Self {
        StatusMessage(format!("Failed to fetch coordinates for {code}."))
    }

    pub fn finished() -> Self {
        StatusMessage("All coordinates have been fetched. PDF is ready for download!".to_string())
    }

    pub fn render_failed(error: &impl Display) -> Self {
        StatusMessage(format!("PDF generation failed: {error}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StatusMessage {
    fn from(message: String) -> Self {
        StatusMessage(message)
    }
}

impl From<&str> for StatusMessage {
    fn from(message: &str) -> Self {
        StatusMessage(message.to_string())
    }
}

impl Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: Vec<FetchResult>,
    pub found: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output: Option<PathBuf>,
}

impl RunReport {
    pub fn new(
        results: Vec<FetchResult>,
        started_at: DateTime<Utc>,
        output: Option<PathBuf>,
    ) -> Self {
        let found = results.iter().filter(|r| r.is_found()).count();
        let failed = results.len() - found;
        Self {
            results,
            found,
            failed,
            started_at,
            finished_at: Utc::now(),
            output,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

impl Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Found:    {}", self.found)?;
        writeln!(f, "  Failed:   {}", self.failed)?;
        writeln!(f, "  Total:    {}", self.total())?;
        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "  Elapsed:  {}.{:03}s",
            elapsed.num_seconds(),
            elapsed.num_milliseconds() % 1000
        )?;
        if let Some(output) = &self.output {
            writeln!(f, "  Output:   {}", output.display())?;
        }
        Ok(())
    }
}
