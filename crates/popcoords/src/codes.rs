//! The ordered list of PoP codes a run walks through.
//!
//! A list is plain text: codes separated by whitespace or commas, `#` starts a
//! comment that runs to the end of the line. Order is kept and duplicates are
//! rejected.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::types::{CodeParseError, PopCode};

const BUNDLED_CODES: &str = include_str!("../data/pop_codes.txt");

#[derive(Debug, thiserror::Error)]
pub enum CodeListError {
    #[error("Failed to read code list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Line {line}: {source}")]
    InvalidCode {
        line: usize,
        #[source]
        source: CodeParseError,
    },
    #[error("Line {line}: duplicate code {code}")]
    Duplicate { line: usize, code: PopCode },
}

/// The bundled list of Cloudflare PoP codes.
pub fn default_codes() -> Vec<PopCode> {
    parse_code_list(BUNDLED_CODES).expect("bundled code list is valid")
}

pub fn parse_code_list(text: &str) -> Result<Vec<PopCode>, CodeListError> {
    let mut seen = HashSet::new();
    let mut codes = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw_line.split('#').next().unwrap_or_default();

        for token in content
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let code: PopCode = token
                .parse()
                .map_err(|source| CodeListError::InvalidCode { line, source })?;
            if !seen.insert(code.clone()) {
                return Err(CodeListError::Duplicate { line, code });
            }
            codes.push(code);
        }
    }

    Ok(codes)
}

pub fn load_code_list(path: &Path) -> Result<Vec<PopCode>, CodeListError> {
    let text = std::fs::read_to_string(path).map_err(|source| CodeListError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let codes = parse_code_list(&text)?;
    log::info!("Loaded {} PoP codes from {}", codes.len(), path.display());
    Ok(codes)
}

/// Keeps only the codes listed in `only`, preserving the order of `codes`.
pub fn select_codes(codes: Vec<PopCode>, only: &[PopCode]) -> Vec<PopCode> {
    if only.is_empty() {
        return codes;
    }
    let wanted: HashSet<&PopCode> = only.iter().collect();
    codes.into_iter().filter(|c| wanted.contains(c)).collect()
}
