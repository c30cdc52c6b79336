//! Canary name list parsing.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("no canary names given")]
    Empty,
    #[error("invalid canary name: {0}")]
    InvalidName(String),
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Split a comma/space/newline separated list into distinct canary names.
///
/// Order of first occurrence is kept; repeated names collapse to one.
/// Every name must be a valid Kubernetes object name.
pub fn parse_targets(input: &str) -> Result<Vec<String>, TargetError> {
    let separators = Regex::new(r"[,\s]+")?;
    let object_name = Regex::new(r"^[a-z0-9]([-a-z0-9.]{0,251}[a-z0-9])?$")?;

    let mut names: Vec<String> = Vec::new();
    for token in separators.split(input).filter(|t| !t.is_empty()) {
        if !object_name.is_match(token) {
            return Err(TargetError::InvalidName(token.to_string()));
        }
        if !names.iter().any(|n| n == token) {
            names.push(token.to_string());
        }
    }

    if names.is_empty() {
        return Err(TargetError::Empty);
    }
    Ok(names)
}
