//! Parsing of `kubectl get canaries` output.
//!
//! Each line is expected to hold four whitespace-separated columns:
//! `NAME STATUS WEIGHT LASTTRANSITIONTIME`. Header rows, blank lines,
//! lines of another shape, and canaries nobody asked for are skipped.

use chrono::{DateTime, Utc};
use tracing::debug;

use flagmon_core::CanaryStatus;

const COLUMNS: usize = 4;

/// One parsed status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub name: String,
    pub status: CanaryStatus,
    /// Canary traffic weight. Informational only.
    pub weight: Option<u32>,
    pub last_transition_time: DateTime<Utc>,
}

/// Observations from a single poll, in output order.
pub type ObservationBatch = Vec<Observation>;

/// Parse one status line. Returns `None` for anything that is not a
/// well-formed four-column row.
pub fn parse_line(line: &str) -> Option<Observation> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != COLUMNS {
        return None;
    }

    let last_transition_time = DateTime::parse_from_rfc3339(fields[3])
        .ok()?
        .with_timezone(&Utc);

    Some(Observation {
        name: fields[0].to_string(),
        status: CanaryStatus::parse(fields[1]),
        weight: fields[2].parse().ok(),
        last_transition_time,
    })
}

/// Parse a whole poll's output, keeping only the requested canaries.
pub fn parse_batch(stdout: &str, requested: &[String]) -> ObservationBatch {
    let mut batch = Vec::new();
    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(obs) if requested.iter().any(|n| *n == obs.name) => batch.push(obs),
            Some(obs) => debug!(canary = %obs.name, "ignoring unrequested canary"),
            None => debug!(%line, "skipping unparseable status line"),
        }
    }
    batch
}
