//! Monitor error types.

use thiserror::Error;

/// Errors that stop a session from running or publishing.
///
/// Verdicts and failed status queries are not errors; they end up in
/// [`flagmon_core::Outcome`].
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no canaries to monitor")]
    NoTargets,

    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    #[error("session already started (phase: {0})")]
    AlreadyStarted(String),

    #[error("result sink error: {0}")]
    Sink(#[from] std::io::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
