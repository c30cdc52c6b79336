//! Shared types used across flagger-monitor crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a canary as reported by Flagger, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CanaryStatus {
    /// Not yet observed during this session.
    Unknown,
    Succeeded,
    /// First deployment of a canary; Flagger treats it as a success.
    Initialized,
    Failed,
    /// Any non-terminal phase (progressing, promoting, waiting, ...).
    Other(String),
}

impl CanaryStatus {
    /// Parse raw status text, normalizing case.
    pub fn parse(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        match lower.as_str() {
            "unknown" => CanaryStatus::Unknown,
            "succeeded" => CanaryStatus::Succeeded,
            "initialized" => CanaryStatus::Initialized,
            "failed" => CanaryStatus::Failed,
            _ => CanaryStatus::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CanaryStatus::Unknown => "unknown",
            CanaryStatus::Succeeded => "succeeded",
            CanaryStatus::Initialized => "initialized",
            CanaryStatus::Failed => "failed",
            CanaryStatus::Other(s) => s,
        }
    }

    /// Whether the controller will not move this canary on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CanaryStatus::Succeeded | CanaryStatus::Initialized | CanaryStatus::Failed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CanaryStatus::Succeeded | CanaryStatus::Initialized)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CanaryStatus::Failed)
    }
}

impl From<String> for CanaryStatus {
    fn from(s: String) -> Self {
        CanaryStatus::parse(&s)
    }
}

impl From<CanaryStatus> for String {
    fn from(status: CanaryStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for CanaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked canary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorTarget {
    pub name: String,
    pub status: CanaryStatus,
    pub last_transition_time: DateTime<Utc>,
}

impl MonitorTarget {
    /// A target that has not been observed yet.
    pub fn unobserved(name: &str, task_start: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            status: CanaryStatus::Unknown,
            last_transition_time: task_start,
        }
    }
}

/// Final classification of a completed (or timed-out) session.
///
/// Name lists are in the order the canaries were requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Every canary succeeded and transitioned during the session.
    Succeeded,
    /// Every canary succeeded, but some transition times predate the session.
    SucceededWithIssues { stale: Vec<String> },
    /// At least one canary reached a terminal failure.
    Failed { failed: Vec<String> },
    /// The time budget ran out before all canaries were terminal.
    TimedOut { pending: Vec<String> },
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Succeeded => "SUCCEEDED",
            Verdict::SucceededWithIssues { .. } => "SUCCEEDED WITH ISSUES",
            Verdict::Failed { .. } => "FAILED",
            Verdict::TimedOut { .. } => "TIMED OUT",
        }
    }
}

/// Pipeline-level result a session maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskResult {
    Succeeded,
    SucceededWithIssues,
    Failed,
}

impl TaskResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskResult::Succeeded => "Succeeded",
            TaskResult::SucceededWithIssues => "SucceededWithIssues",
            TaskResult::Failed => "Failed",
        }
    }
}

/// What a monitoring session ended with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The loop ran to a classification.
    Verdict(Verdict),
    /// The status query itself failed; polling was aborted.
    QueryFailed { exit_code: i32, stderr: String },
}

impl Outcome {
    pub fn task_result(&self) -> TaskResult {
        match self {
            Outcome::Verdict(Verdict::Succeeded) => TaskResult::Succeeded,
            Outcome::Verdict(Verdict::SucceededWithIssues { .. }) => {
                TaskResult::SucceededWithIssues
            }
            Outcome::Verdict(_) | Outcome::QueryFailed { .. } => TaskResult::Failed,
        }
    }

    /// One-line human-readable summary naming every implicated canary.
    pub fn summary(&self) -> String {
        match self {
            Outcome::Verdict(Verdict::Succeeded) => "All canaries succeeded.".to_string(),
            Outcome::Verdict(Verdict::SucceededWithIssues { stale }) => format!(
                "All canaries succeeded, but some of them did not change their transition time during monitoring: {}.",
                stale.join(", ")
            ),
            Outcome::Verdict(Verdict::Failed { failed }) => {
                format!("Canaries failed: {}", failed.join(", "))
            }
            Outcome::Verdict(Verdict::TimedOut { pending }) => format!(
                "Timeout for task reached. Status of canaries did not complete or status is unknown: {}",
                pending.join(", ")
            ),
            Outcome::QueryFailed { .. } => "Error executing kubectl command.".to_string(),
        }
    }

    /// Process exit code for the binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Verdict(Verdict::Succeeded | Verdict::SucceededWithIssues { .. }) => 0,
            Outcome::Verdict(_) => 1,
            Outcome::QueryFailed { .. } => 2,
        }
    }
}
