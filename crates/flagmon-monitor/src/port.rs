//! Collaborator seams of the control loop.

use std::future::Future;

use crate::error::MonitorResult;
use crate::session::SessionReport;

/// Raw result of one status query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryOutput {
    /// Zero on success. A query that could not run at all reports -1.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl QueryOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs the controller status query for a set of canaries.
///
/// On success `stdout` holds zero or more `name status weight
/// lastTransitionTime` rows.
pub trait ControllerQuery {
    fn query_status(&self, names: &[String]) -> impl Future<Output = QueryOutput> + Send;
}

/// Receives the final result of a session. Called exactly once.
pub trait ResultSink {
    fn publish(&mut self, report: &SessionReport) -> MonitorResult<()>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn publish(&mut self, report: &SessionReport) -> MonitorResult<()> {
        (**self).publish(report)
    }
}
