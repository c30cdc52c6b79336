//! Monitor session — drives the wait/poll/classify cycle.
//!
//! A session is created once per invocation, run once, and then holds
//! its final report. Polling is strictly sequential: each cycle queries
//! the controller, applies the whole batch to the table, and only then
//! classifies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use flagmon_core::config::Timing;
use flagmon_core::{MonitorTarget, Outcome};

use crate::classifier::{classify, classify_at_timeout};
use crate::error::{MonitorError, MonitorResult};
use crate::parser::parse_batch;
use crate::port::{ControllerQuery, ResultSink};
use crate::table::StatusTable;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Constructed, not yet started.
    Idle,
    /// Waiting out the initial delay.
    InitialWait,
    /// Poll cycle N (1-based) in progress or sleeping after it.
    Polling { poll: u32 },
    /// Result published; nothing more happens.
    Finalized,
}

impl MonitorPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorPhase::Idle => "idle",
            MonitorPhase::InitialWait => "initial-wait",
            MonitorPhase::Polling { .. } => "polling",
            MonitorPhase::Finalized => "finalized",
        }
    }
}

/// Final snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: Outcome,
    pub table: StatusTable,
    /// Sum of poll intervals slept through.
    pub elapsed: Duration,
    pub polls: u32,
}

impl SessionReport {
    pub fn targets(&self) -> &[MonitorTarget] {
        self.table.targets()
    }
}

/// One monitoring run over a fixed set of canaries.
pub struct MonitorSession<Q, S> {
    query: Q,
    sink: S,
    timing: Timing,
    requested: Vec<String>,
    table: StatusTable,
    phase: MonitorPhase,
    elapsed: Duration,
    polls: u32,
    report: Option<SessionReport>,
}

impl<Q: ControllerQuery, S: ResultSink> MonitorSession<Q, S> {
    /// Create a session whose observation window starts now.
    pub fn new(names: &[String], timing: Timing, query: Q, sink: S) -> MonitorResult<Self> {
        Self::starting_at(names, timing, query, sink, Utc::now())
    }

    /// Create a session with an explicit task start time.
    pub fn starting_at(
        names: &[String],
        timing: Timing,
        query: Q,
        sink: S,
        task_start: DateTime<Utc>,
    ) -> MonitorResult<Self> {
        if names.is_empty() {
            return Err(MonitorError::NoTargets);
        }
        if timing.poll_interval.is_zero() {
            return Err(MonitorError::InvalidTiming(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let table = StatusTable::new(names, task_start);
        Ok(Self {
            query,
            sink,
            timing,
            requested: table.names(),
            table,
            phase: MonitorPhase::Idle,
            elapsed: Duration::ZERO,
            polls: 0,
            report: None,
        })
    }

    pub fn phase(&self) -> &MonitorPhase {
        &self.phase
    }

    pub fn table(&self) -> &StatusTable {
        &self.table
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The published report, once finalized.
    pub fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run the session to completion and publish the result.
    ///
    /// Can only be called once; later calls return
    /// [`MonitorError::AlreadyStarted`].
    pub async fn run(&mut self) -> MonitorResult<SessionReport> {
        if self.phase != MonitorPhase::Idle {
            return Err(MonitorError::AlreadyStarted(self.phase.as_str().to_string()));
        }

        info!(
            canaries = ?self.requested,
            initial_delay_secs = self.timing.initial_delay.as_secs(),
            poll_interval_secs = self.timing.poll_interval.as_secs(),
            timeout_secs = self.timing.timeout.as_secs(),
            "start of monitoring"
        );

        self.phase = MonitorPhase::InitialWait;
        debug!("waiting for initial delay");
        sleep(self.timing.initial_delay).await;

        let outcome = self.poll_until_done().await;
        self.finalize(outcome)
    }

    async fn poll_until_done(&mut self) -> Outcome {
        let window_start = Instant::now();

        loop {
            if self.budget_exhausted(window_start) {
                warn!(
                    elapsed_secs = self.elapsed.as_secs(),
                    polls = self.polls,
                    "timeout reached before all canaries completed"
                );
                return Outcome::Verdict(classify_at_timeout(&self.table));
            }

            if let Some(outcome) = self.poll_once().await {
                return outcome;
            }

            sleep(self.timing.poll_interval).await;
            self.elapsed += self.timing.poll_interval;
        }
    }

    /// One query/parse/apply/classify cycle. Returns the outcome once
    /// the session is over.
    async fn poll_once(&mut self) -> Option<Outcome> {
        self.polls += 1;
        self.phase = MonitorPhase::Polling { poll: self.polls };

        let output = self.query.query_status(&self.requested).await;
        if !output.is_success() {
            error!(
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                poll = self.polls,
                "status query failed, aborting"
            );
            return Some(Outcome::QueryFailed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        let batch = parse_batch(&output.stdout, &self.requested);
        let applied = self.table.apply(&batch);
        debug!(
            poll = self.polls,
            observed = applied,
            elapsed_secs = self.elapsed.as_secs(),
            "poll applied"
        );

        classify(&self.table).map(Outcome::Verdict)
    }

    fn budget_exhausted(&self, window_start: Instant) -> bool {
        self.elapsed >= self.timing.timeout || window_start.elapsed() >= self.timing.timeout
    }

    fn finalize(&mut self, outcome: Outcome) -> MonitorResult<SessionReport> {
        let report = SessionReport {
            outcome,
            table: self.table.clone(),
            elapsed: self.elapsed,
            polls: self.polls,
        };
        self.phase = MonitorPhase::Finalized;
        self.report = Some(report.clone());

        info!(
            result = report.outcome.task_result().as_str(),
            elapsed_secs = report.elapsed.as_secs(),
            polls = report.polls,
            "monitoring finished"
        );

        self.sink.publish(&report)?;
        Ok(report)
    }
}
