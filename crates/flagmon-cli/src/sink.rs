//! Result sinks — where the final verdict goes.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use flagmon_core::{MonitorTarget, Outcome};
use flagmon_monitor::{MonitorResult, ResultSink, SessionReport};

use crate::report::{format_report, format_table};

/// Summary and status table for humans.
pub struct ConsoleSink<W> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ResultSink for ConsoleSink<W> {
    fn publish(&mut self, report: &SessionReport) -> MonitorResult<()> {
        self.out.write_all(format_report(report).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    result: &'static str,
    message: String,
    outcome: &'a Outcome,
    task_start: DateTime<Utc>,
    elapsed_secs: u64,
    polls: u32,
    canaries: &'a [MonitorTarget],
}

impl<'a> From<&'a SessionReport> for JsonReport<'a> {
    fn from(report: &'a SessionReport) -> Self {
        Self {
            result: report.outcome.task_result().as_str(),
            message: report.outcome.summary(),
            outcome: &report.outcome,
            task_start: report.table.task_start(),
            elapsed_secs: report.elapsed.as_secs(),
            polls: report.polls,
            canaries: report.targets(),
        }
    }
}

/// One pretty-printed JSON document.
pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn publish(&mut self, report: &SessionReport) -> MonitorResult<()> {
        serde_json::to_writer_pretty(&mut self.out, &JsonReport::from(report))
            .map_err(std::io::Error::from)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Azure Pipelines logging commands, so the task result shows up in
/// the pipeline run.
pub struct PipelineSink<W> {
    out: W,
}

impl<W: Write> PipelineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ResultSink for PipelineSink<W> {
    fn publish(&mut self, report: &SessionReport) -> MonitorResult<()> {
        if let Outcome::QueryFailed { stderr, .. } = &report.outcome {
            for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                writeln!(self.out, "##vso[task.logissue type=error]{}", escape(line))?;
            }
        }
        self.out.write_all(format_table(report).as_bytes())?;
        writeln!(
            self.out,
            "##vso[task.complete result={};]{}",
            report.outcome.task_result().as_str(),
            escape(&report.outcome.summary())
        )?;
        self.out.flush()?;
        Ok(())
    }
}

/// Logging-command message escaping.
fn escape(message: &str) -> String {
    message
        .replace('%', "%AZP25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
