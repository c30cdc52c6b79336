//! Human-readable report formatting.

use chrono::SecondsFormat;
use flagmon_core::Outcome;
use flagmon_monitor::SessionReport;

pub fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Verdict(v) => v.label(),
        Outcome::QueryFailed { .. } => "KUBECTL ERROR",
    }
}

/// Aligned `NAME STATUS LAST TRANSITION` table of every canary.
pub fn format_table(report: &SessionReport) -> String {
    let rows: Vec<[String; 3]> = report
        .targets()
        .iter()
        .map(|t| {
            [
                t.name.clone(),
                t.status.to_string(),
                t.last_transition_time
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ]
        })
        .collect();

    let header = ["NAME", "STATUS", "LAST TRANSITION"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:<w0$}  {:<w1$}  {}\n",
        header[0],
        header[1],
        header[2],
        w0 = widths[0],
        w1 = widths[1]
    ));
    for row in &rows {
        out.push_str(&format!(
            "{:<w0$}  {:<w1$}  {}\n",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1]
        ));
    }
    out
}

pub fn format_report(report: &SessionReport) -> String {
    let mut out = String::new();

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  Flagger Canary Monitor                  ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Result:   {:<30}║\n", outcome_label(&report.outcome)));
    out.push_str(&format!("║  Polls:    {:<30}║\n", report.polls));
    out.push_str(&format!(
        "║  Elapsed:  {:<30}║\n",
        format!("{}s", report.elapsed.as_secs())
    ));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    out.push_str(&format_table(report));
    out.push('\n');

    if let Outcome::QueryFailed { exit_code, stderr } = &report.outcome {
        out.push_str(&format!("kubectl exited with code {exit_code}:\n"));
        for line in stderr.lines() {
            out.push_str(&format!("  {line}\n"));
        }
        out.push('\n');
    }

    out.push_str(&report.outcome.summary());
    out.push('\n');
    out
}
