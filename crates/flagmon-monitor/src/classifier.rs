//! Verdict classification of a status table.

use flagmon_core::Verdict;

use crate::table::StatusTable;

/// Classify a table once every canary is terminal.
///
/// Returns `None` while any canary is still pending. Checks run in
/// order: full success, success with stale timestamps, failure.
pub fn classify(table: &StatusTable) -> Option<Verdict> {
    if !table.is_complete() {
        return None;
    }

    if table.all_succeeded() {
        let stale: Vec<String> = table
            .targets()
            .iter()
            .filter(|t| !table.transitioned_during_window(t))
            .map(|t| t.name.clone())
            .collect();

        if stale.is_empty() {
            return Some(Verdict::Succeeded);
        }
        return Some(Verdict::SucceededWithIssues { stale });
    }

    let failed = table
        .targets()
        .iter()
        .filter(|t| t.status.is_failed())
        .map(|t| t.name.clone())
        .collect();
    Some(Verdict::Failed { failed })
}

/// Classify a table when the time budget has run out.
///
/// A complete table classifies normally. Otherwise every canary that
/// has not succeeded (failed, unknown, or still in progress) is
/// reported as pending.
pub fn classify_at_timeout(table: &StatusTable) -> Verdict {
    classify(table).unwrap_or_else(|| Verdict::TimedOut {
        pending: table
            .targets()
            .iter()
            .filter(|t| !t.status.is_success())
            .map(|t| t.name.clone())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Observation;
    use chrono::{DateTime, Duration, Utc};
    use flagmon_core::CanaryStatus;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn table_with(rows: &[(&str, CanaryStatus, i64)]) -> StatusTable {
        let names: Vec<String> = rows.iter().map(|(n, _, _)| n.to_string()).collect();
        let mut table = StatusTable::new(&names, start());
        for (name, status, offset) in rows {
            if *status != CanaryStatus::Unknown {
                table.update(&Observation {
                    name: name.to_string(),
                    status: status.clone(),
                    weight: None,
                    last_transition_time: start() + Duration::seconds(*offset),
                });
            }
        }
        table
    }

    #[test]
    fn all_fresh_successes_succeed() {
        let table = table_with(&[
            ("a", CanaryStatus::Succeeded, 10),
            ("b", CanaryStatus::Initialized, 20),
        ]);
        assert_eq!(classify(&table), Some(Verdict::Succeeded));
    }

    #[test]
    fn stale_success_is_flagged() {
        let table = table_with(&[
            ("a", CanaryStatus::Succeeded, 10),
            ("b", CanaryStatus::Succeeded, -10),
            ("c", CanaryStatus::Succeeded, 0),
        ]);
        assert_eq!(
            classify(&table),
            Some(Verdict::SucceededWithIssues {
                stale: vec!["b".to_string(), "c".to_string()]
            })
        );
    }

    #[test]
    fn any_failure_fails() {
        let table = table_with(&[
            ("a", CanaryStatus::Succeeded, 10),
            ("b", CanaryStatus::Failed, 10),
        ]);
        assert_eq!(
            classify(&table),
            Some(Verdict::Failed {
                failed: vec!["b".to_string()]
            })
        );
    }

    #[test]
    fn incomplete_table_is_not_classified() {
        let table = table_with(&[
            ("a", CanaryStatus::Succeeded, 10),
            ("b", CanaryStatus::Other("progressing".into()), 10),
        ]);
        assert_eq!(classify(&table), None);
    }

    #[test]
    fn timeout_reports_everything_not_succeeded() {
        let table = table_with(&[
            ("a", CanaryStatus::Succeeded, 10),
            ("b", CanaryStatus::Failed, 10),
            ("c", CanaryStatus::Unknown, 0),
            ("d", CanaryStatus::Other("waiting".into()), 10),
        ]);
        assert_eq!(
            classify_at_timeout(&table),
            Verdict::TimedOut {
                pending: vec!["b".to_string(), "c".to_string(), "d".to_string()]
            }
        );
    }

    #[test]
    fn never_observed_never_succeeds() {
        let table = table_with(&[("a", CanaryStatus::Unknown, 0)]);
        assert_eq!(classify(&table), None);
        assert!(matches!(
            classify_at_timeout(&table),
            Verdict::TimedOut { .. }
        ));
    }

    #[test]
    fn classification_is_deterministic() {
        let table = table_with(&[
            ("a", CanaryStatus::Succeeded, -1),
            ("b", CanaryStatus::Succeeded, 1),
        ]);
        let first = classify(&table);
        for _ in 0..5 {
            assert_eq!(classify(&table), first);
        }
    }
}
