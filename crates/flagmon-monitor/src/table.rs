//! Resource status table — latest observation per requested canary.

use chrono::{DateTime, Utc};
use tracing::info;

use flagmon_core::MonitorTarget;

use crate::parser::{Observation, ObservationBatch};

/// Latest known state of every requested canary, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTable {
    task_start: DateTime<Utc>,
    targets: Vec<MonitorTarget>,
}

impl StatusTable {
    /// Create a table with every name `Unknown` as of `task_start`.
    ///
    /// Duplicate names collapse to a single entry.
    pub fn new(names: &[String], task_start: DateTime<Utc>) -> Self {
        let mut targets: Vec<MonitorTarget> = Vec::with_capacity(names.len());
        for name in names {
            if !targets.iter().any(|t| t.name == *name) {
                targets.push(MonitorTarget::unobserved(name, task_start));
            }
        }
        Self {
            task_start,
            targets,
        }
    }

    pub fn task_start(&self) -> DateTime<Utc> {
        self.task_start
    }

    pub fn targets(&self) -> &[MonitorTarget] {
        &self.targets
    }

    pub fn names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&MonitorTarget> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Overwrite a target with a new observation. Returns false when the
    /// name is not tracked.
    pub fn update(&mut self, obs: &Observation) -> bool {
        let Some(target) = self.targets.iter_mut().find(|t| t.name == obs.name) else {
            return false;
        };

        if target.status != obs.status {
            info!(
                canary = %target.name,
                from = %target.status,
                to = %obs.status,
                weight = ?obs.weight,
                "canary status changed"
            );
        }
        target.status = obs.status.clone();
        target.last_transition_time = obs.last_transition_time;
        true
    }

    /// Apply a whole poll's observations. Returns how many matched.
    pub fn apply(&mut self, batch: &ObservationBatch) -> usize {
        batch.iter().filter(|obs| self.update(obs)).count()
    }

    /// Every canary is succeeded, initialized, or failed.
    pub fn is_complete(&self) -> bool {
        self.targets.iter().all(|t| t.status.is_terminal())
    }

    /// Every canary is succeeded or initialized.
    pub fn all_succeeded(&self) -> bool {
        self.targets.iter().all(|t| t.status.is_success())
    }

    /// Whether the controller moved this canary after the session began.
    /// Equal timestamps do not count.
    pub fn transitioned_during_window(&self, target: &MonitorTarget) -> bool {
        target.last_transition_time > self.task_start
    }
}
