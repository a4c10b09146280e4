//! Normalised CI signals
//!
//! GitHub reports CI through three independent mechanisms with different
//! vocabularies. Everything is flattened into [`CheckSignal`]s carrying a single
//! raw state string before aggregation.

use crate::check_rules::CheckRuleTable;
use chrono::{DateTime, Utc};
use gh_client::{CheckRun, CheckRunStatus, CommitStatus, WorkflowRun, WorkflowRunStatus};
use serde::{Deserialize, Serialize};

/// Which GitHub mechanism produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    CheckRun,
    Status,
    WorkflowRun,
}

/// One CI signal in a uniform shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSignal {
    pub kind: SignalKind,
    pub name: String,
    /// `conclusion` for completed runs, `status` otherwise; `state` for
    /// commit statuses. Empty when a completed run has no conclusion.
    pub raw_state: String,
    /// False when the name matched an optional-check rule
    pub required: bool,
    pub html_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CheckSignal {
    pub fn from_check_run(run: &CheckRun, rules: &CheckRuleTable) -> Self {
        let raw_state = if run.status == CheckRunStatus::Completed {
            run.conclusion
                .map(|c| c.as_str().to_string())
                .unwrap_or_default()
        } else {
            run.status.as_str().to_string()
        };

        Self {
            kind: SignalKind::CheckRun,
            required: rules.is_required(&run.name),
            name: run.name.clone(),
            raw_state,
            html_url: run.html_url.clone().or_else(|| run.details_url.clone()),
            started_at: run.started_at,
            completed_at: run.completed_at,
        }
    }

    pub fn from_status(status: &CommitStatus, rules: &CheckRuleTable) -> Self {
        Self {
            kind: SignalKind::Status,
            required: rules.is_required(&status.context),
            name: status.context.clone(),
            raw_state: status.state.as_str().to_string(),
            html_url: status.target_url.clone(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn from_workflow_run(run: &WorkflowRun, rules: &CheckRuleTable) -> Self {
        let completed = run.status == WorkflowRunStatus::Completed;
        let raw_state = if completed {
            run.conclusion
                .map(|c| c.as_str().to_string())
                .unwrap_or_default()
        } else {
            run.status.as_str().to_string()
        };
        let name = run.display_name();

        Self {
            kind: SignalKind::WorkflowRun,
            required: rules.is_required(name),
            name: name.to_string(),
            raw_state,
            html_url: Some(run.html_url.clone()),
            started_at: run.run_started_at.or(Some(run.created_at)),
            completed_at: completed.then_some(run.updated_at),
        }
    }
}

/// Flatten the three signal sources of one commit
pub fn collect_signals(
    check_runs: &[CheckRun],
    statuses: &[CommitStatus],
    workflow_runs: &[WorkflowRun],
    rules: &CheckRuleTable,
) -> Vec<CheckSignal> {
    check_runs
        .iter()
        .map(|r| CheckSignal::from_check_run(r, rules))
        .chain(statuses.iter().map(|s| CheckSignal::from_status(s, rules)))
        .chain(
            workflow_runs
                .iter()
                .map(|w| CheckSignal::from_workflow_run(w, rules)),
        )
        .collect()
}
