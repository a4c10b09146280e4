//! Failure and running-check details
//!
//! Turns the raw CI records of a failing or pending PR into short, displayable
//! items: what failed, what is still running, and where to look.

use chrono::{DateTime, Utc};
use gh_client::{
    CheckConclusion, CheckRun, CheckRunStatus, CheckState, CommitStatus, WorkflowRun,
    WorkflowRunConclusion, WorkflowRunStatus,
};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::signals::SignalKind;

/// One failed or running CI item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiItem {
    pub kind: SignalKind,
    pub name: String,
    pub summary: String,
    pub url: Option<String>,
    /// Run time of a finished workflow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

fn higher_priority_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            RegexBuilder::new("canceling since a higher priority.*request.*exists")
                .case_insensitive(true)
                .build()
                .ok()
        })
        .as_ref()
}

/// Whether a cancelled workflow was only superseded by a newer run
///
/// GitHub cancels concurrency-group runs with a fixed message that ends up in
/// the display title; those are noise, not failures.
pub fn is_cancelled_for_higher_priority(run: &WorkflowRun) -> bool {
    let Some(pattern) = higher_priority_pattern() else {
        return false;
    };
    run.display_title
        .as_deref()
        .is_some_and(|t| pattern.is_match(t))
        || run.name.as_deref().is_some_and(|n| pattern.is_match(n))
}

/// Failed check runs, failed/errored statuses and failed/cancelled workflows
pub fn failed_items(
    check_runs: &[CheckRun],
    statuses: &[CommitStatus],
    workflow_runs: &[WorkflowRun],
) -> Vec<CiItem> {
    let mut items = Vec::new();

    for run in check_runs
        .iter()
        .filter(|r| r.conclusion == Some(CheckConclusion::Failure))
    {
        items.push(CiItem {
            kind: SignalKind::CheckRun,
            name: run.name.clone(),
            summary: run
                .output
                .as_ref()
                .and_then(|o| o.summary.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "No summary available".to_string()),
            url: run.html_url.clone(),
            duration: None,
        });
    }

    for status in statuses
        .iter()
        .filter(|s| matches!(s.state, CheckState::Failure | CheckState::Error))
    {
        items.push(CiItem {
            kind: SignalKind::Status,
            name: status.context.clone(),
            summary: status
                .description
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "No description available".to_string()),
            url: status.target_url.clone(),
            duration: None,
        });
    }

    for run in workflow_runs {
        let summary = match run.conclusion {
            Some(WorkflowRunConclusion::Failure) => {
                format!("Workflow \"{}\" failed", run.display_name())
            }
            Some(WorkflowRunConclusion::Cancelled) => {
                if is_cancelled_for_higher_priority(run) {
                    log::debug!(
                        "Skipping workflow {:?} ({}) cancelled for a higher priority run",
                        run.name,
                        run.id
                    );
                    continue;
                }
                "Workflow was cancelled".to_string()
            }
            _ => continue,
        };

        items.push(CiItem {
            kind: SignalKind::WorkflowRun,
            name: run.display_name().to_string(),
            summary,
            url: Some(run.html_url.clone()),
            duration: Some(format_duration(Some(run.created_at), Some(run.updated_at))),
        });
    }

    items
}

/// Check runs and workflows that are queued, pending or in progress
pub fn running_items(
    check_runs: &[CheckRun],
    workflow_runs: &[WorkflowRun],
    now: DateTime<Utc>,
) -> Vec<CiItem> {
    let mut items = Vec::new();

    for run in check_runs {
        let summary = match run.status {
            CheckRunStatus::InProgress => "Currently running...",
            CheckRunStatus::Queued => "Queued and waiting to start",
            CheckRunStatus::Pending => "Pending execution",
            _ => continue,
        };
        items.push(CiItem {
            kind: SignalKind::CheckRun,
            name: run.name.clone(),
            summary: summary.to_string(),
            url: run.html_url.clone(),
            duration: None,
        });
    }

    for run in workflow_runs {
        let mut summary = match run.status {
            WorkflowRunStatus::InProgress => format!(
                "Running for {}",
                format_duration(Some(run.created_at), Some(now))
            ),
            WorkflowRunStatus::Queued => "Queued and waiting to start".to_string(),
            WorkflowRunStatus::Pending => "Pending execution".to_string(),
            _ => continue,
        };
        if let Some(event) = &run.event {
            summary.push_str(&format!(" (triggered by {})", event));
        }
        items.push(CiItem {
            kind: SignalKind::WorkflowRun,
            name: run.display_name().to_string(),
            summary,
            url: Some(run.html_url.clone()),
            duration: None,
        });
    }

    items
}

/// Link for "view checks": the first failed workflow when there is one,
/// otherwise the PR's checks tab
pub fn details_url(repo_full_name: &str, number: u64, workflow_runs: &[WorkflowRun]) -> String {
    workflow_runs
        .iter()
        .find(|w| w.conclusion == Some(WorkflowRunConclusion::Failure))
        .map(|w| w.html_url.clone())
        .unwrap_or_else(|| format!("https://github.com/{}/pull/{}/checks", repo_full_name, number))
}

/// `Xm Ys`, `Xm` on whole minutes, `Ys` under a minute
pub fn format_duration(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> String {
    let (Some(start), Some(end)) = (start, end) else {
        return "unknown duration".to_string();
    };

    let total = (end - start).num_seconds().max(0);
    let minutes = total / 60;
    let seconds = total % 60;

    match (minutes, seconds) {
        (0, s) => format!("{}s", s),
        (m, 0) => format!("{}m", m),
        (m, s) => format!("{}m {}s", m, s),
    }
}
