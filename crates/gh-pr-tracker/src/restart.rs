//! Restart failed CI
//!
//! Re-requests failed check runs and re-runs failed or cancelled workflow
//! runs of one PR. Items are restarted one after another and independently;
//! a partial result is normal and reported per failure reason.

use gh_client::{
    ApiError, ApiErrorKind, CheckConclusion, CheckRun, CheckRunStatus, GitHubClient, WorkflowRun,
    WorkflowRunConclusion, WorkflowRunStatus,
};
use serde::{Deserialize, Serialize};

use crate::frame::Notice;

/// Something that can be restarted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartTarget {
    CheckRun { id: u64, name: String },
    WorkflowRun { id: u64, name: String },
}

impl RestartTarget {
    pub fn name(&self) -> &str {
        match self {
            RestartTarget::CheckRun { name, .. } | RestartTarget::WorkflowRun { name, .. } => name,
        }
    }

    fn describe(&self) -> String {
        match self {
            RestartTarget::CheckRun { name, .. } => format!("check run \"{}\"", name),
            RestartTarget::WorkflowRun { name, .. } => format!("workflow \"{}\"", name),
        }
    }
}

/// Completed check runs that failed, then completed workflow runs that
/// failed or were cancelled
pub fn restart_candidates(
    check_runs: &[CheckRun],
    workflow_runs: &[WorkflowRun],
) -> Vec<RestartTarget> {
    let checks = check_runs
        .iter()
        .filter(|r| {
            r.status == CheckRunStatus::Completed && r.conclusion == Some(CheckConclusion::Failure)
        })
        .map(|r| RestartTarget::CheckRun {
            id: r.id,
            name: r.name.clone(),
        });

    let workflows = workflow_runs
        .iter()
        .filter(|w| {
            w.status == WorkflowRunStatus::Completed
                && matches!(
                    w.conclusion,
                    Some(WorkflowRunConclusion::Failure | WorkflowRunConclusion::Cancelled)
                )
        })
        .map(|w| RestartTarget::WorkflowRun {
            id: w.id,
            name: w.display_name().to_string(),
        });

    checks.chain(workflows).collect()
}

/// Why GitHub refused a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RestartFailureReason {
    InsufficientPermissions,
    JobsStillRunning,
    NotRerunnable,
    NotFound,
    Http(u16),
    Network,
    /// GitHub answered with a body that could not be read
    UnexpectedResponse,
}

impl RestartFailureReason {
    pub fn label(&self) -> String {
        match self {
            Self::InsufficientPermissions => "insufficient permissions".to_string(),
            Self::JobsStillRunning => "cannot restart while other jobs are running".to_string(),
            Self::NotRerunnable => {
                "cannot be rerun, may be too old or not re-runnable".to_string()
            }
            Self::NotFound => "run not found".to_string(),
            Self::Http(status) => format!("HTTP {}", status),
            Self::Network => "network error".to_string(),
            Self::UnexpectedResponse => "unexpected response from GitHub".to_string(),
        }
    }
}

/// Map a failed restart call to a reason
pub fn classify_failure(err: &anyhow::Error) -> RestartFailureReason {
    let Some(api) = ApiError::find(err) else {
        return RestartFailureReason::Network;
    };
    if api.kind == ApiErrorKind::Decode {
        return RestartFailureReason::UnexpectedResponse;
    }
    match api.status {
        None => RestartFailureReason::Network,
        Some(403) => RestartFailureReason::InsufficientPermissions,
        Some(422) if api.message.to_lowercase().contains("running") => {
            RestartFailureReason::JobsStillRunning
        }
        Some(422) => RestartFailureReason::NotRerunnable,
        Some(404) => RestartFailureReason::NotFound,
        Some(status) => RestartFailureReason::Http(status),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartFailure {
    pub target: RestartTarget,
    pub reason: RestartFailureReason,
}

/// Outcome of one restart batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartReport {
    pub total: usize,
    pub restarted: usize,
    pub failures: Vec<RestartFailure>,
}

impl RestartReport {
    pub fn count(&self, reason: RestartFailureReason) -> usize {
        self.failures.iter().filter(|f| f.reason == reason).count()
    }

    /// Messages for the user, success first
    pub fn notices(&self) -> Vec<Notice> {
        if self.total == 0 {
            return vec![Notice::error(
                "No failed checks or workflows found to restart",
            )];
        }

        let mut notices = Vec::new();
        if self.restarted > 0 {
            notices.push(Notice::success(format!(
                "Restarted {} of {} failed check(s)/workflow(s)",
                self.restarted, self.total
            )));
        }
        if self.failures.is_empty() {
            return notices;
        }

        let mut message = if self.restarted == 0 {
            "Failed to restart any workflows.".to_string()
        } else {
            format!(
                "Restarted {} workflows, but {} failed to restart.",
                self.restarted,
                self.failures.len()
            )
        };
        let permission = self.count(RestartFailureReason::InsufficientPermissions);
        if permission > 0 {
            message.push_str(&format!(
                " {} failed due to insufficient permissions. You may need to re-authenticate with workflow permissions.",
                permission
            ));
        }
        let not_rerunnable = self.count(RestartFailureReason::NotRerunnable);
        if not_rerunnable > 0 {
            message.push_str(&format!(
                " {} cannot be rerun (may be too old or use restricted workflow types).",
                not_rerunnable
            ));
        }
        let running = self.count(RestartFailureReason::JobsStillRunning);
        if running > 0 {
            message.push_str(&format!(
                " {} cannot restart while other jobs are running, wait for them to complete first.",
                running
            ));
        }

        notices.push(if self.restarted == 0 {
            Notice::error(message)
        } else {
            Notice::warning(message)
        });
        notices
    }
}

async fn restart_one(
    client: &dyn GitHubClient,
    owner: &str,
    repo: &str,
    target: &RestartTarget,
) -> Result<(), RestartFailureReason> {
    match target {
        RestartTarget::CheckRun { id, .. } => client
            .rerequest_check_run(owner, repo, *id)
            .await
            .map_err(|e| classify_failure(&e)),
        RestartTarget::WorkflowRun { id, .. } => {
            let Err(first) = client.rerun_workflow(owner, repo, *id).await else {
                return Ok(());
            };
            let reason = classify_failure(&first);
            if matches!(
                reason,
                RestartFailureReason::Network | RestartFailureReason::UnexpectedResponse
            ) {
                return Err(reason);
            }
            log::debug!(
                "Full rerun of workflow run {} refused ({:#}), retrying failed jobs only",
                id,
                first
            );
            match client.rerun_failed_jobs(owner, repo, *id).await {
                Ok(()) => Ok(()),
                Err(_) => Err(reason),
            }
        }
    }
}

/// Restart every candidate, sequentially
pub async fn restart_failed_ci(
    client: &dyn GitHubClient,
    owner: &str,
    repo: &str,
    check_runs: &[CheckRun],
    workflow_runs: &[WorkflowRun],
) -> RestartReport {
    let targets = restart_candidates(check_runs, workflow_runs);
    let mut report = RestartReport {
        total: targets.len(),
        ..Default::default()
    };

    for target in targets {
        match restart_one(client, owner, repo, &target).await {
            Ok(()) => {
                log::info!("Restarted {} in {}/{}", target.describe(), owner, repo);
                report.restarted += 1;
            }
            Err(reason) => {
                log::warn!(
                    "Failed to restart {} in {}/{} ({})",
                    target.describe(),
                    owner,
                    repo,
                    reason.label()
                );
                report.failures.push(RestartFailure { target, reason });
            }
        }
    }

    report
}
