//! The [`GitHubClient`] seam and enrichment cache modes

use crate::types::{
    AutoMergeRequest, CheckRun, CheckStatus, CurrentUser, PullRequest, PullRequestSummary, Review,
    WorkflowRun,
};
use async_trait::async_trait;

/// How a display pass may use cached enrichment
///
/// Auto-refresh passes reuse what they can; a manual refresh always asks
/// GitHub again but still leaves its answers behind for the next tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CacheMode {
    /// Skip lookups, store fresh answers
    WriteOnly,
    /// Serve lookups, never store
    ReadOnly,
    #[default]
    ReadWrite,
}

impl CacheMode {
    /// Mode for an auto (`true`) or manual (`false`) refresh
    pub fn for_refresh(is_auto_refresh: bool) -> Self {
        if is_auto_refresh {
            CacheMode::ReadWrite
        } else {
            CacheMode::WriteOnly
        }
    }

    pub fn should_read(&self) -> bool {
        *self != CacheMode::WriteOnly
    }

    pub fn should_write(&self) -> bool {
        *self != CacheMode::ReadOnly
    }
}

/// Everything the tracker asks of GitHub
///
/// Failures that GitHub answered are reported as an [`crate::ApiError`] inside
/// the `anyhow::Error`, so callers can branch on the status code. Shared
/// between tasks, hence `Send + Sync`.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// `GET /user`
    async fn fetch_current_user(&self) -> anyhow::Result<CurrentUser>;

    /// Issue search restricted by `query`, newest update first, one page of 100
    async fn search_pull_requests(&self, query: &str) -> anyhow::Result<Vec<PullRequestSummary>>;

    /// Head SHA and mergeability, neither of which the search returns
    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<PullRequest>;

    async fn fetch_reviews(&self, owner: &str, repo: &str, number: u64)
        -> anyhow::Result<Vec<Review>>;

    /// Checks API runs attached to `sha`
    async fn fetch_check_runs(&self, owner: &str, repo: &str, sha: &str)
        -> anyhow::Result<Vec<CheckRun>>;

    /// Legacy combined status of `sha` (external CI that never adopted checks)
    async fn fetch_commit_status(&self, owner: &str, repo: &str, sha: &str)
        -> anyhow::Result<CheckStatus>;

    /// Actions runs triggered for `sha`
    async fn fetch_workflow_runs(&self, owner: &str, repo: &str, sha: &str)
        -> anyhow::Result<Vec<WorkflowRun>>;

    /// Active auto-merge request via GraphQL, `None` when not enabled
    async fn fetch_auto_merge_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Option<AutoMergeRequest>>;

    async fn rerequest_check_run(&self, owner: &str, repo: &str, check_run_id: u64)
        -> anyhow::Result<()>;

    async fn rerun_workflow(&self, owner: &str, repo: &str, run_id: u64) -> anyhow::Result<()>;

    /// Fallback for runs GitHub refuses to re-run as a whole
    async fn rerun_failed_jobs(&self, owner: &str, repo: &str, run_id: u64)
        -> anyhow::Result<()>;
}
