//! Wire types for the GitHub endpoints the tracker reads
//!
//! These types mirror the JSON returned by the REST and GraphQL endpoints the
//! tracker consumes. They are kept separate from the tracker's domain models so
//! that this crate stays a thin, reusable API layer.
//!
//! Status and conclusion enums accept unknown values (`#[serde(other)]`) since
//! GitHub adds new vocabulary from time to time and a single unexpected value
//! must not fail a whole page of results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// GitHub login
    pub login: String,

    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// How the stored credential was obtained
///
/// Only personal access tokens carry the scopes needed to re-run CI, which is
/// why the distinction is kept around at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Token obtained through the OAuth device flow
    #[default]
    Oauth,
    /// Personal access token pasted by the user
    Token,
}

impl AuthMethod {
    /// Parse the cookie/tag representation, defaulting to OAuth
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("token") => AuthMethod::Token,
            _ => AuthMethod::Oauth,
        }
    }

    /// Tag used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Oauth => "oauth",
            AuthMethod::Token => "token",
        }
    }
}

/// Whether a token has the shape of a classic or fine-grained personal access token
pub fn is_personal_access_token(token: &str) -> bool {
    token.starts_with("ghp_") || token.starts_with("github_pat_")
}

/// A pull request as returned by the issue search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSummary {
    /// `owner/name` of the repository the PR belongs to
    pub repo_full_name: String,

    /// PR number (e.g., 123)
    pub number: u64,

    pub title: String,

    pub author_login: String,

    /// Last activity; also the enrichment cache key
    pub updated_at: DateTime<Utc>,

    /// Browser link
    pub html_url: String,

    /// Archive flag of the repository, when the search payload carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_archived: Option<bool>,
}

impl PullRequestSummary {
    /// Split `repo_full_name` into owner and repository name
    pub fn owner_and_repo(&self) -> Option<(&str, &str)> {
        self.repo_full_name.split_once('/')
    }
}

/// Raw search response (`GET /search/issues`)
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchIssuesResponse {
    #[allow(dead_code)]
    pub total_count: u64,
    pub items: Vec<SearchIssueItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchIssueItem {
    pub number: u64,
    pub title: String,
    pub user: Option<UserRef>,
    pub repository_url: String,
    pub updated_at: DateTime<Utc>,
    pub html_url: String,
    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserRef {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RepositoryRef {
    #[serde(default)]
    pub archived: Option<bool>,
}

impl SearchIssueItem {
    pub(crate) fn into_summary(self) -> PullRequestSummary {
        PullRequestSummary {
            repo_full_name: repo_full_name_from_url(&self.repository_url),
            number: self.number,
            title: self.title,
            author_login: self
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| "unknown".to_string()),
            updated_at: self.updated_at,
            html_url: self.html_url,
            repository_archived: self.repository.and_then(|r| r.archived),
        }
    }
}

/// Derive `owner/name` from an API repository URL
/// (`https://api.github.com/repos/owner/name`)
pub fn repo_full_name_from_url(url: &str) -> String {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    let name = segments.next().unwrap_or_default();
    let owner = segments.next().unwrap_or_default();
    format!("{}/{}", owner, name)
}

/// Pull request details relevant for merge readiness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number (e.g., 123)
    pub number: u64,

    pub title: String,

    pub author: String,

    /// HEAD commit SHA
    pub head_sha: String,

    /// Whether the PR is mergeable (None while GitHub is still computing it)
    pub mergeable: Option<bool>,

    /// Why the PR is (not) mergeable
    pub mergeable_state: Option<MergeableState>,

    /// Last activity; also the enrichment cache key
    pub updated_at: DateTime<Utc>,

    /// Browser link
    pub html_url: String,
}

/// GitHub's `mergeable_state`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeableState {
    Clean,
    Behind,
    Dirty,
    /// Branch protection says no
    Blocked,
    /// Mergeable, but with failing or pending non-required checks
    Unstable,
    /// PR is a draft
    Draft,
    /// Mergeable with passing commit status and pre-receive hooks
    HasHooks,
    /// Still being computed, or a value this crate does not know
    #[default]
    #[serde(other)]
    Unknown,
}

impl MergeableState {
    /// GitHub's wire name for the state
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeableState::Clean => "clean",
            MergeableState::Behind => "behind",
            MergeableState::Dirty => "dirty",
            MergeableState::Blocked => "blocked",
            MergeableState::Unstable => "unstable",
            MergeableState::Draft => "draft",
            MergeableState::HasHooks => "has_hooks",
            MergeableState::Unknown => "unknown",
        }
    }
}

/// A single review on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,

    /// Reviewer
    pub user: Option<ReviewUser>,

    /// Review state
    pub state: ReviewState,

    /// Submission time (absent for pending reviews)
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Review {
    /// Reviewer login, if GitHub still knows the account
    pub fn reviewer(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

/// Reviewer reference embedded in a review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUser {
    pub login: String,
}

/// State of a submitted review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Other,
}

/// Raw check-runs response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CheckRunsResponse {
    #[allow(dead_code)]
    pub total_count: u64,
    pub check_runs: Vec<CheckRun>,
}

/// A Checks API run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: u64,

    /// Check name as configured in the CI provider
    pub name: String,

    /// Current status
    pub status: CheckRunStatus,

    /// Set once `status` is `completed`
    #[serde(default)]
    pub conclusion: Option<CheckConclusion>,

    /// Check run page on github.com
    #[serde(default)]
    pub html_url: Option<String>,

    /// URL to the external check run details
    #[serde(default)]
    pub details_url: Option<String>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Check output (title and summary)
    #[serde(default)]
    pub output: Option<CheckRunOutput>,
}

/// Output block of a check run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunOutput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Status of a check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    Queued,
    InProgress,
    Completed,
    /// Check is waiting on a deployment protection rule
    Waiting,
    /// Check was requested but not yet queued
    Requested,
    Pending,
    #[serde(other)]
    Unknown,
}

impl CheckRunStatus {
    /// GitHub's wire name for the status
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckRunStatus::Queued => "queued",
            CheckRunStatus::InProgress => "in_progress",
            CheckRunStatus::Completed => "completed",
            CheckRunStatus::Waiting => "waiting",
            CheckRunStatus::Requested => "requested",
            CheckRunStatus::Pending => "pending",
            CheckRunStatus::Unknown => "unknown",
        }
    }
}

/// How a finished check run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Stale,
    #[serde(other)]
    Unknown,
}

impl CheckConclusion {
    /// GitHub's wire name for the conclusion
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckConclusion::Success => "success",
            CheckConclusion::Failure => "failure",
            CheckConclusion::Neutral => "neutral",
            CheckConclusion::Cancelled => "cancelled",
            CheckConclusion::Skipped => "skipped",
            CheckConclusion::TimedOut => "timed_out",
            CheckConclusion::ActionRequired => "action_required",
            CheckConclusion::Stale => "stale",
            CheckConclusion::Unknown => "unknown",
        }
    }
}

/// `GET /commits/{sha}/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatus {
    /// GitHub's own roll-up of `statuses`
    pub state: CheckState,

    pub total_count: u64,

    /// Individual statuses
    pub statuses: Vec<CommitStatus>,
}

/// State of a commit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Success,
    Pending,
    Failure,
    Error,
}

impl CheckState {
    /// GitHub's wire name for the state
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckState::Success => "success",
            CheckState::Pending => "pending",
            CheckState::Failure => "failure",
            CheckState::Error => "error",
        }
    }
}

/// One context of the legacy Status API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    /// e.g. `ci/circleci: build`
    pub context: String,

    /// Current state
    pub state: CheckState,

    pub description: Option<String>,

    /// URL for more details
    pub target_url: Option<String>,
}

/// Raw workflow runs response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WorkflowRunsResponse {
    #[allow(dead_code)]
    pub total_count: u64,
    pub workflow_runs: Vec<WorkflowRun>,
}

/// An Actions workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    /// Title shown in the Actions UI (commit message, or cancellation notice)
    #[serde(default)]
    pub display_title: Option<String>,
    /// Status of the run
    pub status: WorkflowRunStatus,
    /// Set once `status` is `completed`
    #[serde(default)]
    pub conclusion: Option<WorkflowRunConclusion>,
    /// Commit the run was triggered for
    pub head_sha: String,
    pub html_url: String,
    /// Event that triggered the run (push, pull_request, ...)
    #[serde(default)]
    pub event: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the current attempt started
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Workflow name, falling back to a placeholder for unnamed runs
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Workflow")
    }
}

/// Lifecycle of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunStatus {
    Queued,
    Waiting,
    InProgress,
    Completed,
    Pending,
    Requested,
    #[serde(other)]
    Unknown,
}

impl WorkflowRunStatus {
    /// GitHub's wire name for the status
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowRunStatus::Queued => "queued",
            WorkflowRunStatus::Waiting => "waiting",
            WorkflowRunStatus::InProgress => "in_progress",
            WorkflowRunStatus::Completed => "completed",
            WorkflowRunStatus::Pending => "pending",
            WorkflowRunStatus::Requested => "requested",
            WorkflowRunStatus::Unknown => "unknown",
        }
    }
}

/// How a finished workflow run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Stale,
    /// Workflow hit the startup failure path
    StartupFailure,
    #[serde(other)]
    Unknown,
}

impl WorkflowRunConclusion {
    /// GitHub's wire name for the conclusion
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowRunConclusion::Success => "success",
            WorkflowRunConclusion::Failure => "failure",
            WorkflowRunConclusion::Neutral => "neutral",
            WorkflowRunConclusion::Cancelled => "cancelled",
            WorkflowRunConclusion::Skipped => "skipped",
            WorkflowRunConclusion::TimedOut => "timed_out",
            WorkflowRunConclusion::ActionRequired => "action_required",
            WorkflowRunConclusion::Stale => "stale",
            WorkflowRunConclusion::StartupFailure => "startup_failure",
            WorkflowRunConclusion::Unknown => "unknown",
        }
    }
}

/// An active "merge when ready" request on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoMergeRequest {
    /// When auto-merge was enabled
    pub enabled_at: Option<DateTime<Utc>>,
    /// Login of the user who enabled it
    pub enabled_by_login: Option<String>,
    /// MERGE, SQUASH or REBASE
    pub merge_method: Option<String>,
}

/// Verdict over every CI signal of a pull request
///
/// `Unknown` means there was nothing to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiState {
    Success,
    Failure,
    Pending,
    Unknown,
}

impl CiState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CiState::Success => "success",
            CiState::Failure => "failure",
            CiState::Pending => "pending",
            CiState::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mergeable_state_default() {
        assert_eq!(MergeableState::default(), MergeableState::Unknown);
    }

    #[test]
    fn test_mergeable_state_accepts_unknown_values() {
        let state: MergeableState = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(state, MergeableState::Unknown);

        let state: MergeableState = serde_json::from_str("\"has_hooks\"").unwrap();
        assert_eq!(state, MergeableState::HasHooks);
    }

    #[test]
    fn test_repo_full_name_from_url() {
        assert_eq!(
            repo_full_name_from_url("https://api.github.com/repos/rust-lang/rust"),
            "rust-lang/rust"
        );
        assert_eq!(
            repo_full_name_from_url("https://ghe.example.com/api/v3/repos/team/app/"),
            "team/app"
        );
    }

    #[test]
    fn test_search_item_into_summary() {
        let json = r#"{
            "number": 42,
            "title": "Fix the thing",
            "user": {"login": "octocat"},
            "repository_url": "https://api.github.com/repos/acme/widgets",
            "updated_at": "2024-05-01T10:00:00Z",
            "html_url": "https://github.com/acme/widgets/pull/42",
            "repository": {"archived": true}
        }"#;
        let item: SearchIssueItem = serde_json::from_str(json).unwrap();
        let summary = item.into_summary();

        assert_eq!(summary.repo_full_name, "acme/widgets");
        assert_eq!(summary.author_login, "octocat");
        assert_eq!(summary.repository_archived, Some(true));
        assert_eq!(summary.owner_and_repo(), Some(("acme", "widgets")));
    }

    #[test]
    fn test_check_run_deserializes_api_payload() {
        let json = r#"{
            "id": 7,
            "name": "build",
            "status": "completed",
            "conclusion": "failure",
            "html_url": "https://github.com/acme/widgets/runs/7",
            "started_at": "2024-05-01T10:00:00Z",
            "completed_at": "2024-05-01T10:05:00Z",
            "output": {"title": "Build failed", "summary": "3 errors"}
        }"#;
        let run: CheckRun = serde_json::from_str(json).unwrap();

        assert_eq!(run.status, CheckRunStatus::Completed);
        assert_eq!(run.conclusion, Some(CheckConclusion::Failure));
        assert_eq!(
            run.output.and_then(|o| o.summary).as_deref(),
            Some("3 errors")
        );
    }

    #[test]
    fn test_review_state_wire_names() {
        let review: Review = serde_json::from_str(
            r#"{"id": 1, "user": {"login": "a"}, "state": "CHANGES_REQUESTED", "submitted_at": "2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(review.state, ReviewState::ChangesRequested);
        assert_eq!(review.reviewer(), Some("a"));
    }

    #[test]
    fn test_auth_method_tags() {
        assert_eq!(AuthMethod::from_tag(None), AuthMethod::Oauth);
        assert_eq!(AuthMethod::from_tag(Some("token")), AuthMethod::Token);
        assert_eq!(AuthMethod::from_tag(Some("weird")), AuthMethod::Oauth);
        assert_eq!(AuthMethod::Token.as_str(), "token");
    }

    #[test]
    fn test_personal_access_token_shapes() {
        assert!(is_personal_access_token("ghp_abc"));
        assert!(is_personal_access_token("github_pat_abc"));
        assert!(!is_personal_access_token("gho_abc"));
        assert!(!is_personal_access_token(""));
    }
}
