//! [`GitHubClient`] over octocrab
//!
//! Most endpoints are hit with raw `get`/`_post` calls and deserialized into
//! this crate's own DTOs; octocrab's typed models are only used where they
//! carry everything the tracker needs.

use crate::client::GitHubClient;
use crate::error::ApiError;
use crate::types::{
    AutoMergeRequest, CheckRun, CheckRunsResponse, CheckState, CheckStatus, CommitStatus,
    CurrentUser, MergeableState, PullRequest, PullRequestSummary, Review, SearchIssuesResponse,
    WorkflowRun, WorkflowRunsResponse,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Page size used for every list endpoint
const PER_PAGE: u8 = 100;

const AUTO_MERGE_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      autoMergeRequest {
        enabledAt
        enabledBy { login }
        mergeMethod
      }
    }
  }
}"#;

/// Talks to GitHub (or GHES) through a shared octocrab instance
#[derive(Debug, Clone)]
pub struct OctocrabClient {
    octocrab: Arc<Octocrab>,
}

impl OctocrabClient {
    pub fn new(octocrab: Arc<Octocrab>) -> Self {
        Self { octocrab }
    }

    /// Build a client authenticated with `token` against `api_base_url`
    ///
    /// # Arguments
    ///
    /// * `token` - Bearer token (OAuth or personal access token)
    /// * `api_base_url` - REST base, e.g. `https://api.github.com`
    pub fn from_token(token: impl Into<String>, api_base_url: &str) -> anyhow::Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(token.into())
            .base_uri(api_base_url)
            .context("Failed to set base URI")?
            .build()
            .context("Failed to build Octocrab client")?;

        Ok(Self::new(Arc::new(octocrab)))
    }

    pub fn octocrab(&self) -> &Octocrab {
        &self.octocrab
    }

    /// POST without a body, accepting any 2xx (GitHub answers re-run
    /// requests with `201` and an empty body)
    async fn post_empty(&self, route: &str) -> anyhow::Result<()> {
        let response = self
            .octocrab
            ._post(route, None::<&()>)
            .await
            .map_err(ApiError::from)?;
        octocrab::map_github_error(response)
            .await
            .map_err(ApiError::from)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct SearchParams<'a> {
    q: &'a str,
    per_page: u8,
    sort: &'a str,
}

#[derive(Serialize)]
struct HeadShaParams<'a> {
    head_sha: &'a str,
    per_page: u8,
}

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct AutoMergeData {
    repository: Option<AutoMergeRepository>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutoMergeRepository {
    pull_request: Option<AutoMergePullRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutoMergePullRequest {
    auto_merge_request: Option<AutoMergeNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutoMergeNode {
    enabled_at: Option<DateTime<Utc>>,
    enabled_by: Option<LoginNode>,
    merge_method: Option<String>,
}

#[derive(Deserialize)]
struct LoginNode {
    login: String,
}

#[async_trait]
impl GitHubClient for OctocrabClient {
    async fn fetch_current_user(&self) -> anyhow::Result<CurrentUser> {
        let user: CurrentUser = self
            .octocrab
            .get("/user", None::<&()>)
            .await
            .map_err(ApiError::from)?;
        debug!("Authenticated as {}", user.login);
        Ok(user)
    }

    async fn search_pull_requests(&self, query: &str) -> anyhow::Result<Vec<PullRequestSummary>> {
        debug!("Searching pull requests: {}", query);

        let params = SearchParams {
            q: query,
            per_page: PER_PAGE,
            sort: "updated",
        };
        let response: SearchIssuesResponse = self
            .octocrab
            .get("/search/issues", Some(&params))
            .await
            .map_err(ApiError::from)?;

        let prs: Vec<PullRequestSummary> = response
            .items
            .into_iter()
            .map(|item| item.into_summary())
            .collect();

        debug!("Search returned {} PRs", prs.len());
        Ok(prs)
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<PullRequest> {
        debug!("Fetching PR #{} for {}/{}", pr_number, owner, repo);

        let pr = self
            .octocrab
            .pulls(owner, repo)
            .get(pr_number)
            .await
            .map_err(ApiError::from)?;

        Ok(convert_pull_request(&pr))
    }

    async fn fetch_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Vec<Review>> {
        debug!("Fetching reviews for {}/{}#{}", owner, repo, pr_number);

        let route = format!("/repos/{}/{}/pulls/{}/reviews", owner, repo, pr_number);
        let reviews: Vec<Review> = self
            .octocrab
            .get(route, Some(&PageParams { per_page: PER_PAGE }))
            .await
            .map_err(ApiError::from)?;

        Ok(reviews)
    }

    async fn fetch_check_runs(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<CheckRun>> {
        debug!("Fetching check runs for {}/{}@{}", owner, repo, commit_sha);

        let route = format!("/repos/{}/{}/commits/{}/check-runs", owner, repo, commit_sha);
        let response: CheckRunsResponse = self
            .octocrab
            .get(route, Some(&PageParams { per_page: PER_PAGE }))
            .await
            .map_err(ApiError::from)?;

        Ok(response.check_runs)
    }

    async fn fetch_commit_status(
        &self,
        owner: &str,
        repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<CheckStatus> {
        debug!("Fetching commit status for {}/{}@{}", owner, repo, commit_sha);

        // octocrab's commit `Reference` does not accept a bare SHA
        let route = format!("/repos/{}/{}/commits/{}/status", owner, repo, commit_sha);
        let status: octocrab::models::CombinedStatus = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(ApiError::from)?;

        let state = convert_status_state(&status.state);
        let statuses = status
            .statuses
            .into_iter()
            .map(|s| CommitStatus {
                context: s.context.unwrap_or_default(),
                state: convert_status_state(&s.state),
                description: s.description,
                target_url: s.target_url,
            })
            .collect();

        Ok(CheckStatus {
            state,
            total_count: status.total_count as u64,
            statuses,
        })
    }

    async fn fetch_workflow_runs(
        &self,
        owner: &str,
        repo: &str,
        head_sha: &str,
    ) -> anyhow::Result<Vec<WorkflowRun>> {
        debug!("Fetching workflow runs for {}/{}@{}", owner, repo, head_sha);

        let route = format!("/repos/{}/{}/actions/runs", owner, repo);
        let params = HeadShaParams {
            head_sha,
            per_page: PER_PAGE,
        };
        let response: WorkflowRunsResponse = self
            .octocrab
            .get(route, Some(&params))
            .await
            .map_err(ApiError::from)?;

        Ok(response.workflow_runs)
    }

    async fn fetch_auto_merge_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Option<AutoMergeRequest>> {
        let payload = serde_json::json!({
            "query": AUTO_MERGE_QUERY,
            "variables": { "owner": owner, "name": repo, "number": pr_number },
        });

        let response: GraphQlResponse<AutoMergeData> = self
            .octocrab
            .graphql(&payload)
            .await
            .map_err(ApiError::from)?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            anyhow::bail!("GraphQL error: {}", messages.join("; "));
        }

        let node = response
            .data
            .and_then(|d| d.repository)
            .and_then(|r| r.pull_request)
            .and_then(|pr| pr.auto_merge_request);

        Ok(node.map(|n| AutoMergeRequest {
            enabled_at: n.enabled_at,
            enabled_by_login: n.enabled_by.map(|u| u.login),
            merge_method: n.merge_method,
        }))
    }

    async fn rerequest_check_run(
        &self,
        owner: &str,
        repo: &str,
        check_run_id: u64,
    ) -> anyhow::Result<()> {
        debug!("Re-requesting check run {} in {}/{}", check_run_id, owner, repo);
        let route = format!("/repos/{}/{}/check-runs/{}/rerequest", owner, repo, check_run_id);
        self.post_empty(&route).await
    }

    async fn rerun_workflow(&self, owner: &str, repo: &str, run_id: u64) -> anyhow::Result<()> {
        debug!("Re-running workflow run {} in {}/{}", run_id, owner, repo);
        let route = format!("/repos/{}/{}/actions/runs/{}/rerun", owner, repo, run_id);
        self.post_empty(&route).await
    }

    async fn rerun_failed_jobs(&self, owner: &str, repo: &str, run_id: u64) -> anyhow::Result<()> {
        debug!("Re-running failed jobs of run {} in {}/{}", run_id, owner, repo);
        let route = format!(
            "/repos/{}/{}/actions/runs/{}/rerun-failed-jobs",
            owner, repo, run_id
        );
        self.post_empty(&route).await
    }
}

fn convert_pull_request(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    PullRequest {
        number: pr.number,
        title: pr.title.clone().unwrap_or_default(),
        author: pr
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        head_sha: pr.head.sha.clone(),
        mergeable: pr.mergeable,
        mergeable_state: pr.mergeable_state.as_ref().map(convert_mergeable_state),
        updated_at: pr.updated_at.unwrap_or_else(chrono::Utc::now),
        html_url: pr
            .html_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_default(),
    }
}

/// octocrab's enum is non-exhaustive; anything new is `Unknown`
fn convert_mergeable_state(state: &octocrab::models::pulls::MergeableState) -> MergeableState {
    use octocrab::models::pulls::MergeableState as OMS;
    match state {
        OMS::Clean => MergeableState::Clean,
        OMS::Behind => MergeableState::Behind,
        OMS::Dirty => MergeableState::Dirty,
        OMS::Blocked => MergeableState::Blocked,
        OMS::Unstable => MergeableState::Unstable,
        OMS::Draft => MergeableState::Draft,
        OMS::HasHooks => MergeableState::HasHooks,
        _ => MergeableState::Unknown,
    }
}

/// Unrecognised status states count as pending
fn convert_status_state(state: &octocrab::models::StatusState) -> CheckState {
    match state {
        octocrab::models::StatusState::Success => CheckState::Success,
        octocrab::models::StatusState::Pending => CheckState::Pending,
        octocrab::models::StatusState::Failure => CheckState::Failure,
        octocrab::models::StatusState::Error => CheckState::Error,
        _ => CheckState::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Answers a single request with `200 OK` and `body`
    async fn serve_once(body: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let base = serve_once("{\"login\": ").await;
        let client = OctocrabClient::from_token("ghp_test", &base).unwrap();

        let err = client.fetch_current_user().await.unwrap_err();
        let api = ApiError::find(&err).unwrap();
        assert_eq!(api.kind, ApiErrorKind::Decode);
        assert_eq!(api.status, None);
        assert!(!api.is_network());
    }

    #[test]
    fn test_convert_status_state() {
        use octocrab::models::StatusState;
        assert_eq!(convert_status_state(&StatusState::Success), CheckState::Success);
        assert_eq!(convert_status_state(&StatusState::Failure), CheckState::Failure);
        assert_eq!(convert_status_state(&StatusState::Error), CheckState::Error);
        assert_eq!(convert_status_state(&StatusState::Pending), CheckState::Pending);
    }

    #[test]
    fn test_convert_mergeable_state() {
        use octocrab::models::pulls::MergeableState as OMS;
        assert_eq!(convert_mergeable_state(&OMS::Dirty), MergeableState::Dirty);
        assert_eq!(convert_mergeable_state(&OMS::Behind), MergeableState::Behind);
        assert_eq!(convert_mergeable_state(&OMS::Draft), MergeableState::Draft);
    }

    #[test]
    fn test_graphql_auto_merge_payload() {
        let json = r#"{
            "data": {"repository": {"pullRequest": {"autoMergeRequest": {
                "enabledAt": "2024-05-01T10:00:00Z",
                "enabledBy": {"login": "octocat"},
                "mergeMethod": "SQUASH"
            }}}}
        }"#;
        let response: GraphQlResponse<AutoMergeData> = serde_json::from_str(json).unwrap();
        let node = response
            .data
            .and_then(|d| d.repository)
            .and_then(|r| r.pull_request)
            .and_then(|pr| pr.auto_merge_request)
            .unwrap();
        assert_eq!(node.enabled_by.map(|u| u.login).as_deref(), Some("octocat"));
        assert_eq!(node.merge_method.as_deref(), Some("SQUASH"));
    }

    #[test]
    fn test_graphql_without_auto_merge() {
        let json = r#"{"data": {"repository": {"pullRequest": {"autoMergeRequest": null}}}}"#;
        let response: GraphQlResponse<AutoMergeData> = serde_json::from_str(json).unwrap();
        assert!(response
            .data
            .and_then(|d| d.repository)
            .and_then(|r| r.pull_request)
            .and_then(|pr| pr.auto_merge_request)
            .is_none());
    }
}
