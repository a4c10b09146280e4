//! Scripted GitHub client and recording sink for tests

use crate::auto_merge::TrackedPullRequest;
use crate::frame::{DisplayProgress, FrameSink, LoadingState, Notice, RenderFrame};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use gh_client::{
    ApiError, AutoMergeRequest, CheckRun, CheckState, CheckStatus, CommitStatus, CurrentUser,
    GitHubClient, MergeableState, PullRequest, PullRequestSummary, Review, WorkflowRun,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn base_time() -> DateTime<Utc> {
    "2024-06-01T12:00:00Z".parse().unwrap()
}

/// Search hit updated `minutes` after [`base_time`]
pub fn pr_summary(repo: &str, number: u64, author: &str, minutes: i64) -> PullRequestSummary {
    PullRequestSummary {
        repo_full_name: repo.to_string(),
        number,
        title: format!("PR {}", number),
        author_login: author.to_string(),
        updated_at: base_time() + ChronoDuration::minutes(minutes),
        html_url: format!("https://github.com/{}/pull/{}", repo, number),
        repository_archived: Some(false),
    }
}

pub fn tracked(summary: PullRequestSummary) -> TrackedPullRequest {
    TrackedPullRequest::new(summary)
}

pub fn pull_request(number: u64, head_sha: &str) -> PullRequest {
    PullRequest {
        number,
        title: format!("PR {}", number),
        author: "me".to_string(),
        head_sha: head_sha.to_string(),
        mergeable: Some(true),
        mergeable_state: Some(MergeableState::Clean),
        updated_at: base_time(),
        html_url: String::new(),
    }
}

#[derive(Default)]
struct MockState {
    login: String,
    searches: VecDeque<Vec<PullRequestSummary>>,
    pulls: HashMap<(String, u64), PullRequest>,
    reviews: HashMap<(String, u64), Vec<Review>>,
    check_runs: HashMap<String, Vec<CheckRun>>,
    statuses: HashMap<String, Vec<CommitStatus>>,
    workflow_runs: HashMap<String, Vec<WorkflowRun>>,
    auto_merge: HashMap<(String, u64), Result<Option<AutoMergeRequest>, String>>,
    failures: HashMap<&'static str, ApiError>,
    reruns: HashMap<(&'static str, u64), ApiError>,
    delays: HashMap<(String, u64), Duration>,
    search_delay: Option<Duration>,
    calls: HashMap<&'static str, usize>,
    rerun_log: Vec<String>,
}

/// `GitHubClient` answering from scripted data
///
/// Unscripted PRs get a mergeable, clean PR with head sha `sha<number>`, no
/// reviews, no CI and auto-merge off.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    pub fn new(login: &str) -> Self {
        let client = Self::default();
        client.state.lock().unwrap().login = login.to_string();
        client
    }

    /// Queue a search result; the last queued result keeps being returned
    pub fn push_search(&self, prs: Vec<PullRequestSummary>) {
        self.state.lock().unwrap().searches.push_back(prs);
    }

    pub fn set_pull(&self, repo: &str, pr: PullRequest) {
        self.state
            .lock()
            .unwrap()
            .pulls
            .insert((repo.to_string(), pr.number), pr);
    }

    pub fn set_reviews(&self, repo: &str, number: u64, reviews: Vec<Review>) {
        self.state
            .lock()
            .unwrap()
            .reviews
            .insert((repo.to_string(), number), reviews);
    }

    pub fn set_check_runs(&self, sha: &str, runs: Vec<CheckRun>) {
        self.state
            .lock()
            .unwrap()
            .check_runs
            .insert(sha.to_string(), runs);
    }

    pub fn set_statuses(&self, sha: &str, statuses: Vec<CommitStatus>) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(sha.to_string(), statuses);
    }

    pub fn set_workflow_runs(&self, sha: &str, runs: Vec<WorkflowRun>) {
        self.state
            .lock()
            .unwrap()
            .workflow_runs
            .insert(sha.to_string(), runs);
    }

    pub fn set_auto_merge(
        &self,
        repo: &str,
        number: u64,
        result: Result<Option<AutoMergeRequest>, String>,
    ) {
        self.state
            .lock()
            .unwrap()
            .auto_merge
            .insert((repo.to_string(), number), result);
    }

    /// Make every call of `method` fail with `error`
    pub fn fail(&self, method: &'static str, error: ApiError) {
        self.state.lock().unwrap().failures.insert(method, error);
    }

    /// Make one rerun method fail for one id
    pub fn fail_rerun(&self, method: &'static str, id: u64, error: ApiError) {
        self.state.lock().unwrap().reruns.insert((method, id), error);
    }

    /// Delay `fetch_pull_request` for one PR
    pub fn set_delay(&self, repo: &str, number: u64, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert((repo.to_string(), number), delay);
    }

    /// Delay every search
    pub fn set_search_delay(&self, delay: Duration) {
        self.state.lock().unwrap().search_delay = Some(delay);
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    /// Rerun calls in order, as `method:id`
    pub fn rerun_log(&self) -> Vec<String> {
        self.state.lock().unwrap().rerun_log.clone()
    }

    fn record(&self, method: &'static str) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(method).or_default() += 1;
        match state.failures.get(method) {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }

    fn rerun(&self, method: &'static str, id: u64) -> anyhow::Result<()> {
        self.record(method)?;
        let mut state = self.state.lock().unwrap();
        state.rerun_log.push(format!("{}:{}", method, id));
        match state.reruns.get(&(method, id)) {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }
}

fn key(owner: &str, repo: &str, number: u64) -> (String, u64) {
    (format!("{}/{}", owner, repo), number)
}

#[async_trait]
impl GitHubClient for MockClient {
    async fn fetch_current_user(&self) -> anyhow::Result<CurrentUser> {
        self.record("fetch_current_user")?;
        Ok(CurrentUser {
            login: self.state.lock().unwrap().login.clone(),
            avatar_url: None,
        })
    }

    async fn search_pull_requests(&self, _query: &str) -> anyhow::Result<Vec<PullRequestSummary>> {
        self.record("search_pull_requests")?;
        let delay = self.state.lock().unwrap().search_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        let result = if state.searches.len() > 1 {
            state.searches.pop_front()
        } else {
            state.searches.front().cloned()
        };
        Ok(result.unwrap_or_default())
    }

    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<PullRequest> {
        self.record("fetch_pull_request")?;
        let key = key(owner, repo, pr_number);
        let delay = self.state.lock().unwrap().delays.get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .pulls
            .get(&key)
            .cloned()
            .unwrap_or_else(|| pull_request(pr_number, &format!("sha{}", pr_number))))
    }

    async fn fetch_reviews(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Vec<Review>> {
        self.record("fetch_reviews")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .reviews
            .get(&key(owner, repo, pr_number))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_check_runs(
        &self,
        _owner: &str,
        _repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<Vec<CheckRun>> {
        self.record("fetch_check_runs")?;
        let state = self.state.lock().unwrap();
        Ok(state.check_runs.get(commit_sha).cloned().unwrap_or_default())
    }

    async fn fetch_commit_status(
        &self,
        _owner: &str,
        _repo: &str,
        commit_sha: &str,
    ) -> anyhow::Result<CheckStatus> {
        self.record("fetch_commit_status")?;
        let state = self.state.lock().unwrap();
        let statuses = state.statuses.get(commit_sha).cloned().unwrap_or_default();
        Ok(CheckStatus {
            state: CheckState::Pending,
            total_count: statuses.len() as u64,
            statuses,
        })
    }

    async fn fetch_workflow_runs(
        &self,
        _owner: &str,
        _repo: &str,
        head_sha: &str,
    ) -> anyhow::Result<Vec<WorkflowRun>> {
        self.record("fetch_workflow_runs")?;
        let state = self.state.lock().unwrap();
        Ok(state.workflow_runs.get(head_sha).cloned().unwrap_or_default())
    }

    async fn fetch_auto_merge_request(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> anyhow::Result<Option<AutoMergeRequest>> {
        self.record("fetch_auto_merge_request")?;
        let state = self.state.lock().unwrap();
        match state.auto_merge.get(&key(owner, repo, pr_number)) {
            Some(Ok(request)) => Ok(request.clone()),
            Some(Err(message)) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(None),
        }
    }

    async fn rerequest_check_run(
        &self,
        _owner: &str,
        _repo: &str,
        check_run_id: u64,
    ) -> anyhow::Result<()> {
        self.rerun("rerequest_check_run", check_run_id)
    }

    async fn rerun_workflow(&self, _owner: &str, _repo: &str, run_id: u64) -> anyhow::Result<()> {
        self.rerun("rerun_workflow", run_id)
    }

    async fn rerun_failed_jobs(
        &self,
        _owner: &str,
        _repo: &str,
        run_id: u64,
    ) -> anyhow::Result<()> {
        self.rerun("rerun_failed_jobs", run_id)
    }
}

/// `FrameSink` keeping everything it was handed
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<RenderFrame>>,
    progress: Mutex<Vec<DisplayProgress>>,
    notices: Mutex<Vec<Notice>>,
    loading: Mutex<Vec<LoadingState>>,
}

impl RecordingSink {
    pub fn frames(&self) -> Vec<RenderFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn last_frame(&self) -> Option<RenderFrame> {
        self.frames.lock().unwrap().last().cloned()
    }

    pub fn progress_events(&self) -> Vec<DisplayProgress> {
        self.progress.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn loading_states(&self) -> Vec<LoadingState> {
        self.loading.lock().unwrap().clone()
    }
}

impl FrameSink for RecordingSink {
    fn frame(&self, frame: &RenderFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }

    fn progress(&self, progress: &DisplayProgress) {
        self.progress.lock().unwrap().push(progress.clone());
    }

    fn notice(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }

    fn loading(&self, state: &LoadingState) {
        self.loading.lock().unwrap().push(state.clone());
    }
}
