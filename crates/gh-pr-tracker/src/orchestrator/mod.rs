//! Refresh orchestrator
//!
//! Owns the polling lifecycle of the PR list:
//!
//! ```text
//!  fetch_pull_requests ──► user ─► search ─► drop archived ─► auto-merge filter ─► sort
//!         │                                                                    │
//!         │ new FetchEpoch, cancels the previous one              unchanged? ──┤
//!         ▼                                                                    ▼
//!   periodic refresh ◄── first manual load                     display (new DisplayEpoch)
//!                                                                  │ per PR: cache or enrich
//!                                                                  ▼
//!                                                             FrameSink::frame
//! ```
//!
//! Exactly one fetch epoch and one display epoch are current at any time.
//! Work belonging to an older epoch re-checks after every network call and
//! never writes to the cache or the rendered frame once superseded.
//!
//! All shared state lives in one [`TrackerState`] behind a std mutex that is
//! never held across an `.await`.

mod display;
mod fetch;
mod refresh;

use crate::auto_merge::TrackedPullRequest;
use crate::cache::EnrichmentCache;
use crate::check_rules::CheckRuleTable;
use crate::filters::FilterState;
use crate::frame::{DisplayEpoch, FetchEpoch, FrameSink, Notice, RenderFrame};
use crate::restart::{self, RestartReport};
use anyhow::{anyhow, bail, Context, Result};
use gh_client::{AuthMethod, GitHubClient};
use gh_pr_tracker_config::AppConfig;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of one `fetch_pull_requests` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Another fetch was still running
    Skipped,
    /// The per-session attempt ceiling was hit
    LimitReached,
    /// GitHub rejected the credentials
    NotAuthenticated,
    /// A newer epoch or a filter change cancelled this one
    Cancelled,
    /// Finished, but stale by the time it finished
    Discarded,
    /// Auto-refresh produced the list already on screen
    Unchanged,
    Displayed(DisplayOutcome),
    Failed(String),
}

/// Result of one display pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// The frame was handed to the sink
    Completed { visible: usize },
    /// A newer display or fetch took over
    Superseded,
}

/// Tunables of a [`Tracker`]
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub rules: CheckRuleTable,
    pub max_fetch_attempts: u32,
    pub refresh_interval: Duration,
    pub auto_refresh: bool,
    pub restart_refresh_delay: Duration,
    pub auth_method: AuthMethod,
    pub initial_filters: FilterState,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), AuthMethod::default())
    }
}

impl TrackerSettings {
    pub fn from_config(config: &AppConfig, auth_method: AuthMethod) -> Self {
        Self {
            rules: CheckRuleTable::with_extra_patterns(&config.extra_optional_checks),
            max_fetch_attempts: config.max_fetch_attempts,
            refresh_interval: config.refresh_interval(),
            auto_refresh: config.auto_refresh,
            restart_refresh_delay: config.restart_refresh_delay(),
            auth_method,
            initial_filters: FilterState::new(&config.repo_filter, config.age_filter_days),
        }
    }
}

pub(crate) struct TrackerState {
    fetch_epoch: FetchEpoch,
    fetch_attempts: u32,
    fetch_in_progress: bool,
    /// Token of the live fetch epoch (or of the last filter pass)
    fetch_token: CancellationToken,
    display_epoch: DisplayEpoch,
    display_in_progress: bool,
    /// Serialized list of the last displayed fetch
    last_serialized: Option<String>,
    all_prs: Vec<TrackedPullRequest>,
    filters: FilterState,
    cache: EnrichmentCache,
    frame: Option<RenderFrame>,
    loaded_once: bool,
    limit_reached: bool,
    visible: bool,
    auto_refresh_enabled: bool,
    refresh_interval: Duration,
    /// Stops the periodic refresh task
    refresh: Option<CancellationToken>,
}

pub(crate) struct TrackerInner {
    client: Arc<dyn GitHubClient>,
    sink: Arc<dyn FrameSink>,
    settings: TrackerSettings,
    state: Mutex<TrackerState>,
}

impl TrackerInner {
    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears `fetch_in_progress` on drop, so a dropped fetch future still
/// returns the tracker to idle.
///
/// Must not be dropped while the state lock is held.
struct FetchInProgress<'a> {
    inner: &'a TrackerInner,
}

impl Drop for FetchInProgress<'_> {
    fn drop(&mut self) {
        self.inner.state().fetch_in_progress = false;
    }
}

/// Clears `display_in_progress` on drop unless a newer display owns it
///
/// Must not be dropped while the state lock is held.
struct DisplayInProgress<'a> {
    inner: &'a TrackerInner,
    epoch: DisplayEpoch,
}

impl Drop for DisplayInProgress<'_> {
    fn drop(&mut self) {
        let mut state = self.inner.state();
        if state.display_epoch == self.epoch {
            state.display_in_progress = false;
        }
    }
}

/// Handle to the orchestrator; cheap to clone
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

impl Tracker {
    pub fn new(
        client: Arc<dyn GitHubClient>,
        sink: Arc<dyn FrameSink>,
        settings: TrackerSettings,
    ) -> Self {
        let state = TrackerState {
            fetch_epoch: FetchEpoch::default(),
            fetch_attempts: 0,
            fetch_in_progress: false,
            fetch_token: CancellationToken::new(),
            display_epoch: DisplayEpoch::default(),
            display_in_progress: false,
            last_serialized: None,
            all_prs: Vec::new(),
            filters: settings.initial_filters.clone(),
            cache: EnrichmentCache::new(),
            frame: None,
            loaded_once: false,
            limit_reached: false,
            visible: true,
            auto_refresh_enabled: settings.auto_refresh,
            refresh_interval: settings.refresh_interval,
            refresh: None,
        };

        Self {
            inner: Arc::new(TrackerInner {
                client,
                sink,
                settings,
                state: Mutex::new(state),
            }),
        }
    }

    /// Last committed frame
    pub fn current_frame(&self) -> Option<RenderFrame> {
        self.inner.state().frame.clone()
    }

    pub fn filters(&self) -> FilterState {
        self.inner.state().filters.clone()
    }

    pub fn fetch_epoch(&self) -> FetchEpoch {
        self.inner.state().fetch_epoch
    }

    /// Change the display filters and re-render the last fetched list
    ///
    /// Cancels the live fetch epoch: its results were computed for the old
    /// filters.
    pub async fn apply_filters(&self, filters: FilterState) -> DisplayOutcome {
        let (prs, token) = {
            let mut state = self.inner.state();
            if state.filters == filters {
                log::debug!("Filters unchanged, cancelling the live fetch and re-rendering anyway");
            }
            state.filters = filters;
            state.fetch_token.cancel();
            state.fetch_token = CancellationToken::new();
            (state.all_prs.clone(), state.fetch_token.clone())
        };
        self.display(prs, None, false, token).await
    }

    /// Restart failed CI of one PR and schedule a refresh
    pub async fn restart_failed_ci(&self, repo_full_name: &str, number: u64) -> Result<RestartReport> {
        match self.try_restart(repo_full_name, number).await {
            Ok(report) => {
                for notice in report.notices() {
                    self.inner.sink.notice(&notice);
                }
                if report.total > 0 {
                    self.schedule_refresh(self.inner.settings.restart_refresh_delay);
                }
                Ok(report)
            }
            Err(e) => {
                self.inner
                    .sink
                    .notice(&Notice::error(format!("Failed to restart checks: {:#}", e)));
                Err(e)
            }
        }
    }

    async fn try_restart(&self, repo_full_name: &str, number: u64) -> Result<RestartReport> {
        if self.inner.settings.auth_method != AuthMethod::Token {
            bail!("restarting CI requires a personal access token");
        }
        let (owner, repo) = repo_full_name
            .split_once('/')
            .ok_or_else(|| anyhow!("malformed repository name {:?}", repo_full_name))?;

        let client = self.inner.client.as_ref();
        let pr = client
            .fetch_pull_request(owner, repo, number)
            .await
            .with_context(|| format!("loading {}#{}", repo_full_name, number))?;
        let (check_runs, workflow_runs) = tokio::try_join!(
            client.fetch_check_runs(owner, repo, &pr.head_sha),
            client.fetch_workflow_runs(owner, repo, &pr.head_sha),
        )?;

        Ok(restart::restart_failed_ci(client, owner, repo, &check_runs, &workflow_runs).await)
    }

    /// Manual refresh after `delay`
    fn schedule_refresh(&self, delay: Duration) {
        let tracker = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            log::info!("Refreshing after CI restart");
            tracker.fetch_pull_requests(false).await;
        });
    }

    #[cfg(test)]
    pub(crate) fn cache_len(&self) -> usize {
        self.inner.state().cache.len()
    }
}
