//! Fetch lifecycle: Idle → Fetching → {Discarded, Displaying} → Idle

use super::{FetchInProgress, FetchOutcome, Tracker};
use crate::auto_merge::{filter_by_merge_responsibility, TrackedPullRequest};
use crate::error::{cancellable, FetchError};
use crate::frame::{LoadingState, Notice};
use gh_client::ApiError;
use tokio_util::sync::CancellationToken;

impl Tracker {
    /// Fetch the PR list and display it
    ///
    /// Returns immediately with [`FetchOutcome::Skipped`] while another fetch
    /// is running; calls are not queued.
    pub async fn fetch_pull_requests(&self, is_auto_refresh: bool) -> FetchOutcome {
        let (epoch, token, filters_at_start) = {
            let mut state = self.inner.state();
            if state.limit_reached {
                return FetchOutcome::LimitReached;
            }
            if state.fetch_in_progress {
                log::debug!("Fetch already in progress, skipping");
                return FetchOutcome::Skipped;
            }

            state.fetch_attempts += 1;
            if state.fetch_attempts > self.inner.settings.max_fetch_attempts {
                state.limit_reached = true;
                if let Some(refresh) = state.refresh.take() {
                    refresh.cancel();
                }
                drop(state);

                let limit = self.inner.settings.max_fetch_attempts;
                log::error!("Stopping after {} fetch attempts", limit);
                let message = format!(
                    "Stopped refreshing after {} attempts. Reload to start again.",
                    limit
                );
                self.inner.sink.notice(&Notice::error(message.clone()));
                self.inner.sink.loading(&LoadingState::Error(message));
                return FetchOutcome::LimitReached;
            }

            state.fetch_token.cancel();
            state.fetch_epoch = state.fetch_epoch.next();
            state.fetch_token = CancellationToken::new();
            state.fetch_in_progress = true;
            (
                state.fetch_epoch,
                state.fetch_token.clone(),
                state.filters.clone(),
            )
        };
        let in_progress = FetchInProgress { inner: &self.inner };

        log::debug!(
            "{} started ({})",
            epoch,
            if is_auto_refresh { "auto" } else { "manual" }
        );
        if !is_auto_refresh {
            self.inner.sink.loading(&LoadingState::Loading);
        }

        let result = self.load_pull_requests(&token).await;
        drop(in_progress);

        let prs = match result {
            Ok(prs) => prs,
            Err(FetchError::Cancelled) => {
                log::debug!("{} cancelled", epoch);
                return FetchOutcome::Cancelled;
            }
            Err(FetchError::Api(e)) => {
                if ApiError::find(&e).and_then(|api| api.status) == Some(401) {
                    log::warn!("{}: GitHub rejected the credentials", epoch);
                    self.inner.sink.loading(&LoadingState::Idle);
                    return FetchOutcome::NotAuthenticated;
                }
                let message = format!("Failed to fetch pull requests: {:#}", e);
                log::error!("{}: {}", epoch, message);
                self.inner.sink.notice(&Notice::error(message.clone()));
                self.inner
                    .sink
                    .loading(&LoadingState::Error(message.clone()));
                return FetchOutcome::Failed(message);
            }
        };

        let serialized = serde_json::to_string(&prs)
            .inspect_err(|e| log::warn!("Failed to serialize PR list: {}", e))
            .ok();

        let start_refresh = {
            let mut state = self.inner.state();
            if state.fetch_epoch != epoch || token.is_cancelled() || state.filters != filters_at_start
            {
                log::debug!("{} is stale, discarding {} PRs", epoch, prs.len());
                return FetchOutcome::Discarded;
            }

            if is_auto_refresh
                && serialized.is_some()
                && state.last_serialized == serialized
            {
                log::debug!("{}: no changes", epoch);
                return FetchOutcome::Unchanged;
            }

            state.all_prs = prs.clone();
            state.last_serialized = serialized;
            let first_load = !state.loaded_once;
            state.loaded_once = true;
            first_load && !is_auto_refresh && state.auto_refresh_enabled && state.refresh.is_none()
        };

        log::info!("{}: {} pull requests", epoch, prs.len());
        if start_refresh {
            self.start_refresh_timer();
        }

        let outcome = self
            .display(prs, Some(epoch), is_auto_refresh, token)
            .await;
        FetchOutcome::Displayed(outcome)
    }

    /// user → search → drop archived → auto-merge filter → newest first
    async fn load_pull_requests(
        &self,
        token: &CancellationToken,
    ) -> Result<Vec<TrackedPullRequest>, FetchError> {
        let client = self.inner.client.as_ref();

        let user = cancellable(token, client.fetch_current_user()).await?;
        let query = format!("involves:{} is:pr is:open", user.login);
        let found = cancellable(token, client.search_pull_requests(&query)).await?;

        let active: Vec<_> = found
            .into_iter()
            .filter(|pr| pr.repository_archived != Some(true))
            .collect();

        let mut prs = filter_by_merge_responsibility(client, active, &user.login, token).await?;
        prs.sort_by(|a, b| b.summary.updated_at.cmp(&a.summary.updated_at));
        Ok(prs)
    }
}
