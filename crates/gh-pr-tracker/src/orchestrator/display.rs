//! Display sequencing

use super::{DisplayInProgress, DisplayOutcome, Tracker, TrackerState};
use crate::auto_merge::TrackedPullRequest;
use crate::cache::{CacheKey, Enrichment};
use crate::enrichment::fetch_enrichment;
use crate::error::FetchError;
use crate::frame::{
    DisplayEpoch, DisplayProgress, FetchEpoch, LoadingState, PrRow, RenderFrame,
};
use chrono::Utc;
use gh_client::CacheMode;
use tokio_util::sync::CancellationToken;

fn is_superseded(
    state: &TrackerState,
    display_epoch: DisplayEpoch,
    fetch_epoch: Option<FetchEpoch>,
    token: &CancellationToken,
) -> bool {
    state.display_epoch != display_epoch
        || fetch_epoch.is_some_and(|epoch| epoch != state.fetch_epoch)
        || token.is_cancelled()
}

impl Tracker {
    /// Render `prs` under the current filters
    ///
    /// Enrichment comes from the cache on auto-refresh passes and from GitHub
    /// otherwise. The pass gives up as soon as a newer display or fetch exists,
    /// leaving the frame and cache to the newer pass.
    pub(crate) async fn display(
        &self,
        prs: Vec<TrackedPullRequest>,
        fetch_epoch: Option<FetchEpoch>,
        is_auto_refresh: bool,
        token: CancellationToken,
    ) -> DisplayOutcome {
        let (display_epoch, filters) = {
            let mut state = self.inner.state();
            state.display_epoch = state.display_epoch.next();
            state.display_in_progress = true;
            (state.display_epoch, state.filters.clone())
        };
        let _in_progress = DisplayInProgress {
            inner: &self.inner,
            epoch: display_epoch,
        };

        let now = Utc::now();
        let visible = filters.apply(&prs, now);
        let mode = CacheMode::for_refresh(is_auto_refresh);
        let settings = &self.inner.settings;
        let total = visible.len();
        let mut rows = Vec::with_capacity(total);
        log::debug!("{}: rendering {} of {} PRs", display_epoch, total, prs.len());

        for (index, pr) in visible.iter().enumerate() {
            let key = CacheKey::new(
                pr.summary.repo_full_name.clone(),
                pr.summary.number,
                pr.summary.updated_at,
            );

            let cached = {
                let state = self.inner.state();
                if is_superseded(&state, display_epoch, fetch_epoch, &token) {
                    drop(state);
                    return self.abandon(display_epoch);
                }
                state.cache.get(&key, mode).cloned()
            };

            let enrichment = match cached {
                Some(enrichment) => enrichment,
                None => {
                    let fetched =
                        fetch_enrichment(self.inner.client.as_ref(), &pr.summary, &token).await;
                    match fetched {
                        Ok(enrichment) => {
                            let mut state = self.inner.state();
                            if is_superseded(&state, display_epoch, fetch_epoch, &token) {
                                drop(state);
                                return self.abandon(display_epoch);
                            }
                            state.cache.insert(key, enrichment.clone(), mode);
                            enrichment
                        }
                        Err(FetchError::Cancelled) => return self.abandon(display_epoch),
                        Err(FetchError::Api(e)) => {
                            log::warn!(
                                "{}: enrichment failed for {}#{}: {:#}",
                                display_epoch,
                                pr.summary.repo_full_name,
                                pr.summary.number,
                                e
                            );
                            Enrichment::default()
                        }
                    }
                }
            };

            rows.push(PrRow::build(
                pr,
                &enrichment,
                &settings.rules,
                settings.auth_method,
                now,
            ));
            self.inner.sink.progress(&DisplayProgress {
                display_epoch,
                done: index + 1,
                total,
            });
        }

        let frame = RenderFrame {
            display_epoch,
            fetch_epoch,
            is_auto_refresh,
            generated_at: now,
            empty_message: rows
                .is_empty()
                .then(|| filters.empty_message().to_string()),
            rows,
            total_prs: prs.len(),
        };

        {
            let mut state = self.inner.state();
            if is_superseded(&state, display_epoch, fetch_epoch, &token) {
                drop(state);
                return self.abandon(display_epoch);
            }
            state.frame = Some(frame.clone());
        }

        self.inner.sink.frame(&frame);
        self.inner.sink.loading(&LoadingState::Loaded);
        log::debug!("{}: committed", display_epoch);
        DisplayOutcome::Completed { visible: total }
    }

    fn abandon(&self, display_epoch: DisplayEpoch) -> DisplayOutcome {
        log::debug!("{}: superseded", display_epoch);
        DisplayOutcome::Superseded
    }
}
