//! Periodic refresh
//!
//! A background task ticks every refresh interval and runs an auto-refresh
//! fetch when the list is visible and idle. The task only holds a weak
//! reference, so dropping every [`Tracker`] handle ends it.

use super::{FetchOutcome, Tracker, TrackerInner};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

impl Tracker {
    /// Pause polling while hidden; resume, without an immediate fetch, when
    /// shown again
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_visible(&self, visible: bool) {
        let resume = {
            let mut state = self.inner.state();
            state.visible = visible;
            visible && state.auto_refresh_enabled && state.loaded_once && !state.limit_reached
        };

        if resume {
            log::debug!("Visible again, resuming periodic refresh");
            self.start_refresh_timer();
        } else if !visible {
            log::debug!("Hidden, pausing periodic refresh");
            self.stop_refresh_timer();
        }
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        let start = {
            let mut state = self.inner.state();
            state.auto_refresh_enabled = enabled;
            enabled && state.visible && !state.limit_reached
        };

        if start {
            self.start_refresh_timer();
        } else {
            self.stop_refresh_timer();
        }
    }

    /// Change the cadence; a running timer restarts with it
    pub fn set_refresh_interval(&self, interval: Duration) {
        let restart = {
            let mut state = self.inner.state();
            state.refresh_interval = interval.max(MIN_REFRESH_INTERVAL);
            state.refresh.is_some()
        };

        if restart {
            self.start_refresh_timer();
        }
    }

    pub fn is_refresh_running(&self) -> bool {
        self.inner.state().refresh.is_some()
    }

    /// Stop polling and cancel any live fetch
    pub fn shutdown(&self) {
        let mut state = self.inner.state();
        if let Some(refresh) = state.refresh.take() {
            refresh.cancel();
        }
        state.fetch_token.cancel();
    }

    /// (Re)start the timer; the first tick comes one interval from now
    pub(crate) fn start_refresh_timer(&self) {
        let stop = CancellationToken::new();
        let period = {
            let mut state = self.inner.state();
            if let Some(previous) = state.refresh.replace(stop.clone()) {
                previous.cancel();
            }
            state.refresh_interval.max(MIN_REFRESH_INTERVAL)
        };

        log::debug!("Periodic refresh every {:?}", period);
        tokio::spawn(run_timer(Arc::downgrade(&self.inner), period, stop));
    }

    pub(crate) fn stop_refresh_timer(&self) {
        if let Some(refresh) = self.inner.state().refresh.take() {
            refresh.cancel();
        }
    }

    fn should_tick(&self) -> bool {
        let state = self.inner.state();
        state.visible
            && state.auto_refresh_enabled
            && !state.limit_reached
            && !state.fetch_in_progress
            && !state.display_in_progress
    }
}

async fn run_timer(inner: Weak<TrackerInner>, period: Duration, stop: CancellationToken) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticks.tick() => {}
        }

        let Some(inner) = inner.upgrade() else {
            break;
        };
        let tracker = Tracker { inner };
        if !tracker.should_tick() {
            log::debug!("Skipping refresh tick");
            continue;
        }

        if tracker.fetch_pull_requests(true).await == FetchOutcome::LimitReached {
            break;
        }
    }
}
