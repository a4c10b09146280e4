//! Display filters
//!
//! Filters narrow what is rendered, never what is fetched: the full list from
//! the last successful fetch is kept so a filter change can re-render without
//! another search.

use crate::auto_merge::TrackedPullRequest;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Repository substring and age cutoff
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    /// Lower-cased substring of `owner/name`; empty matches everything
    pub repo_query: String,
    /// Only PRs updated within this many days; 0 disables the cutoff
    pub age_days: u32,
}

impl FilterState {
    pub fn new(repo_query: impl AsRef<str>, age_days: u32) -> Self {
        Self {
            repo_query: repo_query.as_ref().trim().to_lowercase(),
            age_days,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.repo_query.is_empty() || self.age_days > 0
    }

    /// Oldest `updated_at` still shown
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.age_days > 0).then(|| now - Duration::days(i64::from(self.age_days)))
    }

    pub fn matches(&self, pr: &TrackedPullRequest, now: DateTime<Utc>) -> bool {
        let repo_ok = self.repo_query.is_empty()
            || pr
                .summary
                .repo_full_name
                .to_lowercase()
                .contains(&self.repo_query);
        let age_ok = self
            .cutoff(now)
            .is_none_or(|cutoff| pr.summary.updated_at >= cutoff);
        repo_ok && age_ok
    }

    /// PRs passing the filter, order preserved
    pub fn apply(&self, prs: &[TrackedPullRequest], now: DateTime<Utc>) -> Vec<TrackedPullRequest> {
        prs.iter()
            .filter(|pr| self.matches(pr, now))
            .cloned()
            .collect()
    }

    /// Message shown when nothing is left to render
    pub fn empty_message(&self) -> &'static str {
        if self.is_active() {
            "No pull requests match the current filters"
        } else {
            "No open pull requests found"
        }
    }
}
