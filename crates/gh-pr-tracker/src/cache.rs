//! Per-PR enrichment cache
//!
//! Entries are keyed by PR identity plus `updated_at`, so any change to the PR
//! lands under a new key. Writing a new key prunes the older keys of the same
//! PR, leaving at most one entry per `(repo, number)`.

use crate::reviews::ReviewSummary;
use chrono::{DateTime, Utc};
use gh_client::{CacheMode, CheckRun, CommitStatus, MergeableState, WorkflowRun};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cache key: PR identity at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub repo: String,
    pub number: u64,
    pub updated_at: DateTime<Utc>,
}

impl CacheKey {
    pub fn new(repo: impl Into<String>, number: u64, updated_at: DateTime<Utc>) -> Self {
        Self {
            repo: repo.into(),
            number,
            updated_at,
        }
    }

    fn same_pr(&self, other: &CacheKey) -> bool {
        self.number == other.number && self.repo == other.repo
    }
}

/// Raw CI records of the head commit
///
/// Kept unreduced so failure details and restart candidates can be derived
/// from a cached entry without another round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiSnapshot {
    /// `None` when PR details could not be fetched; no CI was looked up then
    pub head_sha: Option<String>,
    pub check_runs: Vec<CheckRun>,
    pub statuses: Vec<CommitStatus>,
    pub workflow_runs: Vec<WorkflowRun>,
}

/// GitHub's own mergeability fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mergeability {
    pub mergeable: Option<bool>,
    pub mergeable_state: Option<MergeableState>,
}

/// Everything fetched for one PR beyond the search hit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub ci: CiSnapshot,
    pub reviews: ReviewSummary,
    pub mergeability: Mergeability,
}

#[derive(Debug, Default)]
pub struct EnrichmentCache {
    entries: HashMap<CacheKey, Enrichment>,
}

impl EnrichmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry, honouring the read side of `mode`
    pub fn get(&self, key: &CacheKey, mode: CacheMode) -> Option<&Enrichment> {
        if !mode.should_read() {
            return None;
        }
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Store an entry and drop every other entry of the same PR
    ///
    /// Does nothing when `mode` forbids writes.
    pub fn insert(&mut self, key: CacheKey, enrichment: Enrichment, mode: CacheMode) {
        if !mode.should_write() {
            return;
        }

        let before = self.entries.len();
        self.entries
            .retain(|existing, _| existing == &key || !existing.same_pr(&key));
        let pruned = before - self.entries.len();
        if pruned > 0 {
            log::debug!(
                "Pruned {} stale cache entr{} for {}#{}",
                pruned,
                if pruned == 1 { "y" } else { "ies" },
                key.repo,
                key.number
            );
        }

        self.entries.insert(key, enrichment);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
