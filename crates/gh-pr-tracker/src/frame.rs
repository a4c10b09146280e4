//! Render frames and the presentation sink
//!
//! The orchestrator never draws anything. It hands immutable [`RenderFrame`]s
//! and a few status callbacks to a [`FrameSink`], which a terminal or web
//! adapter implements.

use crate::auto_merge::TrackedPullRequest;
use crate::cache::Enrichment;
use crate::check_rules::CheckRuleTable;
use crate::ci_status::CiSummary;
use crate::failure_details::{details_url, failed_items, running_items, CiItem};
use crate::merge_readiness::{classify, MergeReadiness};
use crate::restart::restart_candidates;
use crate::reviews::ReviewSummary;
use crate::signals::collect_signals;
use chrono::{DateTime, Utc};
use gh_client::{AuthMethod, CiState, MergeableState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one polling attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FetchEpoch(pub u64);

impl FetchEpoch {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for FetchEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch #{}", self.0)
    }
}

/// Identifies one rendering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisplayEpoch(pub u64);

impl DisplayEpoch {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for DisplayEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display #{}", self.0)
    }
}

/// Whether the restart-CI action applies to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartAvailability {
    /// Nothing failed that could be restarted
    NotApplicable,
    Available,
    /// Something could be restarted, but OAuth tokens lack the scope
    RequiresToken,
}

/// One rendered pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrRow {
    pub pr: TrackedPullRequest,
    pub ci: CiSummary,
    pub reviews: ReviewSummary,
    pub mergeable: Option<bool>,
    pub mergeable_state: Option<MergeableState>,
    pub readiness: MergeReadiness,
    pub restart: RestartAvailability,
    pub details_url: String,
    pub failed_items: Vec<CiItem>,
    pub running_items: Vec<CiItem>,
}

impl PrRow {
    pub fn build(
        pr: &TrackedPullRequest,
        enrichment: &Enrichment,
        rules: &CheckRuleTable,
        auth_method: AuthMethod,
        now: DateTime<Utc>,
    ) -> Self {
        let snapshot = &enrichment.ci;
        let signals = collect_signals(
            &snapshot.check_runs,
            &snapshot.statuses,
            &snapshot.workflow_runs,
            rules,
        );
        let ci = CiSummary::from_signals(&signals);
        let mergeability = enrichment.mergeability;
        let readiness = classify(
            mergeability.mergeable,
            mergeability.mergeable_state,
            enrichment.reviews.approvals,
            ci.state,
        );

        let summary = &pr.summary;
        let failing = ci.state == CiState::Failure;
        let failed = if failing {
            failed_items(&snapshot.check_runs, &snapshot.statuses, &snapshot.workflow_runs)
        } else {
            Vec::new()
        };
        let running = if matches!(ci.state, CiState::Failure | CiState::Pending) {
            running_items(&snapshot.check_runs, &snapshot.workflow_runs, now)
        } else {
            Vec::new()
        };
        let details = if failing {
            details_url(&summary.repo_full_name, summary.number, &snapshot.workflow_runs)
        } else {
            details_url(&summary.repo_full_name, summary.number, &[])
        };

        let restart = if !failing
            || restart_candidates(&snapshot.check_runs, &snapshot.workflow_runs).is_empty()
        {
            RestartAvailability::NotApplicable
        } else if auth_method == AuthMethod::Token {
            RestartAvailability::Available
        } else {
            RestartAvailability::RequiresToken
        };

        Self {
            pr: pr.clone(),
            ci,
            reviews: enrichment.reviews,
            mergeable: mergeability.mergeable,
            mergeable_state: mergeability.mergeable_state,
            readiness,
            restart,
            details_url: details,
            failed_items: failed,
            running_items: running,
        }
    }
}

/// Complete, immutable result of one display pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderFrame {
    pub display_epoch: DisplayEpoch,
    /// `None` for passes triggered by a filter change
    pub fetch_epoch: Option<FetchEpoch>,
    pub is_auto_refresh: bool,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<PrRow>,
    /// PRs before filtering
    pub total_prs: usize,
    /// Set when `rows` is empty
    pub empty_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayProgress {
    pub display_epoch: DisplayEpoch,
    pub done: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Error,
    Warning,
    Success,
    Info,
}

/// Transient user-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }
}

/// Loading indicator of the PR list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadingState {
    Idle,
    Loading,
    Loaded,
    Error(String),
}

/// Consumer of orchestrator output
///
/// Called from async tasks; implementations must not block for long.
pub trait FrameSink: Send + Sync {
    /// A display pass finished and is still current
    fn frame(&self, frame: &RenderFrame);

    fn progress(&self, _progress: &DisplayProgress) {}

    fn notice(&self, _notice: &Notice) {}

    fn loading(&self, _state: &LoadingState) {}
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn frame(&self, _frame: &RenderFrame) {}
}
