//! GitHub PR tracker core
//!
//! Reconciles GitHub's three CI mechanisms (check runs, commit statuses and
//! workflow runs) into one verdict per pull request, combines it with reviews
//! and GitHub's mergeability into a merge-readiness state, and keeps a live
//! list of the user's pull requests consistent while polling.
//!
//! ```text
//! ┌──────────────┐  FetchEpoch   ┌───────────────┐  DisplayEpoch  ┌───────────┐
//! │ orchestrator │──────────────►│  enrichment   │───────────────►│ FrameSink │
//! │  (Tracker)   │               │  (+ cache)    │  RenderFrame   │ (adapter) │
//! └──────┬───────┘               └───────┬───────┘                └───────────┘
//!        │ GitHubClient                  │ signals → ci_status
//!        ▼                               ▼ reviews → merge_readiness
//!     GitHub                          PrRow
//! ```

pub mod auto_merge;
pub mod cache;
pub mod check_rules;
pub mod ci_status;
pub mod enrichment;
pub mod error;
pub mod failure_details;
pub mod filters;
pub mod frame;
pub mod merge_readiness;
pub mod orchestrator;
pub mod restart;
pub mod reviews;
pub mod signals;

#[cfg(test)]
pub(crate) mod test_support;

pub use auto_merge::{AutoMergeInfo, TrackedPullRequest};
pub use cache::{CacheKey, CiSnapshot, Enrichment, EnrichmentCache, Mergeability};
pub use check_rules::{CheckRule, CheckRuleTable, DEFAULT_OPTIONAL_PATTERNS};
pub use ci_status::{aggregate, CiSummary};
pub use error::FetchError;
pub use failure_details::CiItem;
pub use filters::FilterState;
pub use frame::{
    DisplayEpoch, DisplayProgress, FetchEpoch, FrameSink, LoadingState, Notice, NoticeLevel,
    NullSink, PrRow, RenderFrame, RestartAvailability,
};
pub use merge_readiness::{classify, MergeReadiness};
pub use orchestrator::{DisplayOutcome, FetchOutcome, Tracker, TrackerSettings};
pub use restart::{RestartFailureReason, RestartReport};
pub use reviews::{summarize_reviews, ReviewSummary};
pub use signals::{CheckSignal, SignalKind};
