//! GitHub API client for the PR tracker
//!
//! This crate provides a trait-based GitHub API client. The tracker only ever
//! talks to the [`GitHubClient`] trait, which keeps the refresh logic testable
//! with scripted clients.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              GitHubClient trait                  │
//! │  - search_pull_requests()                        │
//! │  - fetch_check_runs() / fetch_commit_status()    │
//! │  - fetch_workflow_runs()                         │
//! │  - fetch_auto_merge_request() (GraphQL)          │
//! │  - rerequest_check_run() / rerun_workflow()      │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!              ┌─────────────────┐
//!              │ OctocrabClient  │
//!              │ (direct API)    │
//!              └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_client::{GitHubClient, OctocrabClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = OctocrabClient::from_token("ghp_token", "https://api.github.com")?;
//! let me = client.fetch_current_user().await?;
//! let prs = client
//!     .search_pull_requests(&format!("involves:{} is:pr is:open", me.login))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod octocrab_client;
pub mod token;
pub mod types;

/// Default GitHub host (public GitHub)
pub const DEFAULT_HOST: &str = "github.com";

pub use client::{CacheMode, GitHubClient};
pub use error::{ApiError, ApiErrorKind};
pub use octocrab_client::OctocrabClient;
pub use token::{ResolvedToken, TokenResolver, TokenSource};
pub use types::{
    is_personal_access_token, AuthMethod, AutoMergeRequest, CheckConclusion, CheckRun,
    CheckRunOutput, CheckRunStatus, CheckState, CheckStatus, CiState, CommitStatus, CurrentUser,
    MergeableState, PullRequest, PullRequestSummary, Review, ReviewState, ReviewUser, WorkflowRun,
    WorkflowRunConclusion, WorkflowRunStatus,
};

// Re-export octocrab so consumers don't need to depend on it directly
pub use octocrab;
