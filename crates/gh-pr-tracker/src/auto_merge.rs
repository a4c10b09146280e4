//! Auto-merge inclusion filter
//!
//! The `involves:` search also returns PRs where the user was merely mentioned
//! or asked for review. This filter narrows the list to the user's own PRs and
//! PRs where they turned on "merge when ready".

use crate::error::{cancellable, FetchError};
use chrono::{DateTime, Utc};
use gh_client::{AutoMergeRequest, GitHubClient, PullRequestSummary};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// An active auto-merge request, as attached to a tracked PR
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AutoMergeInfo {
    pub enabled_at: Option<DateTime<Utc>>,
    pub enabled_by_login: Option<String>,
    pub merge_method: Option<String>,
}

impl From<AutoMergeRequest> for AutoMergeInfo {
    fn from(request: AutoMergeRequest) -> Self {
        Self {
            enabled_at: request.enabled_at,
            enabled_by_login: request.enabled_by_login,
            merge_method: request.merge_method,
        }
    }
}

/// A pull request that made it through the inclusion filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPullRequest {
    #[serde(flatten)]
    pub summary: PullRequestSummary,
    pub auto_merge: Option<AutoMergeInfo>,
}

impl TrackedPullRequest {
    pub fn new(summary: PullRequestSummary) -> Self {
        Self {
            summary,
            auto_merge: None,
        }
    }
}

/// Outcome of the auto-merge lookup for one PR
#[derive(Debug, Clone, Copy)]
pub enum AutoMergeLookup<'a> {
    /// GitHub answered; `None` when auto-merge is off
    Found(Option<&'a AutoMergeRequest>),
    /// The lookup failed
    Failed,
}

/// Inclusion decision for one PR
///
/// Kept when the user authored it or enabled auto-merge on it. When the
/// auto-merge lookup failed only the user's own PRs are kept.
pub fn should_include(
    pr: &PullRequestSummary,
    lookup: AutoMergeLookup<'_>,
    current_user: &str,
) -> bool {
    let authored = pr.author_login == current_user;
    match lookup {
        AutoMergeLookup::Found(request) => {
            authored
                || request
                    .and_then(|r| r.enabled_by_login.as_deref())
                    .is_some_and(|login| login == current_user)
        }
        AutoMergeLookup::Failed => authored,
    }
}

/// Filter PRs by merge responsibility, one GraphQL lookup per PR
///
/// Lookups run one after another so a long list cannot fan out into a burst
/// of GraphQL calls. Only cancellation aborts the filter; lookup failures fall
/// back per PR.
pub async fn filter_by_merge_responsibility(
    client: &dyn GitHubClient,
    prs: Vec<PullRequestSummary>,
    current_user: &str,
    token: &CancellationToken,
) -> Result<Vec<TrackedPullRequest>, FetchError> {
    let mut kept = Vec::with_capacity(prs.len());

    for pr in prs {
        let lookup = match pr.owner_and_repo() {
            Some((owner, repo)) => {
                cancellable(
                    token,
                    client.fetch_auto_merge_request(owner, repo, pr.number),
                )
                .await
            }
            None => Err(FetchError::Api(anyhow::anyhow!(
                "malformed repository name {:?}",
                pr.repo_full_name
            ))),
        };

        let request = match lookup {
            Ok(request) => Some(request),
            Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
            Err(FetchError::Api(e)) => {
                log::warn!(
                    "Auto-merge lookup failed for {}#{}: {:#}",
                    pr.repo_full_name,
                    pr.number,
                    e
                );
                None
            }
        };

        let decision = match &request {
            Some(found) => AutoMergeLookup::Found(found.as_ref()),
            None => AutoMergeLookup::Failed,
        };

        if should_include(&pr, decision, current_user) {
            kept.push(TrackedPullRequest {
                auto_merge: request.flatten().map(AutoMergeInfo::from),
                summary: pr,
            });
        } else {
            log::debug!(
                "Dropping {}#{}: neither authored by nor auto-merged by {}",
                pr.repo_full_name,
                pr.number,
                current_user
            );
        }
    }

    Ok(kept)
}
