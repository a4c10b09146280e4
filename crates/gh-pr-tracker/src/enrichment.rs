//! Per-PR enrichment
//!
//! Fetches what the search hit lacks: mergeability and head sha from the PR
//! itself, reviews, and the three CI sources of the head commit. Each piece
//! degrades on its own; only cancellation aborts the whole PR.

use crate::cache::{CiSnapshot, Enrichment, Mergeability};
use crate::error::{cancellable, FetchError};
use crate::reviews::{summarize_reviews, ReviewSummary};
use gh_client::{GitHubClient, PullRequestSummary};
use tokio_util::sync::CancellationToken;

/// Keep the value, or log and fall back on API errors; cancellation propagates
fn or_fallback<T>(
    result: Result<T, FetchError>,
    fallback: T,
    what: &str,
    pr: &PullRequestSummary,
) -> Result<T, FetchError> {
    match result {
        Ok(value) => Ok(value),
        Err(FetchError::Cancelled) => Err(FetchError::Cancelled),
        Err(FetchError::Api(e)) => {
            log::warn!(
                "Failed to fetch {} for {}#{}: {:#}",
                what,
                pr.repo_full_name,
                pr.number,
                e
            );
            Ok(fallback)
        }
    }
}

pub async fn fetch_enrichment(
    client: &dyn GitHubClient,
    pr: &PullRequestSummary,
    token: &CancellationToken,
) -> Result<Enrichment, FetchError> {
    let Some((owner, repo)) = pr.owner_and_repo() else {
        log::warn!("Malformed repository name {:?}", pr.repo_full_name);
        return Ok(Enrichment::default());
    };

    let (details, reviews) = tokio::join!(
        cancellable(token, client.fetch_pull_request(owner, repo, pr.number)),
        cancellable(token, client.fetch_reviews(owner, repo, pr.number)),
    );
    let details = or_fallback(details.map(Some), None, "PR details", pr)?;
    let reviews = or_fallback(
        reviews.map(|r| summarize_reviews(&r)),
        ReviewSummary::default(),
        "reviews",
        pr,
    )?;

    let Some(details) = details else {
        return Ok(Enrichment {
            ci: CiSnapshot::default(),
            reviews,
            mergeability: Mergeability::default(),
        });
    };

    let sha = details.head_sha.as_str();
    let (check_runs, status, workflow_runs) = tokio::join!(
        cancellable(token, client.fetch_check_runs(owner, repo, sha)),
        cancellable(token, client.fetch_commit_status(owner, repo, sha)),
        cancellable(token, client.fetch_workflow_runs(owner, repo, sha)),
    );
    let check_runs = or_fallback(check_runs, Vec::new(), "check runs", pr)?;
    let statuses = or_fallback(status.map(|s| s.statuses), Vec::new(), "commit status", pr)?;
    let workflow_runs = or_fallback(workflow_runs, Vec::new(), "workflow runs", pr)?;

    Ok(Enrichment {
        ci: CiSnapshot {
            head_sha: Some(details.head_sha.clone()),
            check_runs,
            statuses,
            workflow_runs,
        },
        reviews,
        mergeability: Mergeability {
            mergeable: details.mergeable,
            mergeable_state: details.mergeable_state,
        },
    })
}
