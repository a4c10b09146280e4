//! Error types and cancellation helpers for the refresh pipeline

use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Failure of a fetch or enrichment step
#[derive(Debug, Error)]
pub enum FetchError {
    /// The epoch this work belonged to was cancelled; never shown to the user
    #[error("request cancelled")]
    Cancelled,

    /// Any other failure talking to GitHub
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Run a network call unless (or until) `token` is cancelled
///
/// Cancellation drops the in-flight future, which aborts the underlying HTTP
/// request, and its eventual result or error is never observed.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    if token.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(FetchError::Cancelled),
        result = fut => result.map_err(FetchError::Api),
    }
}
