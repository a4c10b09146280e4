//! Terminal watcher
//!
//! Resolves a token the way `gh` users expect, loads the user's open pull
//! requests once and keeps the list refreshed until Ctrl-C.

mod console;
mod logger;

use anyhow::Context;
use console::ConsoleSink;
use gh_client::{OctocrabClient, TokenResolver};
use gh_pr_tracker::{FetchOutcome, Tracker, TrackerSettings};
use gh_pr_tracker_config::AppConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log_file = logger::init()?;
    log::info!("Logging to {}", log_file.display());

    let config = AppConfig::load();
    let resolved = TokenResolver::new()
        .resolve(None)
        .await
        .context("No GitHub token available")?;
    log::info!("Using token from {:?}", resolved.source);

    let client = OctocrabClient::from_token(resolved.token.clone(), &config.api_base_url)?;
    let settings = TrackerSettings::from_config(&config, resolved.auth_method());
    let tracker = Tracker::new(Arc::new(client), Arc::new(ConsoleSink), settings);

    match tracker.fetch_pull_requests(false).await {
        FetchOutcome::NotAuthenticated => {
            anyhow::bail!("GitHub rejected the token; run 'gh auth login' or set GITHUB_TOKEN")
        }
        FetchOutcome::Failed(message) => log::warn!("Initial load failed: {}", message),
        outcome => log::debug!("Initial load finished: {:?}", outcome),
    }

    if config.auto_refresh {
        eprintln!(
            "Refreshing every {}s, press Ctrl-C to quit",
            config.refresh_interval().as_secs()
        );
        tokio::signal::ctrl_c().await?;
    }

    tracker.shutdown();
    Ok(())
}
