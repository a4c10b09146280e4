use anyhow::Context;
use gh_pr_tracker_config::AppConfig;
use gh_pr_tracker_server::{build_router, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load();
    let addr = format!("{}:{}", config.bind_address, config.port);
    log::info!(
        "Serving {} with GitHub API at {}",
        config.static_dir,
        config.api_base_url
    );

    let state = AppState::new(config)?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Shutting down");
        })
        .await?;

    Ok(())
}
