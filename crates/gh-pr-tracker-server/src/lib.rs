//! HTTP surface for the PR tracker web UI
//!
//! Serves the static UI and a small set of JSON endpoints that keep the
//! GitHub token in an HttpOnly cookie and forward authenticated calls to the
//! REST, GraphQL and OAuth device-flow APIs.

pub mod device;
pub mod error;
pub mod health;
pub mod proxy;
pub mod session;

use axum::routing::{any, get, post};
use axum::Router;
use gh_pr_tracker_config::AppConfig;
use std::sync::Arc;
use tower_http::services::ServeDir;

pub use error::ProxyError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            inner: Arc::new(AppStateInner { config, http }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn oauth_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.config.oauth_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Assemble every route; anything that is not an API path falls through to
/// the static directory.
pub fn build_router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config().static_dir);

    Router::new()
        .route("/api/auth-status", get(session::auth_status))
        .route("/api/auth-set-token", post(session::auth_set_token))
        .route("/api/auth-clear-token", post(session::auth_clear_token))
        .route("/api/github-proxy/{*path}", any(proxy::rest_proxy))
        .route("/api/github-graphql", post(proxy::graphql_proxy))
        .route("/api/github-device-code", post(device::device_code))
        .route("/api/github-device-token", post(device::device_token))
        .route("/health", get(health::health_handler))
        .fallback_service(static_dir)
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_health() {
        let response = send(
            default_state(),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_auth_status_without_cookies() {
        let response = send(
            default_state(),
            Request::get("/api/auth-status").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "authenticated": false, "auth_method": "oauth" })
        );
    }

    #[tokio::test]
    async fn test_auth_status_with_token_cookie() {
        let request = Request::get("/api/auth-status")
            .header(
                header::COOKIE,
                "github_access_token=ghp_abc; auth_method=token",
            )
            .body(Body::empty())
            .unwrap();
        let response = send(default_state(), request).await;
        assert_eq!(
            body_json(response).await,
            json!({ "authenticated": true, "auth_method": "token" })
        );
    }

    #[tokio::test]
    async fn test_set_token_sets_both_cookies() {
        let request = json_request(
            "POST",
            "/api/auth-set-token",
            json!({ "access_token": "ghp_secret", "auth_method": "token" }),
        );
        let response = send(default_state(), request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            cookies,
            vec![
                "github_access_token=ghp_secret; HttpOnly; SameSite=Lax; Secure; Path=/; Max-Age=2592000"
                    .to_string(),
                "auth_method=token; HttpOnly; SameSite=Lax; Secure; Path=/; Max-Age=2592000"
                    .to_string(),
            ]
        );
        assert_eq!(body_json(response).await, json!({ "success": true }));
    }

    #[tokio::test]
    async fn test_set_token_defaults_to_oauth() {
        let request = json_request(
            "POST",
            "/api/auth-set-token",
            json!({ "access_token": "gho_device" }),
        );
        let response = send(default_state(), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert!(cookies[1].to_str().unwrap().starts_with("auth_method=oauth;"));
    }

    #[tokio::test]
    async fn test_set_token_requires_token() {
        let request = json_request("POST", "/api/auth-set-token", json!({}));
        let response = send(default_state(), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "access_token is required" })
        );
    }

    #[tokio::test]
    async fn test_set_token_rejects_non_pat_for_token_method() {
        let request = json_request(
            "POST",
            "/api/auth-set-token",
            json!({ "access_token": "gho_device", "auth_method": "token" }),
        );
        let response = send(default_state(), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_clear_token_expires_cookies() {
        let request = Request::post("/api/auth-clear-token")
            .body(Body::empty())
            .unwrap();
        let response = send(default_state(), request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.ends_with("Max-Age=0")));
        assert_eq!(body_json(response).await, json!({ "success": true }));
    }

    #[tokio::test]
    async fn test_static_fallback_serves_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>tracker</h1>").unwrap();
        let state = AppState::new(AppConfig {
            static_dir: dir.path().to_string_lossy().into_owned(),
            ..AppConfig::default()
        })
        .unwrap();

        let response = send(
            state,
            Request::get("/index.html").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<h1>tracker</h1>");
    }

    #[test]
    fn test_upstream_urls() {
        let state = AppState::new(AppConfig {
            api_base_url: "https://ghe.example.com/api/v3/".to_string(),
            ..AppConfig::default()
        })
        .unwrap();
        assert_eq!(
            state.api_url("/repos/o/r/pulls?state=open"),
            "https://ghe.example.com/api/v3/repos/o/r/pulls?state=open"
        );
        assert_eq!(
            state.oauth_url("login/device/code"),
            "https://github.com/login/device/code"
        );
    }
}
