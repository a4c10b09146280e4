//! OAuth device flow relay
//!
//! The browser cannot call github.com's OAuth endpoints directly (no CORS), so
//! both steps go through here.

use crate::error::ProxyError;
use crate::AppState;
use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

#[derive(Debug, Default, Deserialize)]
pub struct DeviceCodeRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceTokenRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub device_code: Option<String>,
}

fn client_id(state: &AppState, requested: Option<String>) -> Result<String, ProxyError> {
    requested
        .filter(|id| !id.is_empty())
        .or_else(|| Some(state.config().client_id.clone()).filter(|id| !id.is_empty()))
        .ok_or_else(|| ProxyError::bad_request("client_id is required"))
}

/// `POST /api/github-device-code`
pub async fn device_code(
    State(state): State<AppState>,
    Json(request): Json<DeviceCodeRequest>,
) -> Result<Response, ProxyError> {
    const HEADLINE: &str = "Failed to get device code";

    let client_id = client_id(&state, request.client_id)?;
    let scope = request
        .scope
        .filter(|scope| !scope.is_empty())
        .unwrap_or_else(|| state.config().oauth_scope.clone());

    let response = state
        .http()
        .post(state.oauth_url("login/device/code"))
        .header(ACCEPT, "application/json")
        .form(&[("client_id", client_id.as_str()), ("scope", scope.as_str())])
        .send()
        .await
        .map_err(ProxyError::transport(HEADLINE))?;

    let status = response.status();
    if !status.is_success() {
        let details = response.text().await.unwrap_or_default();
        log::warn!("Device code request rejected with {}", status);
        return Err(ProxyError::Upstream {
            status,
            error: format!("GitHub device code API error: {}", status.as_u16()),
            details,
            url: None,
        });
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(ProxyError::transport(HEADLINE))?;
    Ok(Json(body).into_response())
}

/// `POST /api/github-device-token`
///
/// GitHub answers pending authorizations with 200 and an `error` field, so
/// whatever comes back is handed to the browser untouched.
pub async fn device_token(
    State(state): State<AppState>,
    Json(request): Json<DeviceTokenRequest>,
) -> Result<Response, ProxyError> {
    const HEADLINE: &str = "Failed to exchange token";

    let device_code = request
        .device_code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ProxyError::bad_request("device_code is required"))?;
    let client_id = client_id(&state, request.client_id)?;

    let response = state
        .http()
        .post(state.oauth_url("login/oauth/access_token"))
        .header(ACCEPT, "application/json")
        .form(&[
            ("client_id", client_id.as_str()),
            ("device_code", device_code.as_str()),
            ("grant_type", DEVICE_GRANT_TYPE),
        ])
        .send()
        .await
        .map_err(ProxyError::transport(HEADLINE))?;

    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(ProxyError::transport(HEADLINE))?;
    Ok((status, Json(body)).into_response())
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn upstream() -> Router {
        Router::new()
            .route(
                "/login/device/code",
                post(|Form(form): Form<HashMap<String, String>>| async move {
                    if form.get("client_id").map(String::as_str) == Some("bad") {
                        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "error": "nope" })));
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "device_code": "dc-1",
                            "user_code": "ABCD-1234",
                            "verification_uri": "https://github.com/login/device",
                            "expires_in": 900,
                            "interval": 5,
                            "echo_client_id": form.get("client_id"),
                            "echo_scope": form.get("scope"),
                        })),
                    )
                }),
            )
            .route(
                "/login/oauth/access_token",
                post(|Form(form): Form<HashMap<String, String>>| async move {
                    if form.get("device_code").map(String::as_str) == Some("pending") {
                        return Json(json!({ "error": "authorization_pending" }));
                    }
                    Json(json!({
                        "access_token": "gho_new",
                        "token_type": "bearer",
                        "echo_grant_type": form.get("grant_type"),
                    }))
                }),
            )
    }

    #[tokio::test]
    async fn test_device_code_uses_configured_client() {
        let state = state_with_upstream(upstream()).await;
        let expected_client = state.config().client_id.clone();
        let response = send(
            state,
            json_request("POST", "/api/github-device-code", json!({})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["user_code"], json!("ABCD-1234"));
        assert_eq!(body["echo_client_id"], json!(expected_client));
        assert_eq!(body["echo_scope"], json!("repo workflow"));
    }

    #[tokio::test]
    async fn test_device_code_forwards_requested_scope() {
        let state = state_with_upstream(upstream()).await;
        let response = send(
            state,
            json_request(
                "POST",
                "/api/github-device-code",
                json!({ "client_id": "Iv1.custom", "scope": "repo" }),
            ),
        )
        .await;
        let body = body_json(response).await;
        assert_eq!(body["echo_client_id"], json!("Iv1.custom"));
        assert_eq!(body["echo_scope"], json!("repo"));
    }

    #[tokio::test]
    async fn test_device_code_upstream_error() {
        let state = state_with_upstream(upstream()).await;
        let response = send(
            state,
            json_request(
                "POST",
                "/api/github-device-code",
                json!({ "client_id": "bad" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await,
            json!({
                "error": "GitHub device code API error: 422",
                "details": "{\"error\":\"nope\"}",
            })
        );
    }

    #[tokio::test]
    async fn test_device_token_exchange() {
        let state = state_with_upstream(upstream()).await;
        let response = send(
            state,
            json_request(
                "POST",
                "/api/github-device-token",
                json!({ "device_code": "dc-1" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "access_token": "gho_new",
                "token_type": "bearer",
                "echo_grant_type": "urn:ietf:params:oauth:grant-type:device_code",
            })
        );
    }

    #[tokio::test]
    async fn test_device_token_pending_is_passed_through() {
        let state = state_with_upstream(upstream()).await;
        let response = send(
            state,
            json_request(
                "POST",
                "/api/github-device-token",
                json!({ "device_code": "pending" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "authorization_pending" })
        );
    }

    #[tokio::test]
    async fn test_device_token_requires_device_code() {
        let response = send(
            default_state(),
            json_request("POST", "/api/github-device-token", json!({})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "device_code is required" })
        );
    }
}
