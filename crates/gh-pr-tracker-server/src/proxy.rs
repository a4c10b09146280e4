//! Authenticated GitHub REST and GraphQL forwarding

use crate::error::ProxyError;
use crate::session::session_token;
use crate::AppState;
use axum::extract::{Path, RawQuery, State};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::CookieJar;
use bytes::Bytes;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Session cookie first, then whatever the caller sent
fn authorization(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    session_token(jar)
        .map(|token| format!("Bearer {}", token))
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
}

/// JSON body to forward, if the method carries one and it has content
fn forwarded_body(method: &Method, body: &Bytes) -> Result<Option<serde_json::Value>, ProxyError> {
    if *method == Method::GET || *method == Method::HEAD || body.is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ProxyError::bad_request(format!("Request body must be JSON: {}", e)))?;
    let empty = match &value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    };
    Ok((!empty).then_some(value))
}

/// Copy status, body and content type of a successful upstream response
async fn pass_through(
    response: reqwest::Response,
    headline: &'static str,
) -> Result<Response, ProxyError> {
    let status = response.status();
    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let body = response
        .bytes()
        .await
        .map_err(ProxyError::transport(headline))?;

    let mut out = (status, body).into_response();
    if let Some(content_type) = content_type {
        out.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(out)
}

/// `ANY /api/github-proxy/{*path}`
pub async fn rest_proxy(
    State(state): State<AppState>,
    jar: CookieJar,
    method: Method,
    headers: HeaderMap,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response, ProxyError> {
    const HEADLINE: &str = "GitHub API request failed";

    let target = match query {
        Some(query) => state.api_url(&format!("{}?{}", path, query)),
        None => state.api_url(&path),
    };
    log::debug!("Proxying {} {}", method, target);

    let mut request = state
        .http()
        .request(method.clone(), &target)
        .header(ACCEPT, GITHUB_ACCEPT);
    if let Some(auth) = authorization(&jar, &headers) {
        request = request.header(AUTHORIZATION, auth);
    }
    if let Some(json) = forwarded_body(&method, &body)? {
        request = request.json(&json);
    }

    let response = request.send().await.map_err(ProxyError::transport(HEADLINE))?;
    let status = response.status();
    if !status.is_success() {
        let details = response.text().await.unwrap_or_default();
        log::warn!("GitHub API error {} for {}", status, target);
        return Err(ProxyError::Upstream {
            status,
            error: format!("GitHub API error: {}", status),
            details,
            url: Some(target),
        });
    }

    pass_through(response, HEADLINE).await
}

/// `POST /api/github-graphql`
pub async fn graphql_proxy(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(query): Json<serde_json::Value>,
) -> Result<Response, ProxyError> {
    const HEADLINE: &str = "GitHub GraphQL API request failed";

    let mut request = state
        .http()
        .post(state.api_url("graphql"))
        .header(ACCEPT, GITHUB_ACCEPT)
        .json(&query);
    if let Some(auth) = authorization(&jar, &headers) {
        request = request.header(AUTHORIZATION, auth);
    }

    let response = request.send().await.map_err(ProxyError::transport(HEADLINE))?;
    let status = response.status();
    if !status.is_success() {
        let details = response.text().await.unwrap_or_default();
        log::warn!("GitHub GraphQL API error {}", status);
        return Err(ProxyError::Upstream {
            status,
            error: format!("GitHub GraphQL API error: {}", status),
            details,
            url: None,
        });
    }

    pass_through(response, HEADLINE).await
}
