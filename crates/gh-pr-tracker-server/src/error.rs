//! Handler errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Everything a handler can fail with
///
/// Rendered as `{error, details}` JSON; upstream failures keep GitHub's status.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Rejected before any upstream call
    #[error("{0}")]
    BadRequest(String),

    /// GitHub answered with a non-2xx status
    #[error("{error}")]
    Upstream {
        status: StatusCode,
        error: String,
        details: String,
        url: Option<String>,
    },

    /// The upstream request never got an answer
    #[error("{error}: {details}")]
    Transport { error: &'static str, details: String },
}

impl ProxyError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ProxyError::BadRequest(message.into())
    }

    /// Wrap a transport failure under a fixed headline
    pub fn transport(error: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |e| ProxyError::Transport {
            error,
            details: e.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ProxyError::BadRequest(message) => json!({ "error": message }),
            ProxyError::Upstream {
                error,
                details,
                url: Some(url),
                ..
            } => json!({ "error": error, "details": details, "url": url }),
            ProxyError::Upstream { error, details, .. } => {
                json!({ "error": error, "details": details })
            }
            ProxyError::Transport { error, details } => {
                log::error!("{}: {}", error, details);
                json!({ "error": error, "details": details })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProxyError::bad_request("access_token is required").status(),
            StatusCode::BAD_REQUEST
        );
        let upstream = ProxyError::Upstream {
            status: StatusCode::NOT_FOUND,
            error: "GitHub API error: 404 Not Found".to_string(),
            details: "{}".to_string(),
            url: None,
        };
        assert_eq!(upstream.status(), StatusCode::NOT_FOUND);
        assert_eq!(upstream.to_string(), "GitHub API error: 404 Not Found");
    }
}
