//! Typed upstream errors
//!
//! Trait methods return `anyhow::Result`, but failures that came back from
//! GitHub are wrapped in an [`ApiError`] so callers can downcast and branch on
//! the HTTP status (e.g. to explain why a CI restart was refused).

use thiserror::Error;

/// How far a request got before it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// GitHub answered with a non-2xx status
    Http,
    /// No response, e.g. DNS, TLS or a dropped connection
    Network,
    /// GitHub answered, but the body was not what we expected
    Decode,
}

/// An error reported by (or on the way to) the GitHub API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{}", self.describe())]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP status, set only for [`ApiErrorKind::Http`]
    pub status: Option<u16>,
    /// Message from GitHub's error body, or the underlying error text
    pub message: String,
}

impl ApiError {
    /// Error for a non-2xx response
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            status: Some(status),
            message: message.into(),
        }
    }

    /// Error for a request that never got a response
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            status: None,
            message: message.into(),
        }
    }

    /// Error for a response body that could not be parsed
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Decode,
            status: None,
            message: message.into(),
        }
    }

    /// Whether the request failed before GitHub answered
    pub fn is_network(&self) -> bool {
        self.kind == ApiErrorKind::Network
    }

    /// Find an `ApiError` inside an `anyhow::Error` chain
    pub fn find(err: &anyhow::Error) -> Option<&ApiError> {
        err.chain().find_map(|cause| cause.downcast_ref::<ApiError>())
    }

    fn describe(&self) -> String {
        match (self.kind, self.status) {
            (ApiErrorKind::Http, Some(status)) => {
                format!("GitHub API error {}: {}", status, self.message)
            }
            (ApiErrorKind::Decode, _) => {
                format!("Unexpected response from GitHub: {}", self.message)
            }
            _ => format!("GitHub API request failed: {}", self.message),
        }
    }
}

impl From<octocrab::Error> for ApiError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                ApiError::http(source.status_code.as_u16(), source.message.clone())
            }
            octocrab::Error::Json { source, .. } => ApiError::decode(source.to_string()),
            octocrab::Error::Serde { source, .. } => ApiError::decode(source.to_string()),
            octocrab::Error::InvalidUtf8 { source, .. } => ApiError::decode(source.to_string()),
            other => ApiError::network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status() {
        let err = ApiError::http(403, "Resource not accessible by integration");
        assert_eq!(
            err.to_string(),
            "GitHub API error 403: Resource not accessible by integration"
        );
        assert!(!err.is_network());
    }

    #[test]
    fn test_find_through_anyhow_context() {
        let err = anyhow::Error::new(ApiError::http(422, "already running"))
            .context("rerun workflow 7");
        let found = ApiError::find(&err).unwrap();
        assert_eq!(found.status, Some(422));
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = ApiError::network("connection reset");
        assert!(err.is_network());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_decode_error_is_not_a_network_error() {
        let err = ApiError::decode("expected value at line 1 column 1");
        assert_eq!(err.status, None);
        assert!(!err.is_network());
        assert_eq!(
            err.to_string(),
            "Unexpected response from GitHub: expected value at line 1 column 1"
        );
    }
}
