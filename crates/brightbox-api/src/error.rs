//! Brightbox API error types

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the Brightbox API and Orbit clients
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx response from the API, with the structured error body when present
    #[error("{status} {error_name}: {}", .errors.join("; "))]
    Api {
        status: u16,
        error_name: String,
        errors: Vec<String>,
    },

    /// Token endpoint rejected the grant
    #[error("oauth2: {error}: {description}")]
    OAuth { error: String, description: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status of an API error, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the remote object does not exist (HTTP 404)
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Build an API error from a failed response body.
    ///
    /// Brightbox answers with `{"error_name": ..., "errors": [...]}`; anything
    /// else is kept verbatim as the single message.
    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) if parsed.error_name.is_some() || !parsed.errors.is_empty() => {
                ApiError::Api {
                    status,
                    error_name: parsed.error_name.unwrap_or_else(|| "unknown".to_string()),
                    errors: parsed.errors,
                }
            }
            _ => ApiError::Api {
                status,
                error_name: "http_error".to_string(),
                errors: if body.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![body.trim().to_string()]
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_name: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_structured_body() {
        let err = ApiError::from_body(
            404,
            r#"{"error_name":"missing_resource","errors":["Resource not found"]}"#,
        );
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "404 missing_resource: Resource not found");
    }

    #[test]
    fn test_from_plain_body() {
        let err = ApiError::from_body(502, "Bad Gateway");
        assert_eq!(err.status(), Some(502));
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "502 http_error: Bad Gateway");
    }
}
