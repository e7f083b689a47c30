//! Error taxonomy for the client library.
//!
//! Every HTTP call resolves to `Result<T, ApiError>`: ordinary HTTP error
//! statuses are values, not panics. The variants follow the three error
//! families of the client:
//!
//! - **validation**: a required identifier was missing and no request was sent
//!   ([`ApiError::Validation`]);
//! - **transport**: a non-2xx response ([`ApiError::Http`]) or a network
//!   failure ([`ApiError::Network`]);
//! - **local**: encoding, decoding, credential storage, or file output.
//!
//! Stale responses discarded by [`Resource`](crate::resource::Resource) are
//! never turned into errors.
//!
//! `ApiError` is `Clone` so it can be stored in resource state and handed to
//! several subscribers.

use thiserror::Error;

/// Maximum number of error body characters kept in an error detail.
pub(crate) const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// A required parameter was missing; the request was never sent.
    #[error("{0}")]
    Validation(String),

    /// The server answered with a non-success status.
    #[error("request failed ({status}): {detail}")]
    Http { status: u16, detail: String },

    /// The server could not be reached.
    #[error("unable to reach the server: {0}")]
    Network(String),

    /// The response body did not match the expected contract.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built or encoded.
    #[error("request error: {0}")]
    Request(String),

    /// The credential store could not be read or written.
    #[error("credential store error: {0}")]
    Storage(String),

    /// A downloaded file could not be written.
    #[error("file error: {0}")]
    Io(String),
}

impl ApiError {
    /// HTTP status code, when the error came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server rejected the request for missing or invalid credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Builds an [`ApiError::Http`] from a status and a raw response body.
    ///
    /// FastAPI error bodies are `{"detail": "..."}` or, for request
    /// validation failures, `{"detail": [{"msg": "...", ...}, ...]}`. Other
    /// bodies are kept verbatim, truncated to [`MAX_ERROR_CHARS`].
    pub fn from_response(status: u16, body: &str) -> Self {
        ApiError::Http {
            status,
            detail: extract_detail(body),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if err.is_builder() {
            ApiError::Request(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

fn extract_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        match json.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(serde_json::Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if !messages.is_empty() {
                    return messages.join("; ");
                }
            }
            _ => {}
        }
    }
    sanitize_body(body)
}

fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    if trimmed.chars().count() > MAX_ERROR_CHARS {
        let truncated: String = trimmed.chars().take(MAX_ERROR_CHARS).collect();
        format!("{}...", truncated)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_extracted() {
        let err = ApiError::from_response(401, r#"{"detail":"Incorrect username or password"}"#);
        assert_eq!(
            err,
            ApiError::Http {
                status: 401,
                detail: "Incorrect username or password".to_string()
            }
        );
        assert!(err.is_unauthorized());
    }

    #[test]
    fn validation_detail_list_is_joined() {
        let body = r#"{"detail":[{"loc":["query","project_slug"],"msg":"field required"},{"msg":"value is not a valid integer"}]}"#;
        let err = ApiError::from_response(422, body);
        assert_eq!(
            err.to_string(),
            "request failed (422): field required; value is not a valid integer"
        );
    }

    #[test]
    fn plain_body_is_truncated() {
        let body = "x".repeat(500);
        let ApiError::Http { detail, .. } = ApiError::from_response(500, &body) else {
            panic!("expected http error");
        };
        assert_eq!(detail.chars().count(), MAX_ERROR_CHARS + 3);
        assert!(detail.ends_with("..."));
    }

    #[test]
    fn empty_body_has_placeholder() {
        let err = ApiError::from_response(502, "   ");
        assert_eq!(err.to_string(), "request failed (502): empty response body");
        assert_eq!(err.status(), Some(502));
        assert!(!err.is_unauthorized());
    }
}
