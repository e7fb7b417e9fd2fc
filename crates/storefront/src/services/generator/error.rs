//! Error types for the seed generator.

use thiserror::Error;

/// Errors that can occur when generating seed products.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error.
    #[error("API error ({status}): {message}")]
    Api {
        /// Status reported by the API.
        status: String,
        /// Error message.
        message: String,
    },

    /// Rate limited or out of quota.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse the response.
    #[error("parse error: {0}")]
    Parse(String),

    /// No generator is configured.
    #[error("generator not configured")]
    NotConfigured,

    /// The response contained no usable products.
    #[error("generator returned no valid products")]
    Empty,
}

/// Error envelope returned by the Generative Language API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Nested error details.
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    /// HTTP-like code.
    #[serde(default)]
    pub code: u16,
    /// Error message.
    pub message: String,
    /// Canonical status (e.g. `INVALID_ARGUMENT`).
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_error_display() {
        let err = GeneratorError::RateLimited(60);
        assert_eq!(err.to_string(), "rate limited, retry after 60 seconds");

        let err = GeneratorError::Api {
            status: "INVALID_ARGUMENT".to_string(),
            message: "bad schema".to_string(),
        };
        assert_eq!(err.to_string(), "API error (INVALID_ARGUMENT): bad schema");
    }

    #[test]
    fn test_api_error_deserialization() {
        let json = r#"{
            "error": {
                "code": 400,
                "message": "API key not valid.",
                "status": "INVALID_ARGUMENT"
            }
        }"#;

        let response: ApiErrorResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(response.error.code, 400);
        assert_eq!(response.error.status, "INVALID_ARGUMENT");
        assert_eq!(response.error.message, "API key not valid.");
    }
}
