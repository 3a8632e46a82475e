//! Error types for scout-ai

use thiserror::Error;

/// Result type alias using scout-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when calling a model backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limited: retry after {retry_after:?} seconds")]
    RateLimited { retry_after: Option<u64> },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Both the primary and the fallback model failed
    #[error("Fallback model also failed: {fallback} (primary: {primary})")]
    FallbackExhausted {
        primary: Box<Error>,
        fallback: Box<Error>,
    },
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Wrap the two failures of a primary/fallback pair
    pub fn fallback_exhausted(primary: Error, fallback: Error) -> Self {
        Self::FallbackExhausted {
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    }

    /// Check if this error looks like a rate limit or overload
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::RateLimited { .. } => true,
            Error::Api {
                error_type,
                message,
            } => {
                let et = error_type.to_lowercase();
                let msg = message.to_lowercase();
                et.contains("rate_limit")
                    || et.contains("resource_exhausted")
                    || msg.contains("rate limit")
                    || msg.contains("too many requests")
                    || msg.contains("quota")
            }
            Error::FallbackExhausted { fallback, .. } => fallback.is_rate_limited(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_typed_variant() {
        assert!(Error::RateLimited { retry_after: Some(5) }.is_rate_limited());
    }

    #[test]
    fn test_rate_limited_api_error_type() {
        let e = Error::api("rate_limit_error", "slow down");
        assert!(e.is_rate_limited());
    }

    #[test]
    fn test_rate_limited_gemini_quota() {
        let e = Error::api("RESOURCE_EXHAUSTED", "Quota exceeded for requests per minute");
        assert!(e.is_rate_limited());
    }

    #[test]
    fn test_not_rate_limited_auth() {
        let e = Error::api("invalid_request_error", "Invalid API key");
        assert!(!e.is_rate_limited());
        assert!(!Error::InvalidApiKey.is_rate_limited());
    }

    #[test]
    fn test_fallback_exhausted_mentions_both() {
        let e = Error::fallback_exhausted(
            Error::api("server_error", "primary down"),
            Error::Auth("bad key".into()),
        );
        let text = e.to_string();
        assert!(text.contains("primary down"), "got: {}", text);
        assert!(text.contains("bad key"), "got: {}", text);
    }

    #[test]
    fn test_fallback_exhausted_rate_limit_follows_fallback() {
        let e = Error::fallback_exhausted(
            Error::Auth("nope".into()),
            Error::RateLimited { retry_after: None },
        );
        assert!(e.is_rate_limited());
    }
}
