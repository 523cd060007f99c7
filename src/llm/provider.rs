use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::error::InvocationError;

/// A text-in, text-out LLM backend.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn invoke(&self, prompt: &str, timeout: Duration) -> Result<String, InvocationError>;
    fn name(&self) -> &str;
}

/// Maps a failed send or body read. Timeouts can surface from either.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration, backend: &str) -> InvocationError {
    if err.is_timeout() {
        InvocationError::Timeout(timeout)
    } else if err.is_decode() {
        InvocationError::Api(format!("Failed to parse {} response: {}", backend, err))
    } else {
        InvocationError::Network(format!("{} request failed: {}", backend, err))
    }
}

/// Maps a non-success HTTP status. 429 and 5xx (including Anthropic's 529
/// "overloaded") are transient and end up retryable.
pub(crate) fn status_error(status: StatusCode, body: String, backend: &str) -> InvocationError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        InvocationError::RateLimited(body)
    } else if status.is_server_error() {
        InvocationError::Network(format!("{} server error ({}): {}", backend, status, body))
    } else {
        InvocationError::Api(format!("{} API error ({}): {}", backend, status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    #[test]
    fn test_rate_limit_status() {
        let err = status_error(status(429), "slow down".to_string(), "Claude");
        assert_eq!(err, InvocationError::RateLimited("slow down".to_string()));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        for code in [500, 502, 503, 529] {
            let err = status_error(status(code), String::new(), "Claude");
            assert!(matches!(err, InvocationError::Network(_)), "{} -> {:?}", code, err);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_client_errors_are_final() {
        for code in [400, 401, 404] {
            let err = status_error(status(code), "bad".to_string(), "OpenAI");
            assert!(matches!(err, InvocationError::Api(_)), "{} -> {:?}", code, err);
            assert!(!err.is_retryable());
        }
    }
}
