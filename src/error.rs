//! Typed error taxonomy for the exchange gateway and the LLM client.
//!
//! `SizingRejection` from the error taxonomy is deliberately not a variant
//! here — `should_trade = false` is ordinary control flow carried on
//! `KellyResult`, not an error.

use thiserror::Error;

/// Errors surfaced by the exchange gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Fatal at startup: missing credentials, unreadable or malformed key material.
    #[error("configuration error: {0}")]
    Config(String),

    /// Signing failure, or a 401 from the exchange. Fatal for the failing
    /// request, not for the cycle.
    #[error("authentication error: {0}")]
    Auth(String),

    /// 429 after retries exhausted.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Last observed `Retry-After` value, in seconds.
        retry_after_secs: u64,
    },

    /// 4xx/5xx other than 429.
    #[error("api error: {status} {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or a short message describing the failure.
        message: String,
    },

    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// A path-shaped identifier (ticker, order id) failed validation
    /// before a request was sent.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl GatewayError {
    /// True for failures a caller may retry without changing its request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("timeout: {err}"))
        } else if err.is_connect() {
            Self::Transport(format!("connection failed: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Api {
            status: 0,
            message: format!("parse error: {err}"),
        }
    }
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors surfaced by the LLM client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider returned something other than valid JSON, or the call
    /// failed outright. Recovered by the caller — the feed is dropped for
    /// the current cycle.
    #[error("llm error: {0}")]
    Provider(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Provider(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_retryable() {
        let err = GatewayError::RateLimited {
            retry_after_secs: 2,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn client_error_is_not_retryable() {
        let err = GatewayError::Api {
            status: 400,
            message: "bad request".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_error_is_retryable() {
        let err = GatewayError::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_error_display() {
        let err = GatewayError::Auth("signing failed".into());
        assert!(err.to_string().contains("signing failed"));
    }
}
