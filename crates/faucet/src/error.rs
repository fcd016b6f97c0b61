//! Error types for the faucet service

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use faucet_common::ValidationError;
use serde_json::json;
use thiserror::Error;

/// Faucet service errors
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] ValidationError),

    #[error("Rate limit exceeded: try again in {0} seconds")]
    RateLimitExceeded(u64),

    /// The target already holds more than the greed ceiling.
    #[error("User is greedy.")]
    Greedy,

    #[error("RPC error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FaucetError {
    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FaucetError::InvalidAddress(_) => "invalid_address",
            FaucetError::RateLimitExceeded(_) => "rate_limited",
            FaucetError::Greedy => "greedy",
            FaucetError::Upstream(_) => "upstream",
            FaucetError::Config(_) => "config",
            FaucetError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FaucetError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            FaucetError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            FaucetError::Greedy => StatusCode::FORBIDDEN,
            FaucetError::Upstream(_) => StatusCode::BAD_GATEWAY,
            FaucetError::Config(_) | FaucetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            FaucetError::InvalidAddress(_) => "INVALID_ADDRESS",
            FaucetError::RateLimitExceeded(_) => "RATE_LIMIT_EXCEEDED",
            FaucetError::Greedy => "GREEDY",
            FaucetError::Upstream(_) => "RPC_ERROR",
            FaucetError::Config(_) => "CONFIG_ERROR",
            FaucetError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            FaucetError::RateLimitExceeded(seconds) => Some(*seconds),
            _ => None,
        };

        let body = Json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));

        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_distinct_per_kind() {
        let malformed = FaucetError::from(ValidationError::MalformedAddress("0x12".to_string()));
        assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(FaucetError::RateLimitExceeded(10).status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(FaucetError::Greedy.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(FaucetError::Upstream("down".into()).status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_rate_limit_response_has_retry_after() {
        let response = FaucetError::RateLimitExceeded(42).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_messages() {
        assert_eq!(FaucetError::Greedy.to_string(), "User is greedy.");
        assert_eq!(FaucetError::Greedy.kind(), "greedy");
        assert!(FaucetError::Upstream("nonce too low".into())
            .to_string()
            .contains("nonce too low"));
    }
}
