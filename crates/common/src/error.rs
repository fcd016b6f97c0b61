use thiserror::Error;

/// Errors raised while turning untrusted input into typed values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address did not have the canonical `0x` + 40 character shape.
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
