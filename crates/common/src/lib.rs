//! Shared types and utilities for the faucet workspace.

pub mod error;
pub mod types;
pub mod utils;

pub use error::ValidationError;
pub use types::{AccountAddress, Amount};
