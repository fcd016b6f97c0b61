//! Faucet service for an Ethereum-compatible chain
//!
//! Sends a fixed amount from one custodial account to any requested address,
//! guarded by:
//! - a per-origin fixed-window rate limit
//! - a balance ceiling ("greed") check, memoized in a TTL cache
//! - per-address serialization of concurrent requests
//!
//! The HTTP layer lives in [`api`]; upstream access goes through [`rpc::ChainClient`].

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod limiter;
pub mod locks;
pub mod metrics;
pub mod rpc;
pub mod service;
pub mod signer;

pub use cache::AbuseCache;
pub use config::{DispensePolicy, FaucetConfig};
pub use error::{FaucetError, FaucetResult};
pub use limiter::RateLimiter;
pub use rpc::{BlockState, ChainClient, JsonRpcClient, TransactionIntent, TxHash};
pub use service::{DispenseResponse, FaucetService, FaucetStatus};
