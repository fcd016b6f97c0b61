//! Faucet configuration

use crate::error::{FaucetError, FaucetResult};
use faucet_common::types::{Amount, WEI_PER_ETHER};
use faucet_common::utils::config::load_config;
use faucet_common::utils::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `FAUCET_RPC_URL`.
pub const ENV_PREFIX: &str = "FAUCET";

pub const FIFTEEN_MINUTES_SECS: u64 = 15 * 60;
pub const DEFAULT_MAX_REQUESTS_PER_WINDOW: u32 = 200;
pub const DEFAULT_DISPENSE_WEI: u128 = WEI_PER_ETHER;
pub const DEFAULT_GREED_CEILING_WEI: u128 = 10 * WEI_PER_ETHER;
pub const DEFAULT_GAS_PRICE_FLOOR_WEI: u128 = 2_000_000_000;
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;

/// Faucet service configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    /// Server address
    pub server_addr: String,

    /// Upstream JSON-RPC endpoint
    pub rpc_url: String,

    /// Faucet account private key (hex, optional 0x prefix)
    pub private_key: String,

    /// Faucet account address; when set it must match the key
    pub address: Option<String>,

    /// Chain id for EIP-155 signing; queried from the node when absent
    pub chain_id: Option<u64>,

    /// Amount sent per request (decimal wei)
    pub dispense_amount: String,

    /// Balance above which an address is refused (decimal wei)
    pub greed_ceiling: String,

    /// Lowest gas price ever submitted (decimal wei)
    pub gas_price_floor: String,

    /// Gas limit for transfers
    pub gas_limit: u64,

    /// Rate limit: maximum accepted requests per origin per window (0 disables)
    pub max_requests_per_window: u32,

    /// Rate limit: window length in seconds
    pub rate_limit_window_secs: u64,

    /// How long an observed balance is remembered
    pub abuse_cache_ttl_secs: u64,

    /// Serialize concurrent requests that target the same address
    pub serialize_by_address: bool,

    /// Upstream HTTP timeout in seconds
    pub rpc_timeout_secs: u64,

    /// Take the client origin from `X-Forwarded-For`
    pub trust_proxy: bool,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Expose `/metrics`
    pub metrics_enabled: bool,

    pub logging: LoggingConfig,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:9000".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            private_key: String::new(),
            address: None,
            chain_id: None,
            dispense_amount: DEFAULT_DISPENSE_WEI.to_string(),
            greed_ceiling: DEFAULT_GREED_CEILING_WEI.to_string(),
            gas_price_floor: DEFAULT_GAS_PRICE_FLOOR_WEI.to_string(),
            gas_limit: DEFAULT_GAS_LIMIT,
            max_requests_per_window: DEFAULT_MAX_REQUESTS_PER_WINDOW,
            rate_limit_window_secs: FIFTEEN_MINUTES_SECS,
            abuse_cache_ttl_secs: FIFTEEN_MINUTES_SECS,
            serialize_by_address: true,
            rpc_timeout_secs: 30,
            trust_proxy: true,
            cors_enabled: true,
            metrics_enabled: true,
            logging: LoggingConfig::default(),
        }
    }
}

// Keep the key out of logs.
impl fmt::Debug for FaucetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaucetConfig")
            .field("server_addr", &self.server_addr)
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("dispense_amount", &self.dispense_amount)
            .field("greed_ceiling", &self.greed_ceiling)
            .field("gas_price_floor", &self.gas_price_floor)
            .field("gas_limit", &self.gas_limit)
            .field("max_requests_per_window", &self.max_requests_per_window)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("abuse_cache_ttl_secs", &self.abuse_cache_ttl_secs)
            .field("serialize_by_address", &self.serialize_by_address)
            .field("rpc_timeout_secs", &self.rpc_timeout_secs)
            .field("trust_proxy", &self.trust_proxy)
            .field("cors_enabled", &self.cors_enabled)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("logging", &self.logging)
            .finish()
    }
}

impl FaucetConfig {
    /// Defaults, overlaid by an optional file, overlaid by `FAUCET_*` variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        load_config(path, ENV_PREFIX)
    }

    /// Parse the monetary knobs into a validated policy.
    pub fn policy(&self) -> FaucetResult<DispensePolicy> {
        let dispense_amount = parse_wei("dispense_amount", &self.dispense_amount)?;
        if dispense_amount.is_zero() {
            return Err(FaucetError::Config("dispense_amount must be positive".to_string()));
        }

        Ok(DispensePolicy {
            dispense_amount,
            greed_ceiling: parse_wei("greed_ceiling", &self.greed_ceiling)?,
            gas_price_floor: parse_wei("gas_price_floor", &self.gas_price_floor)?,
            abuse_cache_ttl: Duration::from_secs(self.abuse_cache_ttl_secs),
            serialize_by_address: self.serialize_by_address,
        })
    }

    /// Get rate limit duration
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

fn parse_wei(field: &str, value: &str) -> FaucetResult<Amount> {
    value
        .parse::<Amount>()
        .map_err(|e| FaucetError::Config(format!("{}: {}", field, e)))
}

/// Monetary and caching rules applied to every dispense.
#[derive(Debug, Clone)]
pub struct DispensePolicy {
    pub dispense_amount: Amount,
    /// Balances strictly above this are refused.
    pub greed_ceiling: Amount,
    pub gas_price_floor: Amount,
    pub abuse_cache_ttl: Duration,
    pub serialize_by_address: bool,
}

impl Default for DispensePolicy {
    fn default() -> Self {
        Self {
            dispense_amount: Amount::from(DEFAULT_DISPENSE_WEI),
            greed_ceiling: Amount::from(DEFAULT_GREED_CEILING_WEI),
            gas_price_floor: Amount::from(DEFAULT_GAS_PRICE_FLOOR_WEI),
            abuse_cache_ttl: Duration::from_secs(FIFTEEN_MINUTES_SECS),
            serialize_by_address: true,
        }
    }
}
