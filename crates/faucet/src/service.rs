//! Faucet service core logic
//!
//! A dispense runs as one linear sequence: admission by the per-origin rate
//! limiter, address normalization, then the per-address steps
//!
//! 1. cached greed check (no RPC),
//! 2. live pending-balance check, remembering greedy balances,
//! 3. gas price discovery clamped to the configured floor,
//! 4. submission of the transfer,
//! 5. optimistic cache projection `balance + dispense_amount`.
//!
//! Any failing step ends the request; the cache is only written in steps 2 and 5.

use crate::cache::AbuseCache;
use crate::config::{DispensePolicy, FaucetConfig};
use crate::error::{FaucetError, FaucetResult};
use crate::limiter::RateLimiter;
use crate::locks::AddressLocks;
use crate::metrics::FaucetMetrics;
use crate::rpc::{BlockState, ChainClient, JsonRpcClient, TransactionIntent, TxHash};
use crate::signer::LocalSigner;
use faucet_common::types::{AccountAddress, Amount};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Faucet service
pub struct FaucetService {
    policy: DispensePolicy,
    faucet_address: AccountAddress,
    chain: Arc<dyn ChainClient>,
    abuse_cache: AbuseCache,
    rate_limiter: RateLimiter,
    address_locks: AddressLocks,
    metrics: FaucetMetrics,
}

impl FaucetService {
    /// Assemble a service from already-built parts.
    pub fn new(
        policy: DispensePolicy,
        faucet_address: AccountAddress,
        chain: Arc<dyn ChainClient>,
        rate_limiter: RateLimiter,
        abuse_cache: AbuseCache,
    ) -> FaucetResult<Self> {
        Ok(Self {
            policy,
            faucet_address,
            chain,
            abuse_cache,
            rate_limiter,
            address_locks: AddressLocks::new(),
            metrics: FaucetMetrics::new()?,
        })
    }

    /// Build the production service: local signer plus JSON-RPC upstream.
    pub fn from_config(config: &FaucetConfig) -> FaucetResult<Self> {
        if config.private_key.trim().is_empty() {
            return Err(FaucetError::Config("private_key is required".to_string()));
        }
        let signer = Arc::new(LocalSigner::from_hex(&config.private_key)?);
        let faucet_address = signer.address().clone();

        if let Some(configured) = &config.address {
            let configured = AccountAddress::normalize(configured)
                .map_err(|e| FaucetError::Config(format!("address: {}", e)))?;
            if !configured.matches(&faucet_address) {
                return Err(FaucetError::Config(format!(
                    "address {} does not belong to the private key (derived {})",
                    configured, faucet_address
                )));
            }
        }

        info!("Faucet address: {}", faucet_address);

        let policy = config.policy()?;
        let chain = Arc::new(JsonRpcClient::new(
            config.rpc_url.clone(),
            signer,
            config.gas_limit,
            config.chain_id,
            config.rpc_timeout(),
        )?);
        let rate_limiter = RateLimiter::new(config.max_requests_per_window, config.rate_limit_window());
        let abuse_cache = AbuseCache::new();

        Self::new(policy, faucet_address, chain, rate_limiter, abuse_cache)
    }

    /// Handle one inbound request from `origin` for the raw target string.
    pub async fn dispense(&self, origin: &str, raw_target: &str) -> FaucetResult<DispenseResponse> {
        info!("Dispense request from {}: target={:?}", origin, raw_target);

        match self.admit_and_dispense(origin, raw_target).await {
            Ok(response) => {
                self.metrics.record_dispense(&self.policy.dispense_amount);
                info!("Sent tx {} to {}", response.tx_hash, response.address);
                Ok(response)
            }
            Err(e) => {
                self.metrics.record_outcome(e.kind());
                match &e {
                    FaucetError::Upstream(_) | FaucetError::Internal(_) | FaucetError::Config(_) => {
                        error!("Dispense from {} failed: {}", origin, e)
                    }
                    _ => warn!("Dispense from {} rejected: {}", origin, e),
                }
                Err(e)
            }
        }
    }

    async fn admit_and_dispense(&self, origin: &str, raw_target: &str) -> FaucetResult<DispenseResponse> {
        self.rate_limiter
            .try_acquire(origin)
            .map_err(|retry_after| FaucetError::RateLimitExceeded(retry_after.as_secs().max(1)))?;

        let target = AccountAddress::normalize(raw_target)?;
        let tx_hash = self.dispense_to(&target).await?;

        Ok(DispenseResponse {
            tx_hash,
            amount: self.policy.dispense_amount.clone(),
            address: target,
        })
    }

    /// Run the per-address steps for an already admitted, normalized target.
    pub async fn dispense_to(&self, target: &AccountAddress) -> FaucetResult<TxHash> {
        let _guard = if self.policy.serialize_by_address {
            Some(self.address_locks.acquire(target).await)
        } else {
            None
        };

        if let Some(cached) = self.abuse_cache.get(target).await {
            if cached > self.policy.greed_ceiling {
                debug!("{} refused from cache (balance {})", target, cached);
                return Err(FaucetError::Greedy);
            }
        }

        let balance = self.chain.get_balance(target, BlockState::Pending).await?;
        if balance > self.policy.greed_ceiling {
            debug!("{} refused, live balance {}", target, balance);
            self.abuse_cache
                .put(target.clone(), balance, self.policy.abuse_cache_ttl)
                .await;
            return Err(FaucetError::Greedy);
        }

        let observed = self.chain.gas_price().await?;
        let gas_price = observed.clone().max(self.policy.gas_price_floor.clone());
        debug!("Gas price observed {}, using {}", observed, gas_price);
        self.metrics.set_gas_price(&gas_price);

        let intent = TransactionIntent {
            to: target.clone(),
            from: self.faucet_address.clone(),
            value: self.policy.dispense_amount.clone(),
            data: Vec::new(),
            gas_price,
        };
        let tx_hash = self.chain.send_transaction(&intent).await?;

        // Projected, not re-queried: only used to deter repeat requests.
        let projected = &balance + &self.policy.dispense_amount;
        self.abuse_cache
            .put(target.clone(), projected, self.policy.abuse_cache_ttl)
            .await;

        Ok(tx_hash)
    }

    /// Get faucet status
    pub async fn get_status(&self) -> FaucetResult<FaucetStatus> {
        let balance = self
            .chain
            .get_balance(&self.faucet_address, BlockState::Latest)
            .await?;

        Ok(FaucetStatus {
            address: self.faucet_address.clone(),
            balance,
            dispense_amount: self.policy.dispense_amount.clone(),
            total_distributions: self.metrics.outcome_count(crate::metrics::OUTCOME_DISPENSED),
            total_rejections: self.metrics.rejected_count(),
            total_dispensed: self.metrics.total_dispensed(),
        })
    }

    /// Periodic housekeeping: drop stale rate windows, evict expired cache entries.
    pub async fn run_maintenance(&self) {
        let removed = self.rate_limiter.cleanup();
        self.abuse_cache.run_pending_tasks().await;
        self.metrics.set_cache_entries(self.abuse_cache.entry_count());
        debug!(
            "Maintenance: {} stale rate windows removed, {} cached balances",
            removed,
            self.abuse_cache.entry_count()
        );
    }

    pub fn faucet_address(&self) -> &AccountAddress {
        &self.faucet_address
    }

    pub fn policy(&self) -> &DispensePolicy {
        &self.policy
    }

    pub fn abuse_cache(&self) -> &AbuseCache {
        &self.abuse_cache
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn metrics(&self) -> &FaucetMetrics {
        &self.metrics
    }
}

/// Dispense response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseResponse {
    pub tx_hash: TxHash,
    pub amount: Amount,
    pub address: AccountAddress,
}

/// Faucet status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetStatus {
    pub address: AccountAddress,
    pub balance: Amount,
    pub dispense_amount: Amount,
    pub total_distributions: u64,
    pub total_rejections: u64,
    pub total_dispensed: Amount,
}
