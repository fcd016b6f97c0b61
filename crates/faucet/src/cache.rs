//! Time-bounded memo of balances observed for recipient addresses.
//!
//! An entry says "this address held at least this much a moment ago". The
//! dispenser uses it to refuse greedy addresses without going back to the
//! node until the entry expires.

use faucet_common::types::{AccountAddress, Amount};
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedBalance {
    balance: Amount,
    ttl: Duration,
}

/// Every write restarts the entry's clock with the ttl it was written with.
struct PerEntryTtl;

impl Expiry<AccountAddress, CachedBalance> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &AccountAddress,
        value: &CachedBalance,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &AccountAddress,
        value: &CachedBalance,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Shared abuse cache. Cheap to clone; clones share storage.
///
/// Holds no ttl of its own: each `put` carries the lifetime of that entry.
#[derive(Clone)]
pub struct AbuseCache {
    entries: Cache<AccountAddress, CachedBalance>,
}

impl AbuseCache {
    pub fn new() -> Self {
        let entries = Cache::builder().expire_after(PerEntryTtl).build();
        Self { entries }
    }

    /// Last recorded balance, or `None` once the entry has expired.
    pub async fn get(&self, address: &AccountAddress) -> Option<Amount> {
        self.entries.get(address).await.map(|entry| entry.balance)
    }

    /// Record a balance, replacing any previous entry and restarting its ttl.
    pub async fn put(&self, address: AccountAddress, balance: Amount, ttl: Duration) {
        self.entries.insert(address, CachedBalance { balance, ttl }).await;
    }

    /// Approximate number of live entries; exact after [`Self::run_pending_tasks`].
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Flush moka's housekeeping so expired entries are evicted now.
    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }
}

impl Default for AbuseCache {
    fn default() -> Self {
        Self::new()
    }
}
