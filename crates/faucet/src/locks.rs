//! Keyed async mutex: one in-flight dispense per recipient address.

use dashmap::DashMap;
use faucet_common::types::AccountAddress;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct AddressLocks {
    locks: DashMap<AccountAddress, Arc<Mutex<()>>>,
}

impl AddressLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task holds `address`, then hold it until the guard drops.
    pub async fn acquire(&self, address: &AccountAddress) -> AddressGuard<'_> {
        let mutex = self.locks.entry(address.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        AddressGuard {
            locks: self,
            address: address.clone(),
            guard: Some(guard),
        }
    }

    /// Addresses with a holder or waiter.
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

pub struct AddressGuard<'a> {
    locks: &'a AddressLocks,
    address: AccountAddress,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AddressGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own handle left: nobody is waiting.
        self.locks
            .locks
            .remove_if(&self.address, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
