//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use faucet_common::types::{AccountAddress, Amount};
use faucet_common::utils::logging::init_test_logging;
use faucet_service::{
    AbuseCache, BlockState, ChainClient, DispensePolicy, FaucetError, FaucetResult, FaucetService,
    RateLimiter, TransactionIntent, TxHash,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FAUCET: &str = "0x1111111111111111111111111111111111111111";

pub fn address(byte: u8) -> AccountAddress {
    AccountAddress::from_bytes([byte; 20])
}

/// In-memory chain that records every call.
pub struct MockChain {
    balances: Mutex<HashMap<String, Amount>>,
    gas_price: Mutex<Amount>,
    pub fail_balance: AtomicBool,
    pub fail_gas_price: AtomicBool,
    pub fail_send: AtomicBool,
    /// Sending also credits the recipient, like a node with instant inclusion.
    pub credit_on_send: AtomicBool,
    pub send_delay: Duration,
    pub balance_calls: AtomicUsize,
    pub gas_price_calls: AtomicUsize,
    sent: Mutex<Vec<TransactionIntent>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::with_send_delay(Duration::ZERO)
    }

    pub fn with_send_delay(send_delay: Duration) -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            gas_price: Mutex::new(Amount::from(1_000_000_000u64)),
            fail_balance: AtomicBool::new(false),
            fail_gas_price: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            credit_on_send: AtomicBool::new(false),
            send_delay,
            balance_calls: AtomicUsize::new(0),
            gas_price_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_balance(&self, address: &AccountAddress, balance: Amount) {
        self.balances
            .lock()
            .unwrap()
            .insert(address.as_str().to_string(), balance);
    }

    pub fn set_gas_price(&self, price: Amount) {
        *self.gas_price.lock().unwrap() = price;
    }

    pub fn sent(&self) -> Vec<TransactionIntent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn rpc_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
            + self.gas_price_calls.load(Ordering::SeqCst)
            + self.send_calls()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, address: &AccountAddress, state: BlockState) -> FaucetResult<Amount> {
        // Dispense checks must see unconfirmed transfers; only status reads `latest`.
        if address.as_str() != FAUCET {
            assert_eq!(state, BlockState::Pending);
        }
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_balance.load(Ordering::SeqCst) {
            return Err(FaucetError::Upstream("balance lookup failed".to_string()));
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn gas_price(&self) -> FaucetResult<Amount> {
        self.gas_price_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_gas_price.load(Ordering::SeqCst) {
            return Err(FaucetError::Upstream("gas price unavailable".to_string()));
        }
        Ok(self.gas_price.lock().unwrap().clone())
    }

    async fn send_transaction(&self, tx: &TransactionIntent) -> FaucetResult<TxHash> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(FaucetError::Upstream("insufficient funds for gas * price + value".to_string()));
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(tx.clone());
        if self.credit_on_send.load(Ordering::SeqCst) {
            let mut balances = self.balances.lock().unwrap();
            let balance = balances.entry(tx.to.as_str().to_string()).or_default();
            *balance = &*balance + &tx.value;
        }
        Ok(TxHash(format!("0x{:064x}", sent.len())))
    }
}

pub fn policy() -> DispensePolicy {
    DispensePolicy::default()
}

/// Service with the published defaults around a mock chain.
pub fn service_with(chain: Arc<MockChain>, policy: DispensePolicy, limiter: RateLimiter) -> FaucetService {
    init_test_logging();
    let cache = AbuseCache::new();
    FaucetService::new(
        policy,
        AccountAddress::normalize(FAUCET).unwrap(),
        chain,
        limiter,
        cache,
    )
    .unwrap()
}

pub fn default_service(chain: Arc<MockChain>) -> FaucetService {
    service_with(chain, policy(), RateLimiter::new(200, Duration::from_secs(900)))
}
