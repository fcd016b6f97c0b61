//! Blockchain access used by the dispenser.
//!
//! [`ChainClient`] is the seam the dispenser depends on; [`JsonRpcClient`] is
//! the production implementation that talks JSON-RPC to a node and signs
//! transfers locally with the faucet key.

use crate::error::{FaucetError, FaucetResult};
use crate::signer::{LegacyTransaction, LocalSigner};
use async_trait::async_trait;
use faucet_common::types::{AccountAddress, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Block tag for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Latest,
    Pending,
}

impl BlockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockState::Latest => "latest",
            BlockState::Pending => "pending",
        }
    }
}

/// A transfer the faucet wants on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub to: AccountAddress,
    pub from: AccountAddress,
    pub value: Amount,
    pub data: Vec<u8>,
    pub gas_price: Amount,
}

/// Opaque handle returned by the node for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_balance(&self, address: &AccountAddress, state: BlockState) -> FaucetResult<Amount>;

    async fn gas_price(&self) -> FaucetResult<Amount>;

    async fn send_transaction(&self, tx: &TransactionIntent) -> FaucetResult<TxHash>;
}

/// JSON-RPC 2.0 client with a local signer.
pub struct JsonRpcClient {
    rpc_url: String,
    client: reqwest::Client,
    signer: Arc<LocalSigner>,
    gas_limit: u64,
    chain_id: OnceCell<u64>,
    request_id: AtomicU64,
    /// Next nonce to use, once known. Held across sign-and-send.
    next_nonce: Mutex<Option<u64>>,
}

impl JsonRpcClient {
    pub fn new(
        rpc_url: String,
        signer: Arc<LocalSigner>,
        gas_limit: u64,
        chain_id: Option<u64>,
        timeout: Duration,
    ) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FaucetError::Config(format!("HTTP client: {}", e)))?;

        let chain_id = match chain_id {
            Some(id) => OnceCell::new_with(Some(id)),
            None => OnceCell::new(),
        };

        Ok(Self {
            rpc_url,
            client,
            signer,
            gas_limit,
            chain_id,
            request_id: AtomicU64::new(1),
            next_nonce: Mutex::new(None),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> FaucetResult<serde_json::Value> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.request_id.fetch_add(1, Ordering::Relaxed)
        });

        debug!("RPC call {}", method);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| FaucetError::Upstream(format!("{} request failed: {}", method, e)))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FaucetError::Upstream(format!("{} invalid response: {}", method, e)))?;

        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(FaucetError::Upstream(message));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| FaucetError::Upstream(format!("{} returned no result", method)))
    }

    async fn call_quantity(&self, method: &str, params: serde_json::Value) -> FaucetResult<Amount> {
        let result = self.call(method, params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| FaucetError::Upstream(format!("{} returned non-string: {}", method, result)))?;
        Amount::from_hex_quantity(text).map_err(|e| FaucetError::Upstream(format!("{}: {}", method, e)))
    }

    async fn call_u64(&self, method: &str, params: serde_json::Value) -> FaucetResult<u64> {
        let value = self.call_quantity(method, params).await?;
        u64::try_from(value.as_biguint())
            .map_err(|_| FaucetError::Upstream(format!("{} out of range: {}", method, value)))
    }

    pub async fn chain_id(&self) -> FaucetResult<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                let id = self.call_u64("eth_chainId", serde_json::json!([])).await?;
                info!("Upstream chain id: {}", id);
                Ok::<_, FaucetError>(id)
            })
            .await
            .copied()
    }

    pub async fn get_transaction_count(&self, address: &AccountAddress, state: BlockState) -> FaucetResult<u64> {
        self.call_u64(
            "eth_getTransactionCount",
            serde_json::json!([address.as_str(), state.as_str()]),
        )
        .await
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> FaucetResult<TxHash> {
        let result = self
            .call(
                "eth_sendRawTransaction",
                serde_json::json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;

        result
            .as_str()
            .map(|hash| TxHash(hash.to_string()))
            .ok_or_else(|| FaucetError::Upstream(format!("eth_sendRawTransaction returned {}", result)))
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn get_balance(&self, address: &AccountAddress, state: BlockState) -> FaucetResult<Amount> {
        self.call_quantity("eth_getBalance", serde_json::json!([address.as_str(), state.as_str()]))
            .await
    }

    async fn gas_price(&self) -> FaucetResult<Amount> {
        self.call_quantity("eth_gasPrice", serde_json::json!([])).await
    }

    async fn send_transaction(&self, tx: &TransactionIntent) -> FaucetResult<TxHash> {
        if !tx.from.matches(self.signer.address()) {
            return Err(FaucetError::Upstream(format!("Unknown account {}", tx.from)));
        }
        // The node would refuse a recipient that is not hex.
        let to = tx
            .to
            .to_bytes()
            .map_err(|e| FaucetError::Upstream(format!("Invalid recipient: {}", e)))?;
        let chain_id = self.chain_id().await?;

        let mut next_nonce = self.next_nonce.lock().await;
        let pending = self.get_transaction_count(self.signer.address(), BlockState::Pending).await?;
        let nonce = next_nonce.map_or(pending, |local| local.max(pending));

        let raw = self.signer.sign(&LegacyTransaction {
            nonce,
            gas_price: tx.gas_price.clone(),
            gas_limit: self.gas_limit,
            to,
            value: tx.value.clone(),
            data: tx.data.clone(),
            chain_id,
        })?;

        match self.send_raw_transaction(&raw).await {
            Ok(hash) => {
                *next_nonce = Some(nonce + 1);
                debug!("Submitted nonce {} as {}", nonce, hash);
                Ok(hash)
            }
            Err(e) => {
                // Let the node's view win next time.
                *next_nonce = None;
                warn!("Submission with nonce {} failed: {}", nonce, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_state_tags() {
        assert_eq!(BlockState::Pending.as_str(), "pending");
        assert_eq!(BlockState::Latest.as_str(), "latest");
    }

    #[test]
    fn test_tx_hash_serializes_transparently() {
        let hash = TxHash("0xabc".to_string());
        assert_eq!(serde_json::to_string(&hash).unwrap(), "\"0xabc\"");
        assert_eq!(hash.to_string(), "0xabc");
    }

    #[tokio::test]
    async fn test_configured_chain_id_skips_lookup() {
        let signer = Arc::new(LocalSigner::from_hex(&"11".repeat(32)).unwrap());
        // Nothing listens on this port; any RPC would fail.
        let client = JsonRpcClient::new(
            "http://127.0.0.1:1".to_string(),
            signer,
            21_000,
            Some(5),
            Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(client.chain_id().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_transport_failure_is_upstream_error() {
        let signer = Arc::new(LocalSigner::from_hex(&"11".repeat(32)).unwrap());
        let client = JsonRpcClient::new(
            "http://127.0.0.1:1".to_string(),
            signer,
            21_000,
            None,
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(matches!(client.gas_price().await, Err(FaucetError::Upstream(_))));
    }
}
