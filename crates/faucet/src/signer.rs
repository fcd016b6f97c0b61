//! Local secp256k1 signing of legacy (EIP-155) transfer transactions.

use crate::error::{FaucetError, FaucetResult};
use faucet_common::types::{AccountAddress, Amount, ADDRESS_LENGTH};
use k256::ecdsa::SigningKey;
use rlp::RlpStream;

/// Unsigned legacy transaction fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: Amount,
    pub gas_limit: u64,
    pub to: [u8; ADDRESS_LENGTH],
    pub value: Amount,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price.to_be_bytes());
        stream.append(&self.gas_limit);
        stream.append(&self.to.to_vec());
        stream.append(&self.value.to_be_bytes());
        stream.append(&self.data);
    }

    /// Keccak-256 of `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`.
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak_hash::keccak(&stream.out()).0
    }
}

/// The faucet's signing credential. Read-only after construction.
pub struct LocalSigner {
    signing_key: SigningKey,
    address: AccountAddress,
}

impl LocalSigner {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_hex(private_key: &str) -> FaucetResult<Self> {
        let private_key_hex = private_key.trim();
        let private_key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let private_key_bytes = hex::decode(private_key_hex)
            .map_err(|e| FaucetError::Config(format!("Invalid private key: {}", e)))?;

        let signing_key = SigningKey::from_slice(&private_key_bytes)
            .map_err(|e| FaucetError::Config(format!("Invalid signing key: {}", e)))?;

        let address = derive_address(&signing_key);
        Ok(Self { signing_key, address })
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    /// Sign and return the raw RLP bytes ready for `eth_sendRawTransaction`.
    pub fn sign(&self, tx: &LegacyTransaction) -> FaucetResult<Vec<u8>> {
        let hash = tx.signing_hash();
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| FaucetError::Internal(format!("Signing failed: {}", e)))?;

        let v = tx
            .chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + u64::from(recovery_id.to_byte())))
            .ok_or_else(|| FaucetError::Internal(format!("Chain id {} too large for EIP-155", tx.chain_id)))?;
        let signature_bytes = signature.to_bytes();
        let r = trim_leading_zeros(&signature_bytes[..32]);
        let s = trim_leading_zeros(&signature_bytes[32..]);

        let mut stream = RlpStream::new_list(9);
        tx.append_body(&mut stream);
        stream.append(&v);
        stream.append(&r);
        stream.append(&s);
        Ok(stream.out().to_vec())
    }
}

fn derive_address(signing_key: &SigningKey) -> AccountAddress {
    let public_key = signing_key.verifying_key().to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag.
    let hash = keccak_hash::keccak(&public_key.as_bytes()[1..]);
    let mut addr_bytes = [0u8; ADDRESS_LENGTH];
    addr_bytes.copy_from_slice(&hash.0[12..]);
    AccountAddress::from_bytes(addr_bytes)
}

/// RLP scalars carry no leading zero bytes.
fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}
