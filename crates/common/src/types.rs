use crate::error::ValidationError;
use num_bigint::BigUint;
use num_traits::{Num, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

pub const ADDRESS_LENGTH: usize = 20;
pub const ADDRESS_PREFIX: &str = "0x";
/// Canonical textual length of an address: prefix plus two hex digits per byte.
pub const ADDRESS_STRING_LENGTH: usize = ADDRESS_PREFIX.len() + ADDRESS_LENGTH * 2;

/// Number of wei in one ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

// --- Account Address ---

/// A `0x`-prefixed, 42-character account address.
///
/// The only way to obtain one from user input is [`AccountAddress::normalize`],
/// so every value in circulation has the canonical length and prefix. Letter
/// case is kept exactly as supplied.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccountAddress(String);

impl AccountAddress {
    /// Normalize a raw requester string into an address.
    ///
    /// A missing `0x` prefix is added. Only the shape is checked here: the
    /// result must be exactly [`ADDRESS_STRING_LENGTH`] characters long.
    pub fn normalize(raw: &str) -> Result<Self, ValidationError> {
        let candidate = if raw.starts_with(ADDRESS_PREFIX) {
            raw.to_string()
        } else {
            format!("{}{}", ADDRESS_PREFIX, raw)
        };

        if candidate.chars().count() != ADDRESS_STRING_LENGTH {
            return Err(ValidationError::MalformedAddress(candidate));
        }

        Ok(Self(candidate))
    }

    /// Build an address from raw bytes (lowercase hex rendering).
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(format!("{}{}", ADDRESS_PREFIX, hex::encode(bytes)))
    }

    /// Decode the hex body into bytes.
    pub fn to_bytes(&self) -> Result<[u8; ADDRESS_LENGTH], ValidationError> {
        let body = &self.0[ADDRESS_PREFIX.len()..];
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|e| ValidationError::InvalidHex(format!("{}: {}", self.0, e)))?;
        Ok(bytes)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison, for matching a configured address against a derived one.
    pub fn matches(&self, other: &AccountAddress) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.0)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

impl Serialize for AccountAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::normalize(&s).map_err(serde::de::Error::custom)
    }
}

// --- Amount ---

/// Arbitrary-precision, non-negative quantity of wei.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigUint);

impl Amount {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// `n` whole ether, in wei.
    pub fn ether(n: u64) -> Self {
        Self(BigUint::from(n) * BigUint::from(WEI_PER_ETHER))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a JSON-RPC hex quantity (`0x1a`). `0x` alone is zero.
    pub fn from_hex_quantity(s: &str) -> Result<Self, ValidationError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::InvalidAmount(format!("missing 0x prefix: {}", s)))?;

        if digits.is_empty() {
            return Ok(Self::zero());
        }

        BigUint::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| ValidationError::InvalidAmount(format!("{}: {}", s, e)))
    }

    /// Render as a JSON-RPC hex quantity, without leading zeros.
    pub fn to_hex_quantity(&self) -> String {
        format!("0x{}", self.0.to_str_radix(16))
    }

    /// Minimal big-endian bytes; empty for zero, as RLP expects for scalars.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        if self.0.is_zero() {
            Vec::new()
        } else {
            self.0.to_bytes_be()
        }
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Lossy conversion for gauges and logs.
    pub fn to_f64_lossy(&self) -> f64 {
        self.0.to_string().parse().unwrap_or(f64::MAX)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    /// Decimal wei, e.g. `"1000000000000000000"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigUint::from_str_radix(s.trim(), 10)
            .map(Self)
            .map_err(|e| ValidationError::InvalidAmount(format!("{}: {}", s, e)))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Amount {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
