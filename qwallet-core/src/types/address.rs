//! Address types for qwallet.
//!
//! Two textual forms exist and never overlap:
//!
//! - **Quantum-native**: bech32m with HRP `qw`, payload `scheme_tag || digest[32]`
//!   (62 characters, always contains the `1` separator and the `qw` prefix).
//! - **Ledger-native**: base58 of exactly 32 bytes (32 to 44 characters).
//!
//! Derivation (hashing) lives in `qwallet-crypto`; this module only owns
//! the byte layouts and the canonical encodings.

use std::fmt;
use std::str::FromStr;

use bech32::{Bech32m, Hrp};
use serde::{Deserialize, Serialize};

use crate::constants::{LEDGER_ADDRESS_SIZE, QUANTUM_ADDRESS_HRP, QUANTUM_DIGEST_SIZE};
use crate::error::{Result, WalletError};
use crate::types::Scheme;

/// Which form an address string takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressForm {
    /// Quantum-native (bech32m)
    Quantum,
    /// Ledger-native (base58, 32 bytes)
    Ledger,
    /// Neither
    Invalid,
}

impl fmt::Display for AddressForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Quantum => "quantum",
            Self::Ledger => "ledger",
            Self::Invalid => "invalid",
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUANTUM-NATIVE ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Address derived from a post-quantum public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantumAddress {
    scheme: Scheme,
    digest: [u8; QUANTUM_DIGEST_SIZE],
}

impl QuantumAddress {
    /// Builds an address from its scheme and digest.
    pub fn new(scheme: Scheme, digest: [u8; QUANTUM_DIGEST_SIZE]) -> Self {
        Self { scheme, digest }
    }

    /// Scheme of the key this address was derived from.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Digest of the scheme-tagged public key.
    pub fn digest(&self) -> &[u8; QUANTUM_DIGEST_SIZE] {
        &self.digest
    }

    /// Encodes as bech32m.
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(1 + QUANTUM_DIGEST_SIZE);
        payload.push(self.scheme.tag());
        payload.extend_from_slice(&self.digest);

        // constant HRP and a 33-byte payload cannot fail to encode
        Hrp::parse(QUANTUM_ADDRESS_HRP)
            .ok()
            .and_then(|hrp| bech32::encode::<Bech32m>(hrp, &payload).ok())
            .unwrap_or_default()
    }

    /// Parses a bech32m quantum-native address.
    ///
    /// Rejects the wrong HRP, a bech32 (non-m) checksum, unknown scheme tags
    /// and payloads of the wrong length.
    pub fn parse(s: &str) -> Result<Self> {
        let (hrp, payload) = bech32::decode(s)
            .map_err(|e| WalletError::InvalidAddress(format!("bech32: {e}")))?;

        if hrp.to_lowercase() != QUANTUM_ADDRESS_HRP {
            return Err(WalletError::InvalidAddress(format!("unexpected prefix '{hrp}'")));
        }

        if payload.len() != 1 + QUANTUM_DIGEST_SIZE {
            return Err(WalletError::InvalidAddress(format!(
                "expected {} payload bytes, got {}",
                1 + QUANTUM_DIGEST_SIZE,
                payload.len()
            )));
        }

        let scheme = Scheme::from_tag(payload[0]).ok_or_else(|| {
            WalletError::InvalidAddress(format!("unknown scheme tag {:#04x}", payload[0]))
        })?;

        let mut digest = [0u8; QUANTUM_DIGEST_SIZE];
        digest.copy_from_slice(&payload[1..]);
        let address = Self { scheme, digest };

        // `decode` accepts both checksum variants; only bech32m re-encodes identically
        if address.encode() != s.to_ascii_lowercase() {
            return Err(WalletError::InvalidAddress("not a bech32m checksum".into()));
        }

        Ok(address)
    }
}

impl fmt::Display for QuantumAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for QuantumAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuantumAddress({})", self.encode())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER-NATIVE ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Address in the ledger's native 32-byte account format.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerAddress([u8; LEDGER_ADDRESS_SIZE]);

impl LedgerAddress {
    /// Wraps 32 raw bytes.
    pub const fn from_array(bytes: [u8; LEDGER_ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates an address from a slice.
    ///
    /// # Errors
    /// Returns `InvalidAddress` if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; LEDGER_ADDRESS_SIZE] = bytes.try_into().map_err(|_| {
            WalletError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                LEDGER_ADDRESS_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; LEDGER_ADDRESS_SIZE] {
        &self.0
    }

    /// Base58 encoding.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Parses a base58 address of exactly 32 bytes.
    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| WalletError::InvalidAddress(format!("base58: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LedgerAddress({})", self.to_base58())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// An address in either form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// Quantum-native
    Quantum(QuantumAddress),
    /// Ledger-native
    Ledger(LedgerAddress),
}

impl Address {
    /// Parses an address string, trying the quantum form first.
    pub fn parse(s: &str) -> Result<Self> {
        if let Ok(q) = QuantumAddress::parse(s) {
            return Ok(Self::Quantum(q));
        }
        match LedgerAddress::from_base58(s) {
            Ok(l) => Ok(Self::Ledger(l)),
            Err(_) => Err(WalletError::InvalidAddress(format!(
                "'{s}' is neither a quantum-native nor a ledger-native address"
            ))),
        }
    }

    /// Classifies an address string without failing.
    pub fn form_of(s: &str) -> AddressForm {
        match Self::parse(s) {
            Ok(a) => a.form(),
            Err(_) => AddressForm::Invalid,
        }
    }

    /// Form of this address.
    pub fn form(&self) -> AddressForm {
        match self {
            Self::Quantum(_) => AddressForm::Quantum,
            Self::Ledger(_) => AddressForm::Ledger,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quantum(q) => q.fmt(f),
            Self::Ledger(l) => l.fmt(f),
        }
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<QuantumAddress> for Address {
    fn from(q: QuantumAddress) -> Self {
        Self::Quantum(q)
    }
}

impl From<LedgerAddress> for Address {
    fn from(l: LedgerAddress) -> Self {
        Self::Ledger(l)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for LedgerAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for LedgerAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for QuantumAddress {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for QuantumAddress {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
