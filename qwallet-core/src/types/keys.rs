//! Key types for qwallet.
//!
//! - [`PublicKey`]: raw public key bytes of any scheme
//! - [`SecretKey`]: raw secret key bytes, zeroized on drop
//! - [`Keypair`]: scheme-tagged public + secret key
//! - [`BackupKeypair`]: recovery keypair under a different scheme

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{from_base64, to_base64};
use crate::error::Result;
use crate::types::{HashVariant, Scheme};

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Post-quantum public key.
///
/// Length depends on scheme and level; the registry owns the size table.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Wraps raw public key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the key holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the base64-encoded key.
    pub fn to_base64(&self) -> String {
        to_base64(&self.bytes)
    }

    /// Parses a base64-encoded key.
    pub fn from_base64(s: &str) -> Result<Self> {
        Ok(Self::from_bytes(from_base64(s)?))
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let head = &self.bytes[..self.bytes.len().min(8)];
        write!(f, "PublicKey({} bytes, {}..)", self.bytes.len(), to_base64(head))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECRET KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Post-quantum secret key.
///
/// Zeroized when dropped. Never logged; `Debug` only prints the length.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Wraps raw secret key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Returns the raw bytes.
    ///
    /// # Security
    /// Handle with care. Do not log or persist unencrypted.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the key holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey([REDACTED; {} bytes])", self.bytes.len())
    }
}

impl Serialize for SecretKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&to_base64(&self.bytes))
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut s = String::deserialize(deserializer)?;
        let bytes = from_base64(&s).map_err(serde::de::Error::custom);
        s.zeroize();
        Ok(Self::from_bytes(bytes?))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYPAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A scheme-tagged post-quantum keypair.
///
/// Immutable once persisted. Rotation means creating a new wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypair {
    /// Signature scheme
    pub scheme: Scheme,
    /// Security level, one of the scheme's supported levels
    pub security_level: u8,
    /// Hash used to pre-hash messages before signing
    pub hash_variant: HashVariant,
    /// Public key
    pub public_key: PublicKey,
    /// Secret key
    pub secret_key: SecretKey,
}

impl Keypair {
    /// Public half of the keypair.
    pub fn public(&self) -> &PublicKey {
        &self.public_key
    }

    /// Short human label, e.g. `dilithium-3`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.scheme, self.security_level)
    }
}

/// Recovery keypair generated alongside the primary under a different scheme.
///
/// Never used for day-to-day signing.
pub type BackupKeypair = Keypair;
