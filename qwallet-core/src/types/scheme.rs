//! Closed enumerations for signature schemes and hash variants.
//!
//! Scheme names arrive as free-form strings from the CLI and settings file.
//! They are parsed exactly once into [`Scheme`]; nothing deeper in the call
//! chain handles scheme strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

// ═══════════════════════════════════════════════════════════════════════════════
// SIGNATURE SCHEMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Post-quantum signature scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// SPHINCS+ (stateless hash-based)
    Sphincs,
    /// CRYSTALS-Dilithium (lattice-based)
    Dilithium,
    /// Lamport (one-time hash-based)
    Lamport,
}

impl Scheme {
    /// All schemes in registry order.
    pub const ALL: [Scheme; 3] = [Scheme::Sphincs, Scheme::Dilithium, Scheme::Lamport];

    /// Canonical identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sphincs => "sphincs",
            Self::Dilithium => "dilithium",
            Self::Lamport => "lamport",
        }
    }

    /// One-byte tag mixed into address digests and encoded in quantum addresses.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Sphincs => 0x01,
            Self::Dilithium => 0x02,
            Self::Lamport => 0x03,
        }
    }

    /// Inverse of [`Scheme::tag`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.tag() == tag)
    }

    /// Signature family, used to diversify backup keypairs.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Sphincs | Self::Lamport => "hash-based",
            Self::Dilithium => "lattice-based",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sphincs" | "sphincs+" | "sphincsplus" | "slh-dsa" => Ok(Self::Sphincs),
            "dilithium" | "ml-dsa" => Ok(Self::Dilithium),
            "lamport" => Ok(Self::Lamport),
            other => Err(WalletError::UnknownScheme(other.to_string())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HASH VARIANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Hash function used to pre-hash transaction messages before signing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashVariant {
    /// SHA-256
    #[serde(rename = "sha256")]
    Sha256,
    /// SHA3-256
    #[serde(rename = "sha3-256")]
    #[default]
    Sha3_256,
    /// SHAKE256 with 32-byte output
    #[serde(rename = "shake256")]
    Shake256,
    /// BLAKE2b with 32-byte output
    #[serde(rename = "blake2b-256")]
    Blake2b256,
}

impl HashVariant {
    /// All hash variants.
    pub const ALL: [HashVariant; 4] = [
        HashVariant::Sha256,
        HashVariant::Sha3_256,
        HashVariant::Shake256,
        HashVariant::Blake2b256,
    ];

    /// Canonical identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha3_256 => "sha3-256",
            Self::Shake256 => "shake256",
            Self::Blake2b256 => "blake2b-256",
        }
    }
}

impl fmt::Display for HashVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashVariant {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha3-256" | "sha3" => Ok(Self::Sha3_256),
            "shake256" | "shake" => Ok(Self::Shake256),
            "blake2b-256" | "blake2b" | "blake2" => Ok(Self::Blake2b256),
            other => Err(WalletError::invalid(format!("unknown hash variant: {other}"))),
        }
    }
}
