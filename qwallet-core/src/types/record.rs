//! The wallet record owned by the encrypted store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_WALLET_NAME_LEN, RECORD_VERSION};
use crate::error::{Result, WalletError};
use crate::types::{
    BackupKeypair, ConfirmationStatus, HashVariant, Keypair, LedgerAddress, Network, PublicKey,
    QuantumAddress, Scheme, TransactionEntry,
};

/// How a post-quantum signature is fitted into the ledger's 64-byte slot.
///
/// Chosen once at wallet creation and stored in the record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterPolicy {
    /// Slot carries a commitment; the full signature travels as an attestation.
    #[default]
    OutOfBand,
    /// Slot carries the first 64 signature bytes. No post-quantum security on-chain.
    Truncating,
}

impl fmt::Display for AdapterPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OutOfBand => "out-of-band",
            Self::Truncating => "truncating",
        })
    }
}

impl FromStr for AdapterPolicy {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "out-of-band" | "outofband" | "oob" => Ok(Self::OutOfBand),
            "truncating" | "truncate" => Ok(Self::Truncating),
            other => Err(WalletError::invalid(format!("unknown signature policy: {other}"))),
        }
    }
}

/// Checks a wallet name: 1 to 64 characters of `[A-Za-z0-9_-]`.
pub fn validate_wallet_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_WALLET_NAME_LEN {
        return Err(WalletError::invalid(format!(
            "wallet name must be 1-{MAX_WALLET_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(WalletError::invalid(format!(
            "wallet name '{name}' may only contain letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

/// Everything persisted for one wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    /// Record format version
    pub version: u8,
    /// Unique name within the storage root
    pub name: String,
    /// Network the wallet transacts on
    pub network: Network,
    /// Signing keypair
    pub primary_keypair: Keypair,
    /// Recovery keypair under a different scheme
    pub backup_keypair: Option<BackupKeypair>,
    /// Signature slot policy, fixed for the wallet's lifetime
    pub signature_policy: AdapterPolicy,
    /// Quantum-native address of the primary keypair
    pub quantum_address: QuantumAddress,
    /// Ledger-native address of the primary keypair
    pub ledger_address: LedgerAddress,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Chronological transaction history
    #[serde(default)]
    pub history: Vec<TransactionEntry>,
}

impl WalletRecord {
    /// Assembles a new record with empty history.
    ///
    /// # Errors
    /// `InvalidParameters` for a bad name or a backup keypair that shares
    /// the primary's scheme.
    pub fn new(
        name: &str,
        network: Network,
        primary: Keypair,
        backup: Option<BackupKeypair>,
        signature_policy: AdapterPolicy,
        quantum_address: QuantumAddress,
        ledger_address: LedgerAddress,
    ) -> Result<Self> {
        validate_wallet_name(name)?;
        if let Some(backup) = &backup {
            if backup.scheme == primary.scheme {
                return Err(WalletError::invalid(format!(
                    "backup keypair must use a different scheme than {}",
                    primary.scheme
                )));
            }
        }
        Ok(Self {
            version: RECORD_VERSION,
            name: name.to_string(),
            network,
            primary_keypair: primary,
            backup_keypair: backup,
            signature_policy,
            quantum_address,
            ledger_address,
            created_at: Utc::now(),
            history: Vec::new(),
        })
    }

    /// Entries still waiting for a verdict.
    pub fn pending_entries(&self) -> impl Iterator<Item = &TransactionEntry> {
        self.history.iter().filter(|e| {
            matches!(
                e.status(),
                ConfirmationStatus::Pending | ConfirmationStatus::Unknown
            )
        })
    }

    /// Strips every secret key, leaving a shareable profile.
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            name: self.name.clone(),
            network: self.network,
            scheme: self.primary_keypair.scheme,
            security_level: self.primary_keypair.security_level,
            hash_variant: self.primary_keypair.hash_variant,
            public_key: self.primary_keypair.public_key.clone(),
            backup_scheme: self.backup_keypair.as_ref().map(|b| b.scheme),
            backup_public_key: self.backup_keypair.as_ref().map(|b| b.public_key.clone()),
            signature_policy: self.signature_policy,
            quantum_address: self.quantum_address,
            ledger_address: self.ledger_address,
            created_at: self.created_at,
            history: self.history.clone(),
        }
    }
}

/// Public, secret-free view of a wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    /// Wallet name
    pub name: String,
    /// Network
    pub network: Network,
    /// Primary scheme
    pub scheme: Scheme,
    /// Primary security level
    pub security_level: u8,
    /// Primary hash variant
    pub hash_variant: HashVariant,
    /// Primary public key
    pub public_key: PublicKey,
    /// Backup scheme, if any
    pub backup_scheme: Option<Scheme>,
    /// Backup public key, if any
    pub backup_public_key: Option<PublicKey>,
    /// Signature slot policy
    pub signature_policy: AdapterPolicy,
    /// Quantum-native address
    pub quantum_address: QuantumAddress,
    /// Ledger-native address
    pub ledger_address: LedgerAddress,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// History
    pub history: Vec<TransactionEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecretKey;

    fn keypair(scheme: Scheme) -> Keypair {
        Keypair {
            scheme,
            security_level: 3,
            hash_variant: HashVariant::default(),
            public_key: PublicKey::from_bytes(vec![1u8; 16]),
            secret_key: SecretKey::from_bytes(vec![2u8; 16]),
        }
    }

    fn record(backup: Option<Keypair>) -> Result<WalletRecord> {
        WalletRecord::new(
            "alice",
            Network::Devnet,
            keypair(Scheme::Dilithium),
            backup,
            AdapterPolicy::OutOfBand,
            QuantumAddress::new(Scheme::Dilithium, [4u8; 32]),
            LedgerAddress::from_array([5u8; 32]),
        )
    }

    #[test]
    fn test_wallet_names() {
        assert!(validate_wallet_name("alice_01-main").is_ok());
        assert!(validate_wallet_name("").is_err());
        assert!(validate_wallet_name("../etc/passwd").is_err());
        assert!(validate_wallet_name("a b").is_err());
        assert!(validate_wallet_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_backup_must_use_other_scheme() {
        assert!(record(Some(keypair(Scheme::Sphincs))).is_ok());
        assert!(record(Some(keypair(Scheme::Dilithium))).is_err());
    }

    #[test]
    fn test_public_profile_has_no_secrets() {
        let r = record(Some(keypair(Scheme::Sphincs))).unwrap();
        let json = serde_json::to_string(&r.public_profile()).unwrap();
        assert!(!json.contains("secret_key"));
        assert!(json.contains("\"backup_scheme\":\"sphincs\""));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("out_of_band".parse::<AdapterPolicy>().unwrap(), AdapterPolicy::OutOfBand);
        assert_eq!("truncating".parse::<AdapterPolicy>().unwrap(), AdapterPolicy::Truncating);
        assert!("zip".parse::<AdapterPolicy>().is_err());
    }
}
