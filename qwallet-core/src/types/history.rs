//! Transaction history entries.
//!
//! Entries are append-only. The only mutable field is the confirmation
//! status, which moves forward once and never back:
//!
//! ```text
//! pending ──► confirmed
//!    │
//!    └──────► failed
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::encoding::base64_bytes;
use crate::error::{Result, WalletError};
use crate::types::{Address, Amount, HashVariant, PublicKey, Scheme};

/// Direction of a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Outgoing transfer
    Send,
    /// Incoming transfer.
    ///
    /// The wallet never observes these on its own: the ledger RPC has no
    /// account-scan call, so callers that learn of a credit record it
    /// through `qwallet_ledger::history::record`.
    Receive,
    /// Faucet credit
    Airdrop,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Airdrop => "airdrop",
        })
    }
}

/// Confirmation state as observed locally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationStatus {
    /// Submitted, not yet confirmed
    #[default]
    Pending,
    /// Durably included by the ledger
    Confirmed,
    /// Included with an error, or definitively dropped
    Failed,
    /// Polling ended without a verdict
    Unknown,
}

impl ConfirmationStatus {
    /// Confirmed and failed never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Whether `self -> next` is a legal forward move.
    pub fn can_transition_to(&self, next: ConfirmationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Unknown, Self::Confirmed | Self::Failed)
        )
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        })
    }
}

/// Full post-quantum signature carried outside the ledger's signature slot.
///
/// The slot itself holds a 64-byte commitment to `signature`; a cooperating
/// verifier checks both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantumAttestation {
    /// Signing scheme
    pub scheme: Scheme,
    /// Security level of the signing key
    pub security_level: u8,
    /// Pre-hash applied to the transaction message
    pub hash_variant: HashVariant,
    /// Signer's public key
    pub public_key: PublicKey,
    /// Full post-quantum signature
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    /// Digest that was signed
    #[serde(with = "base64_bytes")]
    pub message_digest: Vec<u8>,
}

/// One locally observed transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    /// Local identifier
    pub id: Uuid,
    /// Direction
    pub direction: Direction,
    /// The other party (recipient for sends, faucet target for airdrops)
    pub counterparty: Address,
    /// Amount moved
    pub amount: Amount,
    /// When the entry was recorded locally
    pub local_timestamp: DateTime<Utc>,
    /// Ledger transaction signature, once submitted
    pub remote_signature: Option<String>,
    /// Current confirmation status
    #[serde(rename = "confirmation_status")]
    status: ConfirmationStatus,
    /// Out-of-band signature, for wallets using that adapter policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<QuantumAttestation>,
}

impl TransactionEntry {
    /// Creates a pending entry stamped with the current time.
    pub fn pending(
        direction: Direction,
        counterparty: Address,
        amount: Amount,
        remote_signature: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            counterparty,
            amount,
            local_timestamp: Utc::now(),
            remote_signature,
            status: ConfirmationStatus::Pending,
            attestation: None,
        }
    }

    /// Attaches an out-of-band attestation.
    pub fn with_attestation(mut self, attestation: Option<QuantumAttestation>) -> Self {
        self.attestation = attestation;
        self
    }

    /// Current status.
    pub fn status(&self) -> ConfirmationStatus {
        self.status
    }

    /// Moves the status forward.
    ///
    /// Returns `Ok(true)` if the status changed and `Ok(false)` if `next`
    /// equals the current status.
    ///
    /// # Errors
    /// `InvalidTransition` for any backward or sideways move.
    pub fn transition(&mut self, next: ConfirmationStatus) -> Result<bool> {
        if self.status == next {
            return Ok(false);
        }
        if !self.status.can_transition_to(next) {
            return Err(WalletError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(true)
    }
}
