//! Common traits for qwallet.
//!
//! These are the seams between the wallet core and the outside world:
//! the remote ledger and the policy that fits post-quantum signatures into
//! the ledger's signature slot.

use async_trait::async_trait;

use crate::constants::{BLOCKHASH_SIZE, LEDGER_SIGNATURE_SIZE};
use crate::error::Result;
use crate::types::{AdapterPolicy, Amount, ConfirmationStatus, LedgerAddress};

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER RPC
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the remote ledger.
///
/// Implementations:
/// - JSON-RPC over HTTP (production)
/// - In-memory ledger (testing/development)
///
/// Transient failures must surface as `WalletError::Network` so the
/// submitter can retry them; definitive refusals as `WalletError::Rejected`.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Balance of an account.
    async fn get_balance(&self, address: &LedgerAddress) -> Result<Amount>;

    /// Requests a faucet credit. Only valid on non-production networks.
    async fn request_airdrop(&self, address: &LedgerAddress, amount: Amount) -> Result<String>;

    /// Broadcasts a serialized transaction and returns its ledger signature.
    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<String>;

    /// Current status of a submitted transaction.
    ///
    /// Unknown or not-yet-landed signatures report `Pending`.
    async fn get_signature_status(&self, signature: &str) -> Result<ConfirmationStatus>;

    /// Recent blockhash for transaction construction.
    async fn get_latest_blockhash(&self) -> Result<[u8; BLOCKHASH_SIZE]>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIGNATURE ADAPTER
// ═══════════════════════════════════════════════════════════════════════════════

/// A post-quantum signature fitted into the ledger's signature slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdaptedSignature {
    /// Bytes placed in the transaction's 64-byte signature slot
    pub slot: [u8; LEDGER_SIGNATURE_SIZE],
    /// Full signature to carry outside the transaction, if the policy keeps one
    pub out_of_band: Option<Vec<u8>>,
}

/// Policy for fitting a large post-quantum signature into a 64-byte slot.
pub trait SignatureAdapter: Send + Sync {
    /// Policy this adapter implements.
    fn policy(&self) -> AdapterPolicy;

    /// Adapts a full post-quantum signature.
    fn adapt(&self, signature: &[u8]) -> Result<AdaptedSignature>;
}
