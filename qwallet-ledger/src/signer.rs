//! Transaction signer and submitter.
//!
//! Each transfer moves through `Built → Signed → Submitted → {Confirmed, Failed}`.
//! Each step consumes the previous state's type, so a transaction cannot be
//! submitted unsigned or signed twice.
//!
//! The keyring signs `H_variant("qwallet/tx/v1", message)` with the
//! wallet's hash variant. The wallet's [`AdapterPolicy`] then fits the
//! post-quantum signature into the ledger's 64-byte slot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use qwallet_core::constants::{BLOCKHASH_SIZE, DOMAIN_TRANSACTION};
use qwallet_core::context::WalletContext;
use qwallet_core::error::{Result, WalletError};
use qwallet_core::traits::LedgerRpc;
use qwallet_core::types::{
    Address, AdapterPolicy, Amount, ConfirmationStatus, Keypair, LedgerAddress,
    QuantumAttestation, WalletRecord,
};

use crate::adapter::adapter_for;
use crate::wire::{Message, Transaction};

// ═══════════════════════════════════════════════════════════════════════════════
// BUILD & SIGN
// ═══════════════════════════════════════════════════════════════════════════════

/// A transfer that has been built but not signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// Recipient as given by the caller
    pub recipient: Address,
    /// Paying ledger account
    pub from: LedgerAddress,
    /// Receiving ledger account
    pub to: LedgerAddress,
    /// Amount to move
    pub amount: Amount,
    /// Message to sign
    pub message: Message,
}

/// A transfer ready to broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Recipient as given by the caller
    pub recipient: Address,
    /// Amount to move
    pub amount: Amount,
    /// Transaction with its adapted signature slot
    pub transaction: Transaction,
    /// Wire encoding of `transaction`
    pub wire: Vec<u8>,
    /// Full post-quantum signature, for out-of-band wallets
    pub attestation: Option<QuantumAttestation>,
}

/// Builds a transfer from `wallet` to `recipient`.
///
/// # Errors
/// `InvalidAddress` if `recipient` is not a valid address of either form;
/// `InsufficientAmount` if `amount` is zero.
pub fn build(
    wallet: &WalletRecord,
    recipient: &str,
    amount: Amount,
    recent_blockhash: [u8; BLOCKHASH_SIZE],
) -> Result<UnsignedTransaction> {
    let recipient = Address::parse(recipient)?;
    if amount.is_zero() {
        return Err(WalletError::InsufficientAmount(
            "amount must be greater than zero".into(),
        ));
    }

    let from = wallet.ledger_address;
    let to = qwallet_crypto::ledger_account(&recipient);
    debug!(%from, %to, lamports = amount.lamports(), "Transfer built");

    Ok(UnsignedTransaction {
        recipient,
        from,
        to,
        amount,
        message: Message::transfer(from, to, amount, recent_blockhash),
    })
}

/// Signs a built transfer with the wallet's primary keypair.
#[instrument(skip_all, fields(scheme = %keypair.scheme, level = keypair.security_level, policy = %policy))]
pub fn sign(
    unsigned: UnsignedTransaction,
    keypair: &Keypair,
    policy: AdapterPolicy,
) -> Result<SignedTransaction> {
    let message_bytes = unsigned.message.serialize()?;
    let digest = qwallet_crypto::digest(keypair.hash_variant, DOMAIN_TRANSACTION, &message_bytes);
    let signature = qwallet_crypto::sign(&keypair.secret_key, keypair.scheme, &digest)?;

    let adapted = adapter_for(policy).adapt(&signature)?;
    let attestation = adapted.out_of_band.map(|signature| QuantumAttestation {
        scheme: keypair.scheme,
        security_level: keypair.security_level,
        hash_variant: keypair.hash_variant,
        public_key: keypair.public_key.clone(),
        signature,
        message_digest: digest.to_vec(),
    });

    let transaction = Transaction {
        signatures: vec![adapted.slot],
        message: unsigned.message,
    };
    let wire = transaction.serialize()?;
    debug!(wire_len = wire.len(), pq_sig_len = signature_len(&attestation), "Transaction signed");

    Ok(SignedTransaction {
        recipient: unsigned.recipient,
        amount: unsigned.amount,
        transaction,
        wire,
        attestation,
    })
}

fn signature_len(attestation: &Option<QuantumAttestation>) -> usize {
    attestation.as_ref().map(|a| a.signature.len()).unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBMIT & CONFIRM
// ═══════════════════════════════════════════════════════════════════════════════

/// Retry and polling limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitPolicy {
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// First backoff delay; doubles per retry
    pub retry_base_delay: Duration,
    /// Total time confirmation polling may take
    pub confirmation_timeout: Duration,
    /// Delay between polls
    pub poll_interval: Duration,
}

impl SubmitPolicy {
    /// Limits from a context.
    pub fn from_context(ctx: &WalletContext) -> Self {
        Self {
            max_retries: ctx.max_retries,
            retry_base_delay: ctx.retry_base_delay,
            confirmation_timeout: ctx.confirmation_timeout,
            poll_interval: ctx.poll_interval,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self::from_context(&WalletContext::default())
    }
}

/// Talks to the ledger on behalf of the signer.
#[derive(Clone)]
pub struct Submitter {
    rpc: Arc<dyn LedgerRpc>,
    policy: SubmitPolicy,
}

impl Submitter {
    /// Submitter over `rpc`.
    pub fn new(rpc: Arc<dyn LedgerRpc>, policy: SubmitPolicy) -> Self {
        Self { rpc, policy }
    }

    /// Underlying client.
    pub fn rpc(&self) -> &dyn LedgerRpc {
        self.rpc.as_ref()
    }

    /// Limits in use.
    pub fn policy(&self) -> &SubmitPolicy {
        &self.policy
    }

    /// Runs `op`, retrying transient failures with exponential backoff.
    ///
    /// Anything other than `Network` is returned at once.
    pub async fn with_retry<T, F, Fut>(&self, op: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    warn!(op, attempt = attempt + 1, ?delay, error = %e, "Transient failure, retrying");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Broadcasts a signed transaction and returns its ledger signature.
    ///
    /// # Errors
    /// `Rejected` immediately on a definitive refusal; `Network` once
    /// retries are exhausted.
    #[instrument(skip(self, signed), fields(lamports = signed.amount.lamports()))]
    pub async fn submit(&self, signed: &SignedTransaction) -> Result<String> {
        let remote = self
            .with_retry("sendTransaction", || self.rpc.send_raw_transaction(&signed.wire))
            .await?;
        info!(signature = %remote, "Transaction submitted");
        Ok(remote)
    }

    /// Polls until the transaction settles or the timeout passes.
    ///
    /// A timeout yields `Unknown`: no confirmation is not proof of failure.
    /// Transient errors while polling count as "no news yet".
    #[instrument(skip(self))]
    pub async fn confirm(&self, remote_signature: &str) -> Result<ConfirmationStatus> {
        let deadline = Instant::now() + self.policy.confirmation_timeout;
        loop {
            match self.rpc.get_signature_status(remote_signature).await {
                Ok(status) if status.is_terminal() => {
                    info!(%status, "Transaction settled");
                    return Ok(status);
                }
                Ok(_) => {}
                Err(e) if e.is_recoverable() => debug!(error = %e, "Status poll failed"),
                Err(e) => return Err(e),
            }

            if Instant::now() + self.policy.poll_interval > deadline {
                warn!(timeout = ?self.policy.confirmation_timeout, "Confirmation timed out");
                return Ok(ConfirmationStatus::Unknown);
            }
            sleep(self.policy.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::verify_attestation;
    use crate::memory::MemoryLedger;
    use qwallet_core::types::{HashVariant, Network, Scheme};

    fn fast_policy() -> SubmitPolicy {
        SubmitPolicy {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1),
            confirmation_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn wallet(policy: AdapterPolicy) -> WalletRecord {
        let kp = qwallet_crypto::generate(Scheme::Dilithium, 2, HashVariant::Sha3_256).unwrap();
        let (q, l) = qwallet_crypto::addresses_of(&kp);
        WalletRecord::new("w", Network::Devnet, kp, None, policy, q, l).unwrap()
    }

    fn recipient() -> String {
        LedgerAddress::from_array([3u8; 32]).to_string()
    }

    #[test]
    fn test_build_validates_inputs() {
        let w = wallet(AdapterPolicy::OutOfBand);
        assert!(matches!(
            build(&w, "not-an-address", Amount::from_lamports(1), [0; 32]),
            Err(WalletError::InvalidAddress(_))
        ));
        assert!(matches!(
            build(&w, &recipient(), Amount::ZERO, [0; 32]),
            Err(WalletError::InsufficientAmount(_))
        ));

        let tx = build(&w, &recipient(), Amount::from_lamports(7), [1; 32]).unwrap();
        assert_eq!(tx.from, w.ledger_address);
        assert_eq!(tx.message.as_transfer().unwrap().amount, Amount::from_lamports(7));
    }

    #[test]
    fn test_build_resolves_quantum_recipient() {
        let w = wallet(AdapterPolicy::OutOfBand);
        let other = wallet(AdapterPolicy::OutOfBand);
        let tx = build(&w, &other.quantum_address.to_string(), Amount::from_lamports(1), [0; 32]).unwrap();
        assert_eq!(tx.to, other.ledger_address);
    }

    #[test]
    fn test_sign_out_of_band_attests() {
        let w = wallet(AdapterPolicy::OutOfBand);
        let unsigned = build(&w, &recipient(), Amount::from_lamports(1), [0; 32]).unwrap();
        let signed = sign(unsigned, &w.primary_keypair, w.signature_policy).unwrap();

        let attestation = signed.attestation.as_ref().unwrap();
        assert!(verify_attestation(attestation, &signed.transaction.signatures[0]));
        assert_eq!(Transaction::decode(&signed.wire).unwrap(), signed.transaction);
    }

    #[test]
    fn test_sign_truncating_has_no_attestation() {
        let w = wallet(AdapterPolicy::Truncating);
        let unsigned = build(&w, &recipient(), Amount::from_lamports(1), [0; 32]).unwrap();
        let signed = sign(unsigned, &w.primary_keypair, w.signature_policy).unwrap();
        assert!(signed.attestation.is_none());
    }

    #[tokio::test]
    async fn test_submit_retries_transient_failures() {
        let ledger = Arc::new(MemoryLedger::new());
        let w = wallet(AdapterPolicy::OutOfBand);
        ledger.fund(&w.ledger_address, Amount::from_lamports(100));

        let unsigned = build(&w, &recipient(), Amount::from_lamports(10), [0; 32]).unwrap();
        let signed = sign(unsigned, &w.primary_keypair, w.signature_policy).unwrap();

        ledger.fail_next(2);
        let submitter = Submitter::new(ledger.clone(), fast_policy());
        let remote = submitter.submit(&signed).await.unwrap();
        assert_eq!(Some(remote), signed.transaction.id());
        assert_eq!(ledger.calls(), 3);
    }

    #[tokio::test]
    async fn test_submit_gives_up_after_bounded_retries() {
        let ledger = Arc::new(MemoryLedger::new());
        let w = wallet(AdapterPolicy::OutOfBand);
        let unsigned = build(&w, &recipient(), Amount::from_lamports(10), [0; 32]).unwrap();
        let signed = sign(unsigned, &w.primary_keypair, w.signature_policy).unwrap();

        ledger.fail_next(10);
        let err = Submitter::new(ledger.clone(), fast_policy())
            .submit(&signed)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Network(_)));
        assert_eq!(ledger.calls(), 4);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let ledger = Arc::new(MemoryLedger::new());
        let w = wallet(AdapterPolicy::OutOfBand);
        let unsigned = build(&w, &recipient(), Amount::from_lamports(10), [0; 32]).unwrap();
        let signed = sign(unsigned, &w.primary_keypair, w.signature_policy).unwrap();

        let err = Submitter::new(ledger.clone(), fast_policy())
            .submit(&signed)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Rejected(_)));
        assert_eq!(ledger.calls(), 1);
    }

    #[tokio::test]
    async fn test_confirm_reports_unknown_on_timeout() {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.never_confirm();
        let sig = ledger
            .request_airdrop(&LedgerAddress::from_array([1; 32]), Amount::from_lamports(1))
            .await
            .unwrap();

        let status = Submitter::new(ledger.clone(), fast_policy())
            .confirm(&sig)
            .await
            .unwrap();
        assert_eq!(status, ConfirmationStatus::Unknown);
        assert!(ledger.calls() > 2);
    }

    #[tokio::test]
    async fn test_confirm_survives_transient_poll_errors() {
        let ledger = Arc::new(MemoryLedger::new());
        let sig = ledger
            .request_airdrop(&LedgerAddress::from_array([1; 32]), Amount::from_lamports(1))
            .await
            .unwrap();
        ledger.confirm_after_polls(0);
        ledger.fail_next(2);

        let status = Submitter::new(ledger, fast_policy()).confirm(&sig).await.unwrap();
        assert_eq!(status, ConfirmationStatus::Confirmed);
    }
}
