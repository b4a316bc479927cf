//! Wallet operations that talk to the ledger.
//!
//! A decrypted record is never held across a network wait. Each operation
//! loads the record, takes what it needs, drops it, does the I/O, then
//! reloads to append or update history and saves again. The store is
//! synchronous and key derivation is deliberately slow, so store calls run
//! on the blocking pool.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use qwallet_core::context::WalletContext;
use qwallet_core::error::{Result, WalletError};
use qwallet_core::traits::LedgerRpc;
use qwallet_core::types::{
    Address, Amount, ConfirmationStatus, Direction, Network, Scheme, TransactionEntry,
    WalletRecord,
};
use qwallet_store::WalletStore;

use crate::history::{self, ReconcileReport};
use crate::signer::{self, SubmitPolicy, Submitter};

/// Result of an airdrop or send.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    /// History entry created for the transfer
    pub entry_id: Uuid,
    /// Ledger signature
    pub remote_signature: String,
    /// Status when polling stopped
    pub status: ConfirmationStatus,
}

/// Ledger-facing wallet operations.
#[derive(Clone)]
pub struct WalletService {
    store: WalletStore,
    network: Network,
    submitter: Submitter,
}

impl WalletService {
    /// Service for wallets on `network`.
    pub fn new(
        store: WalletStore,
        rpc: Arc<dyn LedgerRpc>,
        network: Network,
        policy: SubmitPolicy,
    ) -> Self {
        Self {
            store,
            network,
            submitter: Submitter::new(rpc, policy),
        }
    }

    /// Service using the context's store and limits.
    pub fn from_context(ctx: &WalletContext, rpc: Arc<dyn LedgerRpc>) -> Result<Self> {
        Ok(Self::new(
            WalletStore::from_context(ctx)?,
            rpc,
            ctx.network,
            SubmitPolicy::from_context(ctx),
        ))
    }

    /// Underlying store.
    pub fn store(&self) -> &WalletStore {
        &self.store
    }

    /// Network this service talks to.
    pub fn network(&self) -> Network {
        self.network
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current balance of a wallet's ledger account.
    #[instrument(skip(self, password))]
    pub async fn balance(&self, name: &str, password: &str) -> Result<Amount> {
        let account = self.load(name, password).await?.ledger_address;
        self.submitter
            .with_retry("getBalance", || self.submitter.rpc().get_balance(&account))
            .await
    }

    /// Requests faucet funds and waits for confirmation.
    ///
    /// # Errors
    /// `InvalidParameters` on mainnet, or for a zero amount.
    #[instrument(skip(self, password), fields(lamports = amount.lamports()))]
    pub async fn airdrop(&self, name: &str, password: &str, amount: Amount) -> Result<TransferOutcome> {
        if !self.network.allows_airdrop() {
            return Err(WalletError::invalid(format!(
                "airdrops are not available on {}",
                self.network
            )));
        }
        if amount.is_zero() {
            return Err(WalletError::invalid("airdrop amount must be greater than zero"));
        }

        let account = self.load(name, password).await?.ledger_address;
        let remote = self
            .submitter
            .with_retry("requestAirdrop", || {
                self.submitter.rpc().request_airdrop(&account, amount)
            })
            .await?;
        info!(signature = %remote, "Airdrop requested");

        let entry = TransactionEntry::pending(
            Direction::Airdrop,
            Address::from(account),
            amount,
            Some(remote.clone()),
        );
        self.finish(name, password, entry, remote).await
    }

    /// Builds, signs, submits and confirms a transfer.
    ///
    /// The pending history entry is written only after the ledger accepts
    /// the transaction.
    #[instrument(skip(self, password), fields(lamports = amount.lamports()))]
    pub async fn send(
        &self,
        name: &str,
        password: &str,
        recipient: &str,
        amount: Amount,
    ) -> Result<TransferOutcome> {
        let blockhash = self
            .submitter
            .with_retry("getLatestBlockhash", || {
                self.submitter.rpc().get_latest_blockhash()
            })
            .await?;

        let signed = {
            let wallet = self.load(name, password).await?;
            warn_on_lamport_reuse(&wallet);
            let unsigned = signer::build(&wallet, recipient, amount, blockhash)?;
            signer::sign(unsigned, &wallet.primary_keypair, wallet.signature_policy)?
        };

        let remote = self.submitter.submit(&signed).await?;
        let entry = TransactionEntry::pending(
            Direction::Send,
            signed.recipient.clone(),
            amount,
            Some(remote.clone()),
        )
        .with_attestation(signed.attestation);
        self.finish(name, password, entry, remote).await
    }

    /// Re-polls every pending entry.
    #[instrument(skip(self, password))]
    pub async fn reconcile(&self, name: &str, password: &str) -> Result<ReconcileReport> {
        let signatures = history::pending_signatures(&self.load(name, password).await?);
        if signatures.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let statuses = history::fetch_statuses(self.submitter.rpc(), &signatures).await?;
        let report = self
            .update(name, password, move |wallet| {
                history::apply_statuses(wallet, &statuses)
            })
            .await?;
        Ok(ReconcileReport {
            unresolved: report.unresolved + signatures.len().saturating_sub(report.checked),
            ..report
        })
    }

    /// History in chronological order.
    pub async fn history(&self, name: &str, password: &str) -> Result<Vec<TransactionEntry>> {
        let wallet = self.load(name, password).await?;
        Ok(history::list(&wallet).into_iter().cloned().collect())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Records a pending entry, polls for a verdict, and records the verdict.
    async fn finish(
        &self,
        name: &str,
        password: &str,
        entry: TransactionEntry,
        remote: String,
    ) -> Result<TransferOutcome> {
        let entry_id = entry.id;
        self.update(name, password, move |wallet| history::record(wallet, entry))
            .await?;

        let status = self.submitter.confirm(&remote).await?;
        if status.is_terminal() {
            let signature = remote.clone();
            self.update(name, password, move |wallet| {
                history::settle(wallet, &signature, status)
            })
            .await?;
        }

        Ok(TransferOutcome {
            entry_id,
            remote_signature: remote,
            status,
        })
    }

    async fn load(&self, name: &str, password: &str) -> Result<WalletRecord> {
        let network = self.network;
        let (name, password) = (name.to_string(), password.to_string());
        let wallet = self
            .blocking(move |store| store.load(&name, &password))
            .await?;
        if wallet.network != network {
            return Err(WalletError::invalid(format!(
                "wallet '{}' belongs to {}, not {network}",
                wallet.name, wallet.network
            )));
        }
        Ok(wallet)
    }

    /// Reload, mutate, save.
    async fn update<T, F>(&self, name: &str, password: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut WalletRecord) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (name, password) = (name.to_string(), password.to_string());
        self.blocking(move |store| {
            let mut wallet = store.load(&name, &password)?;
            let out = f(&mut wallet);
            store.save(&wallet, &password)?;
            Ok(out)
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&WalletStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| WalletError::Storage(format!("store task failed: {e}")))?
    }
}

fn warn_on_lamport_reuse(wallet: &WalletRecord) {
    if wallet.primary_keypair.scheme != Scheme::Lamport {
        return;
    }
    let signed_before = wallet
        .history
        .iter()
        .filter(|e| e.direction == Direction::Send)
        .count();
    if signed_before > 0 {
        warn!(
            wallet = %wallet.name,
            signed_before,
            "Lamport keys are one-time; signing again weakens this key"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use qwallet_core::constants::{LAMPORTS_PER_SOL, MIN_KDF_ROUNDS};
    use qwallet_core::types::{AdapterPolicy, HashVariant, LedgerAddress};
    use qwallet_store::NewWallet;
    use tempfile::TempDir;

    use crate::adapter::verify_attestation;
    use crate::memory::MemoryLedger;

    const PW: &str = "pw1";

    fn policy() -> SubmitPolicy {
        SubmitPolicy {
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1),
            confirmation_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn setup(network: Network) -> (TempDir, Arc<MemoryLedger>, WalletService) {
        let dir = TempDir::new().unwrap();
        let store = WalletStore::new(dir.path(), MIN_KDF_ROUNDS).unwrap();
        let ledger = Arc::new(MemoryLedger::new());
        let service = WalletService::new(store, ledger.clone(), network, policy());
        (dir, ledger, service)
    }

    fn create(service: &WalletService, name: &str, network: Network) -> WalletRecord {
        let primary = qwallet_crypto::generate(Scheme::Dilithium, 3, HashVariant::Sha3_256).unwrap();
        service
            .store()
            .create(
                NewWallet {
                    name: name.into(),
                    network,
                    primary,
                    backup: None,
                    policy: AdapterPolicy::OutOfBand,
                },
                PW,
                false,
            )
            .unwrap()
    }

    fn sol(n: u64) -> Amount {
        Amount::from_lamports(n * LAMPORTS_PER_SOL)
    }

    #[tokio::test]
    async fn test_airdrop_then_balance() {
        let (_dir, _ledger, service) = setup(Network::Devnet);
        create(&service, "alice", Network::Devnet);

        assert_eq!(service.balance("alice", PW).await.unwrap(), Amount::ZERO);
        let outcome = service.airdrop("alice", PW, sol(1)).await.unwrap();
        assert_eq!(outcome.status, ConfirmationStatus::Confirmed);
        assert_eq!(service.balance("alice", PW).await.unwrap(), sol(1));

        let history = service.history("alice", PW).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, outcome.entry_id);
        assert_eq!(history[0].direction, Direction::Airdrop);
        assert_eq!(history[0].amount, sol(1));
        assert_eq!(history[0].status(), ConfirmationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_airdrop_refused_on_mainnet() {
        let (_dir, ledger, service) = setup(Network::Mainnet);
        create(&service, "alice", Network::Mainnet);
        let err = service.airdrop("alice", PW, sol(1)).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidParameters(_)));
        assert_eq!(ledger.calls(), 0);
    }

    #[tokio::test]
    async fn test_wallet_network_must_match() {
        let (_dir, _ledger, service) = setup(Network::Devnet);
        create(&service, "alice", Network::Testnet);
        assert!(matches!(
            service.balance("alice", PW).await,
            Err(WalletError::InvalidParameters(_))
        ));
    }

    #[tokio::test]
    async fn test_send_moves_funds_and_attests() {
        let (_dir, ledger, service) = setup(Network::Devnet);
        let alice = create(&service, "alice", Network::Devnet);
        let bob = create(&service, "bob", Network::Devnet);
        ledger.fund(&alice.ledger_address, sol(2));

        let outcome = service
            .send("alice", PW, &bob.quantum_address.to_string(), sol(1))
            .await
            .unwrap();
        assert_eq!(outcome.status, ConfirmationStatus::Confirmed);
        assert_eq!(ledger.balance_of(&alice.ledger_address), sol(1));
        assert_eq!(ledger.balance_of(&bob.ledger_address), sol(1));

        let history = service.history("alice", PW).await.unwrap();
        let entry = &history[0];
        assert_eq!(entry.direction, Direction::Send);
        assert_eq!(entry.remote_signature.as_deref(), Some(outcome.remote_signature.as_str()));

        let slot: [u8; 64] = bs58::decode(&outcome.remote_signature)
            .into_vec()
            .unwrap()
            .try_into()
            .unwrap();
        assert!(verify_attestation(entry.attestation.as_ref().unwrap(), &slot));
    }

    #[tokio::test]
    async fn test_rejected_send_leaves_history_untouched() {
        let (_dir, ledger, service) = setup(Network::Devnet);
        create(&service, "alice", Network::Devnet);
        let to = LedgerAddress::from_array([5; 32]).to_string();

        let err = service.send("alice", PW, &to, sol(1)).await.unwrap_err();
        assert!(matches!(err, WalletError::Rejected(_)));
        assert!(service.history("alice", PW).await.unwrap().is_empty());
        assert_eq!(ledger.landed(), 0);
    }

    #[tokio::test]
    async fn test_invalid_inputs_fail_before_network_send() {
        let (_dir, ledger, service) = setup(Network::Devnet);
        create(&service, "alice", Network::Devnet);

        let err = service.send("alice", PW, "nope", sol(1)).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(_)));
        let to = LedgerAddress::from_array([5; 32]).to_string();
        let err = service.send("alice", PW, &to, Amount::ZERO).await.unwrap_err();
        assert!(matches!(err, WalletError::InsufficientAmount(_)));
        assert_eq!(ledger.landed(), 0);
    }

    #[tokio::test]
    async fn test_timeout_then_reconcile() {
        let (_dir, ledger, service) = setup(Network::Devnet);
        create(&service, "alice", Network::Devnet);

        ledger.never_confirm();
        let outcome = service.airdrop("alice", PW, sol(1)).await.unwrap();
        assert_eq!(outcome.status, ConfirmationStatus::Unknown);
        let history = service.history("alice", PW).await.unwrap();
        assert_eq!(history[0].status(), ConfirmationStatus::Pending);

        let report = service.reconcile("alice", PW).await.unwrap();
        assert_eq!(report.unresolved, 1);
        assert!(!report.changed());

        ledger.resume_confirmations();
        let report = service.reconcile("alice", PW).await.unwrap();
        assert_eq!(report.confirmed, 1);
        assert_eq!(service.balance("alice", PW).await.unwrap(), sol(1));

        let before = service.history("alice", PW).await.unwrap();
        let again = service.reconcile("alice", PW).await.unwrap();
        assert_eq!(again, ReconcileReport::default());
        assert_eq!(service.history("alice", PW).await.unwrap(), before);
    }
}
