//! In-process ledger.
//!
//! Accepts the same wire transactions as the real ledger and models the
//! parts of its behaviour the wallet depends on: balances, airdrops,
//! delayed confirmation, duplicate submission, and refusals. Faults can be
//! injected to exercise retry and timeout paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use qwallet_core::constants::BLOCKHASH_SIZE;
use qwallet_core::error::{Result, WalletError};
use qwallet_core::traits::LedgerRpc;
use qwallet_core::types::{Amount, ConfirmationStatus, LedgerAddress};
use qwallet_crypto::hash::shake256_array;

use crate::wire::Transaction;

const DOMAIN_MEMORY_BLOCKHASH: &[u8] = b"qwallet/memory-ledger/blockhash";

#[derive(Debug)]
struct Landing {
    credit: LedgerAddress,
    debit: Option<LedgerAddress>,
    amount: Amount,
    polls_left: u32,
    status: ConfirmationStatus,
}

#[derive(Debug, Default)]
struct State {
    balances: HashMap<LedgerAddress, u64>,
    landings: HashMap<String, Landing>,
    transient_failures: u32,
    reject_next: Option<String>,
    confirm_after_polls: u32,
    never_confirm: bool,
    slot: u64,
}

/// Ledger held in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
    calls: AtomicU64,
    airdrops: AtomicU64,
}

impl MemoryLedger {
    /// Empty ledger; transactions confirm on first poll.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits an account directly.
    pub fn fund(&self, address: &LedgerAddress, amount: Amount) {
        *self.state.lock().balances.entry(*address).or_default() += amount.lamports();
    }

    /// Settled balance of an account.
    pub fn balance_of(&self, address: &LedgerAddress) -> Amount {
        Amount::from_lamports(
            self.state
                .lock()
                .balances
                .get(address)
                .copied()
                .unwrap_or_default(),
        )
    }

    /// Makes the next `n` calls fail with a transient network error.
    pub fn fail_next(&self, n: u32) {
        self.state.lock().transient_failures = n;
    }

    /// Makes the next submission be refused with `reason`.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.state.lock().reject_next = Some(reason.into());
    }

    /// Number of status polls before a landing settles.
    pub fn confirm_after_polls(&self, polls: u32) {
        self.state.lock().confirm_after_polls = polls;
    }

    /// Keeps every landing pending forever.
    pub fn never_confirm(&self) {
        self.state.lock().never_confirm = true;
    }

    /// Lets landings settle again after [`never_confirm`](Self::never_confirm).
    pub fn resume_confirmations(&self) {
        self.state.lock().never_confirm = false;
    }

    /// Total RPC calls received, failed ones included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Distinct transactions and airdrops accepted.
    pub fn landed(&self) -> usize {
        self.state.lock().landings.len()
    }

    /// Counts the call and applies any injected transient failure.
    fn enter(&self, op: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            debug!(op, remaining = state.transient_failures, "Injected transient failure");
            return Err(WalletError::network(format!("{op}: connection reset")));
        }
        Ok(())
    }

    fn land(state: &mut State, id: String, landing: Landing) -> String {
        let polls_left = state.confirm_after_polls;
        state.landings.entry(id.clone()).or_insert(Landing {
            polls_left,
            ..landing
        });
        id
    }
}

impl State {
    fn settle(&mut self, landing_id: &str) -> ConfirmationStatus {
        let never_confirm = self.never_confirm;
        let Some(landing) = self.landings.get_mut(landing_id) else {
            return ConfirmationStatus::Pending;
        };
        if landing.status.is_terminal() || never_confirm {
            return landing.status;
        }
        if landing.polls_left > 0 {
            landing.polls_left -= 1;
            return landing.status;
        }

        let (credit, debit, lamports) = (landing.credit, landing.debit, landing.amount.lamports());
        let funded = match debit {
            Some(from) => self.balances.get(&from).copied().unwrap_or_default() >= lamports,
            None => true,
        };

        let status = if funded {
            if let Some(from) = debit {
                *self.balances.entry(from).or_default() -= lamports;
            }
            *self.balances.entry(credit).or_default() += lamports;
            ConfirmationStatus::Confirmed
        } else {
            ConfirmationStatus::Failed
        };
        if let Some(landing) = self.landings.get_mut(landing_id) {
            landing.status = status;
        }
        status
    }
}

#[async_trait]
impl LedgerRpc for MemoryLedger {
    async fn get_balance(&self, address: &LedgerAddress) -> Result<Amount> {
        self.enter("getBalance")?;
        Ok(self.balance_of(address))
    }

    #[instrument(skip(self), fields(address = %address, lamports = amount.lamports()))]
    async fn request_airdrop(&self, address: &LedgerAddress, amount: Amount) -> Result<String> {
        self.enter("requestAirdrop")?;
        if amount.is_zero() {
            return Err(WalletError::Rejected("airdrop amount must be positive".into()));
        }
        let n = self.airdrops.fetch_add(1, Ordering::SeqCst);
        let id = bs58::encode(shake256_array::<64>(
            b"qwallet/memory-ledger/airdrop",
            &[&address.as_bytes()[..], &n.to_le_bytes()[..]],
        ))
        .into_string();

        let mut state = self.state.lock();
        Ok(Self::land(
            &mut state,
            id,
            Landing {
                credit: *address,
                debit: None,
                amount,
                polls_left: 0,
                status: ConfirmationStatus::Pending,
            },
        ))
    }

    #[instrument(skip(self, transaction), fields(len = transaction.len()))]
    async fn send_raw_transaction(&self, transaction: &[u8]) -> Result<String> {
        self.enter("sendTransaction")?;
        let tx = Transaction::decode(transaction)
            .map_err(|e| WalletError::Rejected(format!("malformed transaction: {e}")))?;
        let transfer = tx
            .message
            .as_transfer()
            .ok_or_else(|| WalletError::Rejected("unsupported instruction".into()))?;
        let id = tx
            .id()
            .ok_or_else(|| WalletError::Rejected("transaction carries no signature".into()))?;

        let mut state = self.state.lock();
        if let Some(reason) = state.reject_next.take() {
            return Err(WalletError::Rejected(reason));
        }
        // Resubmitting a landed transaction returns its id without paying twice
        if state.landings.contains_key(&id) {
            debug!(%id, "Duplicate submission");
            return Ok(id);
        }
        let available = state.balances.get(&transfer.from).copied().unwrap_or_default();
        if available < transfer.amount.lamports() {
            return Err(WalletError::Rejected(format!(
                "insufficient funds: balance {available}, need {}",
                transfer.amount.lamports()
            )));
        }

        Ok(Self::land(
            &mut state,
            id,
            Landing {
                credit: transfer.to,
                debit: Some(transfer.from),
                amount: transfer.amount,
                polls_left: 0,
                status: ConfirmationStatus::Pending,
            },
        ))
    }

    async fn get_signature_status(&self, signature: &str) -> Result<ConfirmationStatus> {
        self.enter("getSignatureStatuses")?;
        Ok(self.state.lock().settle(signature))
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; BLOCKHASH_SIZE]> {
        self.enter("getLatestBlockhash")?;
        let mut state = self.state.lock();
        state.slot += 1;
        Ok(shake256_array(DOMAIN_MEMORY_BLOCKHASH, &[&state.slot.to_le_bytes()[..]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Message;

    fn addr(b: u8) -> LedgerAddress {
        LedgerAddress::from_array([b; 32])
    }

    fn transfer(from: u8, to: u8, lamports: u64, sig: u8) -> Vec<u8> {
        Transaction {
            signatures: vec![[sig; 64]],
            message: Message::transfer(addr(from), addr(to), Amount::from_lamports(lamports), [0u8; 32]),
        }
        .serialize()
        .unwrap()
    }

    #[tokio::test]
    async fn test_airdrop_settles_on_poll() {
        let ledger = MemoryLedger::new();
        ledger.confirm_after_polls(2);
        let sig = ledger
            .request_airdrop(&addr(1), Amount::from_lamports(10))
            .await
            .unwrap();

        assert_eq!(ledger.get_signature_status(&sig).await.unwrap(), ConfirmationStatus::Pending);
        assert_eq!(ledger.get_balance(&addr(1)).await.unwrap(), Amount::ZERO);
        assert_eq!(ledger.get_signature_status(&sig).await.unwrap(), ConfirmationStatus::Pending);
        assert_eq!(ledger.get_signature_status(&sig).await.unwrap(), ConfirmationStatus::Confirmed);
        assert_eq!(ledger.get_balance(&addr(1)).await.unwrap(), Amount::from_lamports(10));
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_once() {
        let ledger = MemoryLedger::new();
        ledger.fund(&addr(1), Amount::from_lamports(100));

        let tx = transfer(1, 2, 40, 5);
        let id = ledger.send_raw_transaction(&tx).await.unwrap();
        assert_eq!(ledger.send_raw_transaction(&tx).await.unwrap(), id);
        assert_eq!(ledger.landed(), 1);

        assert_eq!(ledger.get_signature_status(&id).await.unwrap(), ConfirmationStatus::Confirmed);
        assert_eq!(ledger.get_signature_status(&id).await.unwrap(), ConfirmationStatus::Confirmed);
        assert_eq!(ledger.balance_of(&addr(1)), Amount::from_lamports(60));
        assert_eq!(ledger.balance_of(&addr(2)), Amount::from_lamports(40));
    }

    #[tokio::test]
    async fn test_insufficient_funds_rejected() {
        let ledger = MemoryLedger::new();
        let err = ledger.send_raw_transaction(&transfer(1, 2, 1, 5)).await.unwrap_err();
        assert!(matches!(err, WalletError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let ledger = MemoryLedger::new();
        ledger.fail_next(2);
        assert!(ledger.get_latest_blockhash().await.unwrap_err().is_recoverable());
        assert!(ledger.get_balance(&addr(1)).await.unwrap_err().is_recoverable());
        assert!(ledger.get_latest_blockhash().await.is_ok());
        assert_eq!(ledger.calls(), 3);

        ledger.fund(&addr(1), Amount::from_lamports(5));
        ledger.reject_next("blockhash expired");
        let err = ledger.send_raw_transaction(&transfer(1, 2, 1, 6)).await.unwrap_err();
        assert!(matches!(err, WalletError::Rejected(ref m) if m == "blockhash expired"));
    }

    #[tokio::test]
    async fn test_unknown_signature_is_pending() {
        let ledger = MemoryLedger::new();
        assert_eq!(
            ledger.get_signature_status("nope").await.unwrap(),
            ConfirmationStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_overdrawn_at_settlement_fails() {
        let ledger = MemoryLedger::new();
        ledger.fund(&addr(1), Amount::from_lamports(10));
        ledger.confirm_after_polls(1);
        let a = ledger.send_raw_transaction(&transfer(1, 2, 10, 1)).await.unwrap();
        let b = ledger.send_raw_transaction(&transfer(1, 3, 10, 2)).await.unwrap();

        for id in [&a, &b] {
            ledger.get_signature_status(id).await.unwrap();
        }
        assert_eq!(ledger.get_signature_status(&a).await.unwrap(), ConfirmationStatus::Confirmed);
        assert_eq!(ledger.get_signature_status(&b).await.unwrap(), ConfirmationStatus::Failed);
    }
}
