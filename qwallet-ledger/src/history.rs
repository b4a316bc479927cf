//! Transaction history kept inside the wallet record.
//!
//! Entries are only ever appended. A status moves forward at most once,
//! from pending (or unknown) to confirmed or failed; reconciling a second
//! time with no new ledger events changes nothing.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use qwallet_core::error::Result;
use qwallet_core::traits::LedgerRpc;
use qwallet_core::types::{ConfirmationStatus, TransactionEntry, WalletRecord};

/// Outcome of one reconcile pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Pending entries that were polled
    pub checked: usize,
    /// Entries that moved to confirmed
    pub confirmed: usize,
    /// Entries that moved to failed
    pub failed: usize,
    /// Entries still without a verdict
    pub unresolved: usize,
}

impl ReconcileReport {
    /// Whether the pass changed any entry.
    pub fn changed(&self) -> bool {
        self.confirmed + self.failed > 0
    }
}

/// Appends an entry.
///
/// Sends and airdrops are recorded by [`WalletService`](crate::WalletService);
/// this is also the entry point for incoming transfers the caller learns
/// of elsewhere. A receive with a ledger signature is reconciled like any
/// other pending entry.
pub fn record(wallet: &mut WalletRecord, entry: TransactionEntry) {
    debug!(wallet = %wallet.name, id = %entry.id, direction = %entry.direction, "History entry recorded");
    wallet.history.push(entry);
}

/// Entries in chronological order.
///
/// Entries recorded within the same instant keep their insertion order.
pub fn list(wallet: &WalletRecord) -> Vec<&TransactionEntry> {
    let mut entries: Vec<_> = wallet.history.iter().collect();
    entries.sort_by_key(|e| e.local_timestamp);
    entries
}

/// Ledger signatures of entries still awaiting a verdict.
pub fn pending_signatures(wallet: &WalletRecord) -> Vec<String> {
    wallet
        .pending_entries()
        .filter_map(|e| e.remote_signature.clone())
        .collect()
}

/// Polls the ledger once for each signature.
///
/// Transient failures leave that signature out of the result so it is
/// retried on the next pass. Any other failure aborts.
#[instrument(skip_all, fields(count = signatures.len()))]
pub async fn fetch_statuses(
    rpc: &dyn LedgerRpc,
    signatures: &[String],
) -> Result<Vec<(String, ConfirmationStatus)>> {
    let mut statuses = Vec::with_capacity(signatures.len());
    for signature in signatures {
        match rpc.get_signature_status(signature).await {
            Ok(status) => statuses.push((signature.clone(), status)),
            Err(e) if e.is_recoverable() => {
                warn!(%signature, error = %e, "Status unavailable, leaving entry pending");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(statuses)
}

/// Applies polled statuses to matching entries.
///
/// Only terminal statuses are applied; `Pending` and `Unknown` results
/// leave the entry as it was.
pub fn apply_statuses(
    wallet: &mut WalletRecord,
    statuses: &[(String, ConfirmationStatus)],
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for entry in wallet.history.iter_mut() {
        if entry.status().is_terminal() {
            continue;
        }
        let Some(signature) = entry.remote_signature.as_deref() else {
            continue;
        };
        let Some(&(_, status)) = statuses.iter().find(|(s, _)| s == signature) else {
            continue;
        };

        report.checked += 1;
        if !status.is_terminal() {
            report.unresolved += 1;
            continue;
        }
        match entry.transition(status) {
            Ok(true) if status == ConfirmationStatus::Confirmed => report.confirmed += 1,
            Ok(true) => report.failed += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(id = %entry.id, error = %e, "Ignoring status update");
                report.unresolved += 1;
            }
        }
    }

    if report.changed() {
        info!(
            wallet = %wallet.name,
            confirmed = report.confirmed,
            failed = report.failed,
            unresolved = report.unresolved,
            "History reconciled"
        );
    }
    report
}

/// Sets the status of the entry carrying `signature`.
///
/// Returns whether an entry changed. Non-terminal statuses are ignored.
pub fn settle(wallet: &mut WalletRecord, signature: &str, status: ConfirmationStatus) -> bool {
    apply_statuses(wallet, &[(signature.to_string(), status)]).changed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryLedger;
    use qwallet_core::types::{
        AdapterPolicy, Address, Amount, Direction, HashVariant, LedgerAddress, Network, Scheme,
    };

    fn wallet() -> WalletRecord {
        let kp = qwallet_crypto::generate(Scheme::Lamport, 1, HashVariant::Sha256).unwrap();
        let (q, l) = qwallet_crypto::addresses_of(&kp);
        WalletRecord::new("h", Network::Devnet, kp, None, AdapterPolicy::OutOfBand, q, l).unwrap()
    }

    fn entry(sig: Option<&str>) -> TransactionEntry {
        TransactionEntry::pending(
            Direction::Send,
            Address::from(LedgerAddress::from_array([9u8; 32])),
            Amount::from_lamports(1),
            sig.map(str::to_string),
        )
    }

    #[test]
    fn test_record_and_list_chronological() {
        let mut w = wallet();
        record(&mut w, entry(Some("a")));
        record(&mut w, entry(Some("b")));
        record(&mut w, entry(None));

        let listed = list(&w);
        assert_eq!(listed.len(), 3);
        assert!(listed.windows(2).all(|p| p[0].local_timestamp <= p[1].local_timestamp));
        assert_eq!(pending_signatures(&w), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut w = wallet();
        record(&mut w, entry(Some("a")));
        record(&mut w, entry(Some("b")));
        record(&mut w, entry(Some("c")));

        let statuses = vec![
            ("a".to_string(), ConfirmationStatus::Confirmed),
            ("b".to_string(), ConfirmationStatus::Failed),
            ("c".to_string(), ConfirmationStatus::Pending),
        ];
        let first = apply_statuses(&mut w, &statuses);
        assert_eq!(
            first,
            ReconcileReport { checked: 3, confirmed: 1, failed: 1, unresolved: 1 }
        );

        let snapshot = w.history.clone();
        let second = apply_statuses(&mut w, &statuses);
        assert!(!second.changed());
        assert_eq!(w.history, snapshot);
    }

    #[test]
    fn test_terminal_status_never_moves_back() {
        let mut w = wallet();
        record(&mut w, entry(Some("a")));
        assert!(settle(&mut w, "a", ConfirmationStatus::Confirmed));
        assert!(!settle(&mut w, "a", ConfirmationStatus::Failed));
        assert!(!settle(&mut w, "a", ConfirmationStatus::Pending));
        assert_eq!(w.history[0].status(), ConfirmationStatus::Confirmed);
    }

    #[test]
    fn test_unknown_keeps_entry_pending() {
        let mut w = wallet();
        record(&mut w, entry(Some("a")));
        assert!(!settle(&mut w, "a", ConfirmationStatus::Unknown));
        assert_eq!(w.history[0].status(), ConfirmationStatus::Pending);
        assert_eq!(pending_signatures(&w).len(), 1);
    }

    #[tokio::test]
    async fn test_recorded_receive_reconciles() {
        let ledger = MemoryLedger::new();
        let mut w = wallet();
        let sender = LedgerAddress::from_array([3; 32]);
        let sig = ledger
            .request_airdrop(&w.ledger_address, Amount::from_lamports(40))
            .await
            .unwrap();

        record(
            &mut w,
            TransactionEntry::pending(
                Direction::Receive,
                Address::from(sender),
                Amount::from_lamports(40),
                Some(sig.clone()),
            ),
        );
        assert_eq!(pending_signatures(&w), vec![sig.clone()]);

        let statuses = fetch_statuses(&ledger, &pending_signatures(&w)).await.unwrap();
        let report = apply_statuses(&mut w, &statuses);
        assert_eq!(report.confirmed, 1);

        let listed = list(&w);
        assert_eq!(listed[0].direction, Direction::Receive);
        assert_eq!(listed[0].status(), ConfirmationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_fetch_skips_transient_failures() {
        let ledger = MemoryLedger::new();
        let sig = ledger
            .request_airdrop(&LedgerAddress::from_array([1; 32]), Amount::from_lamports(5))
            .await
            .unwrap();

        ledger.fail_next(1);
        let statuses = fetch_statuses(&ledger, &[sig.clone(), "missing".into()])
            .await
            .unwrap();
        assert_eq!(statuses, vec![("missing".to_string(), ConfirmationStatus::Pending)]);

        let statuses = fetch_statuses(&ledger, &[sig.clone()]).await.unwrap();
        assert_eq!(statuses, vec![(sig, ConfirmationStatus::Confirmed)]);
    }
}
