//! Encrypted wallet store.
//!
//! One file per wallet under the storage root. Every write goes through
//! [`write_atomic`], so a crash mid-save leaves the previous file intact.
//! Key material only ever reaches disk inside an [`EncryptedBlob`].

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use qwallet_core::constants::MIN_KDF_ROUNDS;
use qwallet_core::context::WalletContext;
use qwallet_core::error::{Result, WalletError};
use qwallet_core::types::{
    validate_wallet_name, AdapterPolicy, BackupKeypair, Keypair, Network, WalletRecord,
};

use crate::paths::{write_atomic, BackupInfo, StorePaths};
use crate::vault::EncryptedBlob;

/// Parameters for [`WalletStore::create`].
#[derive(Debug)]
pub struct NewWallet {
    /// Wallet name
    pub name: String,
    /// Network the wallet transacts on
    pub network: Network,
    /// Signing keypair
    pub primary: Keypair,
    /// Optional recovery keypair under a different scheme
    pub backup: Option<BackupKeypair>,
    /// Signature slot policy
    pub policy: AdapterPolicy,
}

/// Password-encrypted wallet files under one storage root.
#[derive(Clone, Debug)]
pub struct WalletStore {
    paths: StorePaths,
    kdf_rounds: u32,
}

impl WalletStore {
    /// Store at `root` sealing new saves with `kdf_rounds` PBKDF2 rounds.
    ///
    /// # Errors
    /// `InvalidParameters` if `kdf_rounds` is below the minimum.
    pub fn new(root: impl AsRef<Path>, kdf_rounds: u32) -> Result<Self> {
        if kdf_rounds < MIN_KDF_ROUNDS {
            return Err(WalletError::invalid(format!(
                "kdf_rounds must be at least {MIN_KDF_ROUNDS}, got {kdf_rounds}"
            )));
        }
        Ok(Self {
            paths: StorePaths::new(root)?,
            kdf_rounds,
        })
    }

    /// Store configured from a context.
    pub fn from_context(ctx: &WalletContext) -> Result<Self> {
        Self::new(&ctx.storage_root, ctx.kdf_rounds)
    }

    /// Storage root.
    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    /// Live file of a wallet.
    pub fn wallet_path(&self, name: &str) -> Result<PathBuf> {
        validate_wallet_name(name)?;
        Ok(self.paths.wallet_file(name))
    }

    /// Whether a wallet with this name exists.
    pub fn exists(&self, name: &str) -> bool {
        self.wallet_path(name).map(|p| p.exists()).unwrap_or(false)
    }

    /// Assembles, encrypts and persists a new wallet.
    ///
    /// With `overwrite`, an existing wallet of the same name is snapshotted
    /// before being replaced.
    ///
    /// # Errors
    /// `AlreadyExists` if the name is taken and `overwrite` is false.
    #[instrument(skip(self, wallet, password), fields(name = %wallet.name, scheme = %wallet.primary.scheme))]
    pub fn create(&self, wallet: NewWallet, password: &str, overwrite: bool) -> Result<WalletRecord> {
        let path = self.wallet_path(&wallet.name)?;
        if path.exists() {
            if !overwrite {
                return Err(WalletError::AlreadyExists(format!("wallet '{}'", wallet.name)));
            }
            let snapshot = self.paths.create_backup(&wallet.name)?;
            warn!(backup = %snapshot.path.display(), "Overwriting existing wallet");
        }

        let (quantum, ledger) = qwallet_crypto::addresses_of(&wallet.primary);
        let record = WalletRecord::new(
            &wallet.name,
            wallet.network,
            wallet.primary,
            wallet.backup,
            wallet.policy,
            quantum,
            ledger,
        )?;
        self.save(&record, password)?;

        info!(address = %record.quantum_address, ledger = %record.ledger_address, "Wallet created");
        Ok(record)
    }

    /// Encrypts and atomically writes a record.
    #[instrument(skip(self, record, password), fields(name = %record.name, entries = record.history.len()))]
    pub fn save(&self, record: &WalletRecord, password: &str) -> Result<EncryptedBlob> {
        let path = self.wallet_path(&record.name)?;
        let plaintext = Zeroizing::new(serde_json::to_vec(record)?);
        let blob = EncryptedBlob::seal(&plaintext, password, self.kdf_rounds)?;
        write_atomic(&path, &blob.to_json()?)?;
        debug!(path = %path.display(), "Wallet saved");
        Ok(blob)
    }

    /// Loads and decrypts a wallet.
    ///
    /// # Errors
    /// `NotFound` if no such wallet exists; `DecryptionFailed` for a wrong
    /// password or a corrupt file.
    #[instrument(skip(self, password))]
    pub fn load(&self, name: &str, password: &str) -> Result<WalletRecord> {
        let path = self.wallet_path(name)?;
        if !path.exists() {
            return Err(WalletError::NotFound(format!("wallet '{name}'")));
        }
        let record = open_file(&path, password)?;
        if record.name != name {
            warn!(stored = %record.name, "Wallet file holds a record for another name");
            return Err(WalletError::DecryptionFailed);
        }
        debug!(entries = record.history.len(), "Wallet loaded");
        Ok(record)
    }

    /// Wallet names, sorted. Nothing is decrypted.
    pub fn list(&self) -> Result<Vec<String>> {
        self.paths.wallet_names()
    }

    /// Snapshots the current wallet file.
    ///
    /// Returns every snapshot of the wallet, newest first.
    #[instrument(skip(self))]
    pub fn backup(&self, name: &str) -> Result<Vec<BackupInfo>> {
        validate_wallet_name(name)?;
        let created = self.paths.create_backup(name)?;
        info!(backup = %created.path.display(), "Backup created");
        self.paths.list_backups(name)
    }

    /// Snapshots of a wallet, newest first, without creating one.
    pub fn backups(&self, name: &str) -> Result<Vec<BackupInfo>> {
        validate_wallet_name(name)?;
        self.paths.list_backups(name)
    }

    /// Replaces the live wallet with snapshot `index` (0 = newest).
    ///
    /// The current state is snapshotted first, so a restore can itself be
    /// undone. Returns the snapshot that was restored.
    ///
    /// # Errors
    /// `NotFound` if there is no snapshot at `index`.
    #[instrument(skip(self))]
    pub fn restore(&self, name: &str, index: usize) -> Result<BackupInfo> {
        let path = self.wallet_path(name)?;
        let backups = self.paths.list_backups(name)?;
        let chosen = backups.get(index).cloned().ok_or_else(|| {
            WalletError::NotFound(format!(
                "backup #{index} of '{name}' ({} available)",
                backups.len()
            ))
        })?;

        // Refuse to restore something that is not a wallet file
        let blob = EncryptedBlob::read(&chosen.path)?;
        let bytes = blob.to_json()?;

        if path.exists() {
            let snapshot = self.paths.create_backup(name)?;
            debug!(backup = %snapshot.path.display(), "Pre-restore state saved");
        }
        write_atomic(&path, &bytes)?;

        info!(from = %chosen.timestamp, "Wallet restored");
        Ok(chosen)
    }

    /// Decrypts one snapshot without touching the live wallet.
    pub fn load_backup(&self, info: &BackupInfo, password: &str) -> Result<WalletRecord> {
        open_file(&info.path, password)
    }

    /// Exports a wallet to `dest`.
    ///
    /// Without secrets a plain JSON public profile is written; with secrets
    /// the encrypted wallet file is copied as-is.
    #[instrument(skip(self, password, dest), fields(dest = %dest.display()))]
    pub fn export(
        &self,
        name: &str,
        password: &str,
        dest: &Path,
        include_secrets: bool,
    ) -> Result<PathBuf> {
        let record = self.load(name, password)?;
        let bytes = if include_secrets {
            EncryptedBlob::read(&self.wallet_path(name)?)?.to_json()?
        } else {
            serde_json::to_vec_pretty(&record.public_profile())?
        };
        write_atomic(dest, &bytes)?;
        info!(include_secrets, "Wallet exported");
        Ok(dest.to_path_buf())
    }

    /// Imports an encrypted wallet file, optionally under a new name.
    ///
    /// The file is decrypted to validate it, then re-sealed with this
    /// store's KDF settings.
    ///
    /// # Errors
    /// `DecryptionFailed` if the file does not open with `password`;
    /// `AlreadyExists` if the target name is taken and `overwrite` is false.
    #[instrument(skip(self, password, source), fields(source = %source.display()))]
    pub fn import(
        &self,
        source: &Path,
        password: &str,
        new_name: Option<&str>,
        overwrite: bool,
    ) -> Result<WalletRecord> {
        let mut record = open_file(source, password)?;
        if let Some(name) = new_name {
            validate_wallet_name(name)?;
            record.name = name.to_string();
        }

        let path = self.wallet_path(&record.name)?;
        if path.exists() {
            if !overwrite {
                return Err(WalletError::AlreadyExists(format!("wallet '{}'", record.name)));
            }
            self.paths.create_backup(&record.name)?;
        }
        self.save(&record, password)?;

        info!(name = %record.name, "Wallet imported");
        Ok(record)
    }
}

/// Decrypts and checks a wallet file at any path.
fn open_file(path: &Path, password: &str) -> Result<WalletRecord> {
    let blob = EncryptedBlob::read(path)?;
    let plaintext = blob.open(password)?;
    let record: WalletRecord = serde_json::from_slice(&plaintext).map_err(|e| {
        warn!(error = %e, "Decrypted payload is not a wallet record");
        WalletError::DecryptionFailed
    })?;
    check_integrity(&record)?;
    Ok(record)
}

/// Re-derives addresses and probes the primary keypair.
fn check_integrity(record: &WalletRecord) -> Result<()> {
    validate_wallet_name(&record.name).map_err(|_| WalletError::DecryptionFailed)?;

    let (quantum, ledger) = qwallet_crypto::addresses_of(&record.primary_keypair);
    if quantum != record.quantum_address || ledger != record.ledger_address {
        warn!(name = %record.name, "Stored addresses do not match the primary key");
        return Err(WalletError::DecryptionFailed);
    }
    if !qwallet_crypto::verify_keypair(&record.primary_keypair) {
        warn!(name = %record.name, "Primary keypair failed its probe signature");
        return Err(WalletError::DecryptionFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwallet_core::types::{
        Address, Amount, ConfirmationStatus, Direction, HashVariant, LedgerAddress, Scheme,
        TransactionEntry,
    };
    use tempfile::TempDir;
    use test_case::test_case;

    fn store(dir: &TempDir) -> WalletStore {
        WalletStore::new(dir.path(), MIN_KDF_ROUNDS).unwrap()
    }

    fn new_wallet(name: &str, scheme: Scheme, level: u8) -> NewWallet {
        NewWallet {
            name: name.to_string(),
            network: Network::Devnet,
            primary: qwallet_crypto::generate(scheme, level, HashVariant::Sha3_256).unwrap(),
            backup: None,
            policy: AdapterPolicy::OutOfBand,
        }
    }

    fn entry(lamports: u64) -> TransactionEntry {
        TransactionEntry::pending(
            Direction::Send,
            Address::from(LedgerAddress::from_array([9u8; 32])),
            Amount::from_lamports(lamports),
            Some(format!("sig-{lamports}")),
        )
    }

    #[test]
    fn test_alice_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let created = store
            .create(new_wallet("alice", Scheme::Dilithium, 3), "pw1", false)
            .unwrap();
        assert_eq!(created.network, Network::Devnet);

        let loaded = store.load("alice", "pw1").unwrap();
        assert_eq!(loaded.primary_keypair.public_key, created.primary_keypair.public_key);
        assert_eq!(loaded, created);

        assert!(matches!(
            store.load("alice", "pw2"),
            Err(WalletError::DecryptionFailed)
        ));
    }

    #[test_case(Scheme::Lamport, 1)]
    #[test_case(Scheme::Sphincs, 1)]
    #[test_case(Scheme::Dilithium, 2)]
    fn test_save_load_preserves_key_bytes(scheme: Scheme, level: u8) {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut record = store.create(new_wallet("w", scheme, level), "pw", false).unwrap();
        record.history.push(entry(1));
        store.save(&record, "pw").unwrap();

        let loaded = store.load("w", "pw").unwrap();
        assert_eq!(
            loaded.primary_keypair.secret_key.as_bytes(),
            record.primary_keypair.secret_key.as_bytes()
        );
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_file_holds_no_plaintext_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let record = store
            .create(new_wallet("carol", Scheme::Dilithium, 2), "pw", false)
            .unwrap();

        let raw = std::fs::read_to_string(store.wallet_path("carol").unwrap()).unwrap();
        assert!(!raw.contains(&record.primary_keypair.public_key.to_base64()));
        assert!(!raw.contains("primary_keypair"));
        assert!(raw.contains("pbkdf2-hmac-sha256"));
    }

    #[test]
    fn test_create_refuses_existing_unless_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create(new_wallet("dup", Scheme::Dilithium, 2), "pw", false).unwrap();

        let err = store
            .create(new_wallet("dup", Scheme::Dilithium, 2), "pw", false)
            .unwrap_err();
        assert!(matches!(err, WalletError::AlreadyExists(_)));

        store.create(new_wallet("dup", Scheme::Dilithium, 2), "pw", true).unwrap();
        assert_eq!(store.backups("dup").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_and_invalid_names() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(matches!(store.load("nobody", "pw"), Err(WalletError::NotFound(_))));
        assert!(matches!(
            store.load("../etc", "pw"),
            Err(WalletError::InvalidParameters(_))
        ));
        assert!(!store.exists("nobody"));
    }

    #[test]
    fn test_tampered_file_is_decryption_failure() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create(new_wallet("t", Scheme::Dilithium, 2), "pw", false).unwrap();

        let path = store.wallet_path("t").unwrap();
        let mut blob = EncryptedBlob::read(&path).unwrap();
        let last = blob.ciphertext.len() - 1;
        blob.ciphertext[last] ^= 0x01;
        std::fs::write(&path, blob.to_json().unwrap()).unwrap();
        assert!(matches!(store.load("t", "pw"), Err(WalletError::DecryptionFailed)));

        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(store.load("t", "pw"), Err(WalletError::DecryptionFailed)));
    }

    #[test]
    fn test_list_scans_without_decrypting() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create(new_wallet("b", Scheme::Dilithium, 2), "pw-b", false).unwrap();
        store.create(new_wallet("a", Scheme::Dilithium, 2), "pw-a", false).unwrap();
        assert_eq!(store.list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_bob_backup_restore() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut bob = store
            .create(new_wallet("bob", Scheme::Dilithium, 2), "pw", false)
            .unwrap();

        for i in 0..3 {
            bob.history.push(entry(i));
        }
        store.save(&bob, "pw").unwrap();
        let t0 = store.backup("bob").unwrap();
        assert_eq!(t0.len(), 1);

        for i in 3..5 {
            bob.history.push(entry(i));
        }
        store.save(&bob, "pw").unwrap();

        let restored = store.restore("bob", 0).unwrap();
        assert_eq!(restored, t0[0]);
        assert_eq!(store.load("bob", "pw").unwrap().history.len(), 3);

        let backups = store.backups("bob").unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(store.load_backup(&backups[0], "pw").unwrap().history.len(), 5);
        assert_eq!(store.load_backup(&backups[1], "pw").unwrap().history.len(), 3);

        // Restoring the pre-restore snapshot undoes the restore
        store.restore("bob", 0).unwrap();
        assert_eq!(store.load("bob", "pw").unwrap().history.len(), 5);
    }

    #[test]
    fn test_restore_out_of_range() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.create(new_wallet("r", Scheme::Dilithium, 2), "pw", false).unwrap();
        assert!(matches!(store.restore("r", 0), Err(WalletError::NotFound(_))));
    }

    #[test]
    fn test_export_public_profile_has_no_secrets() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let record = store
            .create(new_wallet("pub", Scheme::Dilithium, 2), "pw", false)
            .unwrap();

        let dest = dir.path().join("out").join("pub_export.json");
        store.export("pub", "pw", &dest, false).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&dest).unwrap()).unwrap();
        assert_eq!(json["name"], "pub");
        assert_eq!(json["quantum_address"], record.quantum_address.to_string());
        assert!(json.get("primary_keypair").is_none());
        assert!(!json.to_string().contains("secret_key"));

        assert!(matches!(
            store.export("pub", "wrong", &dest, false),
            Err(WalletError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_export_import_with_secrets() {
        let src_dir = TempDir::new().unwrap();
        let dst_dir = TempDir::new().unwrap();
        let source = store(&src_dir);
        let target = store(&dst_dir);

        let mut record = source
            .create(new_wallet("eve", Scheme::Lamport, 1), "pw", false)
            .unwrap();
        record.history.push(entry(7));
        source.save(&record, "pw").unwrap();

        let file = src_dir.path().join("eve.backup.qwallet");
        source.export("eve", "pw", &file, true).unwrap();

        assert!(matches!(
            target.import(&file, "nope", None, false),
            Err(WalletError::DecryptionFailed)
        ));

        let imported = target.import(&file, "pw", Some("eve2"), false).unwrap();
        assert_eq!(imported.name, "eve2");
        let loaded = target.load("eve2", "pw").unwrap();
        assert_eq!(loaded.history, record.history);
        assert_eq!(loaded.primary_keypair, record.primary_keypair);
        assert_eq!(loaded.history[0].status(), ConfirmationStatus::Pending);

        assert!(matches!(
            target.import(&file, "pw", Some("eve2"), false),
            Err(WalletError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_low_rounds_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            WalletStore::new(dir.path(), 10),
            Err(WalletError::InvalidParameters(_))
        ));
    }
}
