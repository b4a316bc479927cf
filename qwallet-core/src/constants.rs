//! Protocol constants for qwallet.
//!
//! All sizes are in bytes unless otherwise noted.

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Domain separator for quantum-native address digests.
pub const DOMAIN_QUANTUM_ADDRESS: &[u8] = b"qwallet/address/v1";

/// Domain separator for the ledger-native address projection.
pub const DOMAIN_LEDGER_ADDRESS: &[u8] = b"qwallet/ledger/v1";

/// Domain separator for transaction pre-hashing before a post-quantum signature.
pub const DOMAIN_TRANSACTION: &[u8] = b"qwallet/tx/v1";

/// Domain separator for the on-chain commitment to an out-of-band signature.
pub const DOMAIN_SIGNATURE_COMMITMENT: &[u8] = b"qwallet/commitment/v1";

/// Domain separator for Lamport message digests.
pub const DOMAIN_LAMPORT: &[u8] = b"qwallet/lamport/v1";

/// Probe message signed when checking that a keypair is internally consistent.
pub const KEYPAIR_PROBE_MESSAGE: &[u8] = b"qwallet/keypair-probe/v1";

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESSES
// ═══════════════════════════════════════════════════════════════════════════════

/// Human-readable part of bech32m quantum-native addresses.
pub const QUANTUM_ADDRESS_HRP: &str = "qw";

/// Size of the digest carried by a quantum-native address.
pub const QUANTUM_DIGEST_SIZE: usize = 32;

/// Size of a ledger-native address (an ed25519-sized public key slot).
pub const LEDGER_ADDRESS_SIZE: usize = 32;

/// Size of a ledger-native signature slot.
pub const LEDGER_SIGNATURE_SIZE: usize = 64;

/// Size of a ledger blockhash.
pub const BLOCKHASH_SIZE: usize = 32;

/// Output size of every hash variant.
pub const HASH_OUTPUT_SIZE: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER UNITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Decimal places of the ledger's native unit.
pub const SOL_DECIMALS: u32 = 9;

/// Maximum serialized transaction size accepted by the ledger.
pub const MAX_TRANSACTION_SIZE: usize = 1232;

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Current on-disk format version of an encrypted wallet file.
pub const STORE_FORMAT_VERSION: u8 = 1;

/// Current serialized wallet record version.
pub const RECORD_VERSION: u8 = 1;

/// Extension of wallet files in the storage root.
pub const WALLET_FILE_EXTENSION: &str = "qwallet";

/// Subdirectory of the storage root holding wallet snapshots.
pub const BACKUP_DIR_NAME: &str = "backups";

/// File name of the persisted user settings.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Name of the key-derivation function recorded in every blob.
pub const KDF_NAME: &str = "pbkdf2-hmac-sha256";

/// Minimum accepted KDF round count.
pub const MIN_KDF_ROUNDS: u32 = 100_000;

/// Default KDF round count.
pub const DEFAULT_KDF_ROUNDS: u32 = 210_000;

/// KDF salt size.
pub const SALT_SIZE: usize = 16;

/// AES-GCM nonce size.
pub const NONCE_SIZE: usize = 12;

/// AES-256 key size.
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// Maximum wallet name length.
pub const MAX_WALLET_NAME_LEN: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default bounded retry count for transient network failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Default confirmation polling timeout in seconds.
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 60;

/// Default interval between confirmation polls in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default security level for every scheme.
pub const DEFAULT_SECURITY_LEVEL: u8 = 3;
