//! # qwallet Store
//!
//! Password-encrypted persistence for wallet records.
//!
//! - **Vault**: PBKDF2-HMAC-SHA256 key derivation and AES-256-GCM sealing
//! - **Paths**: storage root layout, atomic writes, timestamped snapshots
//! - **Store**: create, save, load, list, backup, restore, export, import
//!
//! ## Example
//!
//! ```rust,ignore
//! use qwallet_store::{NewWallet, WalletStore};
//!
//! let store = WalletStore::from_context(&ctx)?;
//! let record = store.create(new_wallet, "password", false)?;
//! let again = store.load(&record.name, "password")?;
//! assert_eq!(record, again);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod paths;
pub mod store;
pub mod vault;

pub use paths::{write_atomic, BackupInfo, StorePaths};
pub use store::{NewWallet, WalletStore};
pub use vault::EncryptedBlob;
