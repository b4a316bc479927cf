//! # qwallet Core
//!
//! Core types, errors, configuration and traits for the qwallet post-quantum
//! keyring and wallet.
//!
//! This crate provides the foundational building blocks used by all other qwallet crates:
//!
//! - **Types**: Domain models for schemes, keypairs, addresses, wallet records and history
//! - **Errors**: A single error enum mapped onto a small set of reportable kinds
//! - **Constants**: Protocol constants, domain separators and defaults
//! - **Context**: [`WalletContext`], the explicit configuration threaded into every component
//! - **Traits**: The ledger RPC and signature adapter seams
//! - **Atomic writes**: temp-file-and-rename replacement shared by every on-disk file
//!
//! ## Example
//!
//! ```rust
//! use qwallet_core::{Network, Scheme};
//!
//! let scheme: Scheme = "dilithium".parse().unwrap();
//! assert_eq!(scheme, Scheme::Dilithium);
//! assert!(Network::Devnet.allows_airdrop());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod atomic;
pub mod constants;
pub mod context;
pub mod encoding;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use atomic::write_atomic;
pub use constants::*;
pub use context::{default_storage_root, Commitment, Settings, WalletContext};
pub use error::{ErrorKind, Result, WalletError};
pub use traits::*;
pub use types::*;
