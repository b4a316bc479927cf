//! # qwallet Cryptography
//!
//! Post-quantum signature primitives for the qwallet keyring.
//!
//! This crate provides:
//!
//! - **Registry**: scheme/level validation and key and signature sizes
//! - **Keyring**: generation, signing and verification for SPHINCS+, Dilithium and Lamport
//! - **Address**: quantum-native and ledger-native address derivation
//! - **Hash**: domain-separated SHAKE256 and the four selectable hash variants
//!
//! ## Security Properties
//!
//! - Secret keys are zeroized on drop
//! - Domain separators keep address, transaction and Lamport digests apart
//! - Lamport verification compares preimages in constant time
//!
//! ## Example
//!
//! ```rust
//! use qwallet_core::{HashVariant, Scheme};
//! use qwallet_crypto::{derive_quantum_address, generate, sign, verify};
//!
//! let keypair = generate(Scheme::Dilithium, 2, HashVariant::Sha3_256).unwrap();
//! let signature = sign(&keypair.secret_key, keypair.scheme, b"payload").unwrap();
//! assert!(verify(&keypair.public_key, keypair.scheme, b"payload", &signature));
//!
//! let address = derive_quantum_address(&keypair.public_key, keypair.scheme);
//! assert!(address.to_string().starts_with("qw1"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod address;
pub mod hash;
pub mod keyring;
pub mod lamport;
pub mod registry;

// Re-export main functions at crate root
pub use address::{
    addresses_of, derive_ledger_address, derive_quantum_address, ledger_account,
    project_to_ledger, AddressValidation,
};
pub use hash::{digest, sha256_multi, shake256, shake256_multi};
pub use keyring::{backup_scheme_for, generate, generate_backup, sign, verify, verify_keypair};
pub use registry::{describe, describe_name, list_hash_variants, list_schemes, LevelParams, SchemeInfo};
