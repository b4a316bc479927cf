//! # qwallet Ledger
//!
//! Everything between a decrypted wallet and the remote ledger.
//!
//! - **Wire**: the ledger's message and transaction encoding
//! - **Adapters**: fitting post-quantum signatures into 64-byte slots
//! - **Signer**: build, sign, submit with bounded retry, confirm with timeout
//! - **History**: append-only transaction log and reconciliation
//! - **Service**: wallet-level airdrop, send, balance and reconcile
//! - **RPC**: JSON-RPC client, plus an in-memory ledger for tests and demos
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use qwallet_ledger::{JsonRpcClient, RpcConfig, WalletService};
//!
//! let rpc = JsonRpcClient::new(RpcConfig::for_network(&ctx, ctx.network))?;
//! let service = WalletService::from_context(&ctx, Arc::new(rpc))?;
//! let outcome = service.send("alice", "password", "qw1...", amount).await?;
//! println!("{} is {}", outcome.remote_signature, outcome.status);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod adapter;
pub mod history;
pub mod memory;
pub mod rpc;
pub mod service;
pub mod signer;
pub mod wire;

// Re-export main types at crate root
pub use adapter::{adapter_for, commitment, verify_attestation, OutOfBandAdapter, TruncatingAdapter};
pub use history::ReconcileReport;
pub use memory::MemoryLedger;
pub use rpc::{JsonRpcClient, RpcConfig};
pub use service::{TransferOutcome, WalletService};
pub use signer::{SignedTransaction, SubmitPolicy, Submitter, UnsignedTransaction};
pub use wire::{Message, Transaction};
