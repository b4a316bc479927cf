//! # qwallet Bench
//!
//! Wall-clock timing of keyring operations, for comparing schemes and
//! levels on the machine at hand. Criterion micro-benchmarks live in
//! `qwallet-crypto/benches`; this crate produces the saved result sets the
//! CLI's `benchmark` command reads and writes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use qwallet_bench::{run, render, BenchmarkResults};
//! use qwallet_core::types::Scheme;
//!
//! let report = run(Scheme::Dilithium, 3, 10)?;
//! let results = BenchmarkResults::new(10, vec![report], Default::default());
//! println!("{}", render(&results));
//! # Ok::<(), qwallet_core::error::WalletError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod harness;
pub mod report;
pub mod stats;

pub use harness::{run, run_all, run_hashing, BenchmarkResults, SchemeReport, OPERATIONS};
pub use report::{load, render, save, summarize};
pub use stats::OpStats;
