//! Timing runs over keyring operations and hash variants.
//!
//! Pure measurement: no wallet files, no network.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use qwallet_core::error::{Result, WalletError};
use qwallet_core::types::{HashVariant, Scheme};
use qwallet_crypto::registry;

use crate::stats::OpStats;

/// Size of the message signed and verified in each run.
pub const MESSAGE_SIZE: usize = 256;

/// Size of the input hashed by [`run_hashing`].
pub const HASH_INPUT_SIZE: usize = 1024;

const DOMAIN_BENCH: &[u8] = b"qwallet/bench/v1";

/// Keyring operations measured per scheme.
pub const OPERATIONS: [&str; 3] = ["generate", "sign", "verify"];

/// Timings for one (scheme, level) pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemeReport {
    /// Scheme
    pub scheme: Scheme,
    /// Security level
    pub security_level: u8,
    /// Parameter set name
    pub parameter_set: String,
    /// Iterations per operation
    pub iterations: usize,
    /// Per-operation statistics, keyed by operation name
    pub operations: BTreeMap<String, OpStats>,
}

/// A saved set of runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResults {
    /// When the runs finished
    pub created_at: DateTime<Utc>,
    /// Iterations per operation
    pub iterations: usize,
    /// Scheme runs
    pub schemes: Vec<SchemeReport>,
    /// Hash variant timings, keyed by variant name
    #[serde(default)]
    pub hashing: BTreeMap<String, OpStats>,
}

impl BenchmarkResults {
    /// Collects runs stamped with the current time.
    pub fn new(
        iterations: usize,
        schemes: Vec<SchemeReport>,
        hashing: BTreeMap<String, OpStats>,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            iterations,
            schemes,
            hashing,
        }
    }
}

fn check_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(WalletError::invalid("iterations must be at least 1"));
    }
    Ok(())
}

fn time_ms<T>(f: impl FnOnce() -> Result<T>) -> Result<(T, f64)> {
    let start = Instant::now();
    let out = f()?;
    Ok((out, start.elapsed().as_secs_f64() * 1_000.0))
}

fn summarize(samples: &[f64], memory: usize) -> Result<OpStats> {
    OpStats::from_samples(samples, memory)
        .ok_or_else(|| WalletError::invalid("no samples collected"))
}

/// Times generate, sign and verify for one scheme and level.
///
/// Each iteration generates a fresh keypair and signs a fresh random
/// message, so one-time Lamport keys are never reused.
///
/// # Errors
/// `InvalidParameters` for zero iterations or an unsupported level.
#[instrument]
pub fn run(scheme: Scheme, security_level: u8, iterations: usize) -> Result<SchemeReport> {
    check_iterations(iterations)?;
    let params = registry::validate(scheme, security_level)?;

    let mut generate = Vec::with_capacity(iterations);
    let mut sign = Vec::with_capacity(iterations);
    let mut verify = Vec::with_capacity(iterations);
    let mut message = vec![0u8; MESSAGE_SIZE];

    for i in 0..iterations {
        OsRng.fill_bytes(&mut message);

        let (keypair, ms) = time_ms(|| {
            qwallet_crypto::generate(scheme, security_level, HashVariant::default())
        })?;
        generate.push(ms);

        let (signature, ms) =
            time_ms(|| qwallet_crypto::sign(&keypair.secret_key, scheme, &message))?;
        sign.push(ms);

        let (valid, ms) = time_ms(|| {
            Ok(qwallet_crypto::verify(&keypair.public_key, scheme, &message, &signature))
        })?;
        verify.push(ms);

        if !valid {
            return Err(WalletError::primitive(format!(
                "{scheme} level {security_level} produced an unverifiable signature"
            )));
        }
        debug!(iteration = i, "Benchmark iteration complete");
    }

    let mut operations = BTreeMap::new();
    operations.insert(
        "generate".to_string(),
        summarize(&generate, params.public_key_size + params.secret_key_size)?,
    );
    operations.insert(
        "sign".to_string(),
        summarize(&sign, params.secret_key_size + params.signature_size + MESSAGE_SIZE)?,
    );
    operations.insert(
        "verify".to_string(),
        summarize(&verify, params.public_key_size + params.signature_size + MESSAGE_SIZE)?,
    );

    info!(
        %scheme,
        security_level,
        sign_mean_ms = operations["sign"].mean_ms,
        "Benchmark finished"
    );

    Ok(SchemeReport {
        scheme,
        security_level,
        parameter_set: params.parameter_set.to_string(),
        iterations,
        operations,
    })
}

/// Times every hash variant over a 1 KiB input.
pub fn run_hashing(iterations: usize) -> Result<BTreeMap<String, OpStats>> {
    check_iterations(iterations)?;
    let mut input = vec![0u8; HASH_INPUT_SIZE];
    OsRng.fill_bytes(&mut input);

    let mut results = BTreeMap::new();
    for variant in registry::list_hash_variants() {
        let mut samples = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            let ((), ms) = time_ms(|| {
                std::hint::black_box(qwallet_crypto::digest(variant, DOMAIN_BENCH, &input));
                Ok(())
            })?;
            samples.push(ms);
        }
        results.insert(
            variant.to_string(),
            summarize(&samples, HASH_INPUT_SIZE + qwallet_core::constants::HASH_OUTPUT_SIZE)?,
        );
    }
    Ok(results)
}

/// Runs every scheme at its default level, plus the hash variants.
pub fn run_all(iterations: usize) -> Result<BenchmarkResults> {
    let schemes = registry::list_schemes()
        .into_iter()
        .map(|scheme| run(scheme, registry::describe(scheme).default_level, iterations))
        .collect::<Result<Vec<_>>>()?;
    let hashing = run_hashing(iterations)?;
    Ok(BenchmarkResults::new(iterations, schemes, hashing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_reports_every_operation() {
        let report = run(Scheme::Dilithium, 2, 3).unwrap();
        assert_eq!(report.parameter_set, "Dilithium2");
        assert_eq!(report.iterations, 3);
        for op in OPERATIONS {
            let stats = &report.operations[op];
            assert_eq!(stats.samples, 3);
            assert!(stats.min_ms <= stats.p50_ms && stats.p50_ms <= stats.max_ms);
            assert!(stats.memory_estimate_bytes > 0);
        }
        assert_eq!(
            report.operations["generate"].memory_estimate_bytes,
            1312 + registry::validate(Scheme::Dilithium, 2).unwrap().secret_key_size
        );
    }

    #[test]
    fn test_run_lamport_uses_fresh_keys() {
        let report = run(Scheme::Lamport, 1, 2).unwrap();
        assert_eq!(report.operations["sign"].samples, 2);
    }

    #[test]
    fn test_run_rejects_bad_input() {
        assert!(matches!(
            run(Scheme::Dilithium, 2, 0),
            Err(WalletError::InvalidParameters(_))
        ));
        assert!(matches!(
            run(Scheme::Sphincs, 2, 1),
            Err(WalletError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_run_hashing_covers_variants() {
        let hashing = run_hashing(2).unwrap();
        assert_eq!(hashing.len(), HashVariant::ALL.len());
        for variant in HashVariant::ALL {
            assert_eq!(hashing[&variant.to_string()].samples, 2);
        }
    }
}
