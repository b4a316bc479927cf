//! Saving result sets and rendering them as text.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::info;

use qwallet_core::atomic::write_atomic;
use qwallet_core::error::{Result, WalletError};

use crate::harness::{BenchmarkResults, OPERATIONS};
use crate::stats::OpStats;

/// Writes a result set as pretty JSON, creating parent directories.
pub fn save(results: &BenchmarkResults, path: &Path) -> Result<()> {
    write_atomic(path, &serde_json::to_vec_pretty(results)?)?;
    info!(path = %path.display(), schemes = results.schemes.len(), "Benchmark results saved");
    Ok(())
}

/// Reads a saved result set.
///
/// # Errors
/// `NotFound` if the file does not exist; `Json` if it is not a result set.
pub fn load(path: &Path) -> Result<BenchmarkResults> {
    if !path.exists() {
        return Err(WalletError::NotFound(format!(
            "no benchmark results at {}",
            path.display()
        )));
    }
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

/// Reads a saved result set and renders it.
pub fn summarize(path: &Path) -> Result<String> {
    Ok(render(&load(path)?))
}

/// Renders a result set as aligned text tables.
pub fn render(results: &BenchmarkResults) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Benchmark results ({} iterations, {})",
        results.iterations,
        results.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if !results.schemes.is_empty() {
        out.push('\n');
        header(&mut out, "Scheme");
        for report in &results.schemes {
            let label = format!("{} ({})", report.scheme, report.parameter_set);
            for op in OPERATIONS {
                if let Some(stats) = report.operations.get(op) {
                    row(&mut out, &label, op, stats);
                }
            }
        }
    }

    if !results.hashing.is_empty() {
        out.push('\n');
        header(&mut out, "Hash");
        for (variant, stats) in &results.hashing {
            row(&mut out, variant, "digest", stats);
        }
    }
    out
}

fn header(out: &mut String, first: &str) {
    let _ = writeln!(
        out,
        "{:<36} {:<9} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12}",
        first, "Op", "mean ms", "p50 ms", "p95 ms", "min ms", "max ms", "mem bytes"
    );
    let _ = writeln!(out, "{}", "-".repeat(114));
}

fn row(out: &mut String, label: &str, op: &str, s: &OpStats) {
    let _ = writeln!(
        out,
        "{:<36} {:<9} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>12}",
        label, op, s.mean_ms, s.p50_ms, s.p95_ms, s.min_ms, s.max_ms, s.memory_estimate_bytes
    );
}
