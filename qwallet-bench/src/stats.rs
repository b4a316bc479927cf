//! Summary statistics over timing samples.

use serde::{Deserialize, Serialize};

/// Timing summary for one operation, in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpStats {
    /// Number of samples
    pub samples: usize,
    /// Arithmetic mean
    pub mean_ms: f64,
    /// Median
    pub p50_ms: f64,
    /// 95th percentile
    pub p95_ms: f64,
    /// Fastest sample
    pub min_ms: f64,
    /// Slowest sample
    pub max_ms: f64,
    /// Sample standard deviation; 0 for a single sample
    pub stddev_ms: f64,
    /// Bytes of key, signature and message material touched per call
    pub memory_estimate_bytes: usize,
}

impl OpStats {
    /// Summarises samples. Returns `None` for an empty set.
    pub fn from_samples(samples: &[f64], memory_estimate_bytes: usize) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let stddev = if sorted.len() > 1 {
            (sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            samples: sorted.len(),
            mean_ms: mean,
            p50_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            stddev_ms: stddev,
            memory_estimate_bytes,
        })
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
