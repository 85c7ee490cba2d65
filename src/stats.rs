//! Response-time statistics.
//!
//! Percentiles use the nearest-rank method: the value at 1-based rank
//! `ceil(p / 100 * n)` of the sorted samples.

/// Nearest-rank percentile of samples that are already sorted ascending.
pub fn percentile_sorted(sorted: &[u64], p: f64) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p * sorted.len() as f64 / 100.0).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[index])
}

/// Nearest-rank percentile of unsorted samples.
pub fn percentile(samples: &[u64], p: f64) -> Option<u64> {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    percentile_sorted(&sorted, p)
}

/// Median (50th percentile, nearest rank).
pub fn median(samples: &[u64]) -> Option<u64> {
    percentile(samples, 50.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Percentiles {
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
}

impl Percentiles {
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        Some(Self {
            p50: percentile_sorted(&sorted, 50.0)?,
            p90: percentile_sorted(&sorted, 90.0)?,
            p95: percentile_sorted(&sorted, 95.0)?,
        })
    }
}
