//! Summary statistics: invocation latencies observed by the harness and numeric table columns.

use hdrhistogram::{CreationError, Histogram, RecordError};
use std::{fmt, time::Duration};

//=================
// Invocation latency

/// Records the wall-clock latency of each external invocation, in microseconds.
#[derive(Debug, Clone)]
pub struct LatencyRecorder {
    hist: Histogram<u64>,
}

impl LatencyRecorder {
    /// Recorder with a one-hour upper bound (auto-resized beyond that) and two significant figures.
    pub fn new() -> Result<Self, CreationError> {
        let mut hist = Histogram::<u64>::new_with_bounds(1, 60 * 60 * 1000 * 1000, 2)?;
        hist.auto(true);
        Ok(Self { hist })
    }

    pub fn record(&mut self, elapsed: Duration) -> Result<(), RecordError> {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX).max(1);
        self.hist.record(micros)
    }

    pub fn summary(&self) -> SummaryStats {
        SummaryStats::new(&self.hist)
    }
}

/// Common summary statistics of invocation latencies, in microseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub count: u64,
    pub mean: f64,
    pub stdev: f64,
    pub min: u64,
    pub p25: u64,
    pub median: u64,
    pub p75: u64,
    pub p90: u64,
    pub max: u64,
}

impl SummaryStats {
    /// Computes summary statistics from the given histogram.
    pub fn new(hist: &Histogram<u64>) -> Self {
        Self {
            count: hist.len(),
            mean: hist.mean(),
            stdev: hist.stdev(),
            min: hist.min(),
            p25: hist.value_at_quantile(0.25),
            median: hist.value_at_quantile(0.50),
            p75: hist.value_at_quantile(0.75),
            p90: hist.value_at_quantile(0.90),
            max: hist.max(),
        }
    }
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = |us: u64| us as f64 / 1000.0;
        write!(
            f,
            "count={}, mean={:.3}ms, stdev={:.3}ms, min={:.3}ms, median={:.3}ms, p90={:.3}ms, max={:.3}ms",
            self.count,
            self.mean / 1000.0,
            self.stdev / 1000.0,
            ms(self.min),
            ms(self.median),
            ms(self.p90),
            ms(self.max),
        )
    }
}

//=================
// Column statistics

/// Statistics of a numeric table column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `0` for fewer than two values.
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    /// Returns `None` for an empty slice.
    pub fn new(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let stdev = if values.len() < 2 {
            0.0
        } else {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };
        Some(Self {
            count: values.len(),
            mean,
            stdev,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

impl fmt::Display for ColumnStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "count={}, mean={:.6}, stdev={:.6}, min={:.6}, max={:.6}",
            self.count, self.mean, self.stdev, self.min, self.max
        )
    }
}
