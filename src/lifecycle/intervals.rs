// Threshold intervals - Runs of samples at or above an intensity threshold
// Each run becomes one synthesis layer for the matching intensity band

use serde::{Deserialize, Serialize};

use crate::tracks::{CycloneSeries, Field};

/// Runs shorter than this are dropped
pub const MIN_INTERVAL_LEN: usize = 2;

/// A maximal run of samples at or above a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdInterval {
    /// Index of the first sample in the run
    pub start: usize,

    /// Index of the last sample in the run
    pub end: usize,

    /// Index where the run releases: the first sample back below the
    /// threshold, or `end` when the run reaches the end of the series
    pub release: usize,

    /// Sample values inside the run
    pub values: Vec<f64>,
}

impl ThresholdInterval {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Scan one column of a series for runs at or above `threshold`
pub fn extract_threshold_intervals(
    series: &CycloneSeries,
    field: Field,
    threshold: f64,
) -> Vec<ThresholdInterval> {
    let values: Vec<f64> = series.values(field).collect();
    threshold_intervals(&values, threshold)
}

/// Runs of `values` at or above `threshold`, in order
///
/// A run opens at the first sample `>= threshold` and closes at the next sample
/// below it (or at the end of the data). Runs holding a single sample are
/// discarded. NaN never qualifies.
pub fn threshold_intervals(values: &[f64], threshold: f64) -> Vec<ThresholdInterval> {
    let qualifies = |v: f64| v >= threshold;
    let mut intervals = Vec::new();
    let mut i = 0;

    while i < values.len() {
        if !qualifies(values[i]) {
            i += 1;
            continue;
        }

        let start = i;
        while i < values.len() && qualifies(values[i]) {
            i += 1;
        }
        let end = i - 1;

        if i - start < MIN_INTERVAL_LEN {
            continue;
        }
        intervals.push(ThresholdInterval {
            start,
            end,
            release: if i < values.len() { i } else { end },
            values: values[start..i].to_vec(),
        });
    }

    intervals
}
