//! Median-filter artifact correction for RR interval series.
//!
//! Each interior sample is compared against the median of its neighbours (the sample itself
//! is left out of its own comparison window). Samples that deviate from that median by more
//! than `threshold` (a fraction of the median) are replaced with it. The first and last
//! `half_window` samples have no full neighbourhood and always pass through untouched.

use crate::{error::PipelineError, signal::RRSeries};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactCleanerConfig {
    /// Neighbours considered on each side of the tested sample.
    pub half_window: usize,
    /// Allowed relative deviation from the local median.
    pub threshold: f64,
}

impl Default for ArtifactCleanerConfig {
    fn default() -> Self {
        Self {
            half_window: 5,
            threshold: 0.20,
        }
    }
}

impl ArtifactCleanerConfig {
    /// A negative threshold would flag every interior sample.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "artifact.threshold must be a non-negative fraction, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Output of [`clean_rr_artifacts`]: same length as the input, with the replaced indices listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedRRSeries {
    pub rr: RRSeries,
    pub corrected: Vec<usize>,
}

impl CleanedRRSeries {
    pub fn corrected_count(&self) -> usize {
        self.corrected.len()
    }

    pub fn into_inner(self) -> RRSeries {
        self.rr
    }
}

/// Single pass: every comparison window is read from the original series, never from
/// already-corrected values.
pub fn clean_rr_artifacts(series: &RRSeries, cfg: &ArtifactCleanerConfig) -> CleanedRRSeries {
    let raw = &series.rr;
    let hw = cfg.half_window;
    let mut cleaned = raw.clone();
    let mut corrected = Vec::new();

    if raw.len() > 2 * hw {
        let mut window = Vec::with_capacity(2 * hw);
        for i in hw..raw.len() - hw {
            window.clear();
            window.extend_from_slice(&raw[i - hw..i]);
            window.extend_from_slice(&raw[i + 1..=i + hw]);
            let Some(median_val) = median(&mut window) else {
                continue;
            };
            if (raw[i] - median_val).abs() > median_val * cfg.threshold {
                cleaned[i] = median_val;
                corrected.push(i);
            }
        }
    }

    info!(
        "artifact correction complete: {} of {} samples corrected",
        corrected.len(),
        raw.len()
    );
    CleanedRRSeries {
        rr: RRSeries { rr: cleaned },
        corrected,
    }
}

/// Median of a scratch buffer (reordered in place). Even lengths average the two middle values.
pub(crate) fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
