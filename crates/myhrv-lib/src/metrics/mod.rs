pub mod hrv;

use crate::signal::Events;
use serde::{Deserialize, Serialize};

pub use hrv::StandardMetrics;

/// HRV summary of one segment of a recording. Interval quantities are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub n: usize,
    pub mean_nn: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
    pub vlf: f64,
    pub lf: f64,
    pub hf: f64,
    /// `None` when the segment has no high-frequency power.
    pub lf_hf: Option<f64>,
    pub total_power: f64,
    pub sd1: f64,
    pub sd2: f64,
    pub samp_entropy: f64,
    pub dfa_alpha1: f64,
}

impl MetricsRecord {
    pub fn heart_rate_bpm(&self) -> f64 {
        60000.0 / self.mean_nn
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("need at least {needed} beats, got {got}")]
    InsufficientBeats { needed: usize, got: usize },
    #[error("segment spans {got_s:.1} s, spectral estimate needs {needed_s:.1} s")]
    InsufficientDuration { needed_s: f64, got_s: f64 },
}

/// Computes HRV metrics from beat positions sampled at `sampling_rate_hz`.
///
/// The analysis pipeline only builds the peak representation and reads fields back out of
/// the returned record, so any implementation (or a test double) can stand in here.
pub trait MetricsProvider {
    fn compute_metrics(
        &self,
        peaks: &Events,
        sampling_rate_hz: f64,
    ) -> Result<MetricsRecord, MetricsError>;
}

impl<P: MetricsProvider + ?Sized> MetricsProvider for &P {
    fn compute_metrics(
        &self,
        peaks: &Events,
        sampling_rate_hz: f64,
    ) -> Result<MetricsRecord, MetricsError> {
        (**self).compute_metrics(peaks, sampling_rate_hz)
    }
}
