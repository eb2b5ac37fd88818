//! Sliding-window HRV trend.
//!
//! Windows start at `0, step, 2*step, ...` seconds and cover `[start, start + window)`. A beat
//! belongs to a window when its cumulative timestamp falls in that half-open span, so a beat
//! exactly on a boundary goes to the later window. Windows with too few beats are skipped, and
//! a window whose metrics fail is recorded and skipped without stopping the rest.

use crate::{
    metrics::{MetricsError, MetricsProvider},
    signal::{Events, RRSeries},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub window_sec: f64,
    pub step_sec: f64,
    pub min_samples_per_window: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_sec: 300.0,
            step_sec: 60.0,
            min_samples_per_window: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_sec: f64,
    pub end_sec: f64,
    /// Indices into the RR series whose timestamps fall inside the window.
    pub indices: Range<usize>,
}

impl TimeWindow {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn midpoint_min(&self) -> f64 {
        (self.start_sec + self.end_sec) / 2.0 / 60.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowMetricSample {
    pub time_min: f64,
    pub rmssd: f64,
    pub lf_hf: Option<f64>,
    /// Heart rate (bpm) derived from the window's mean NN interval.
    pub hr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    TooSparse,
    ComputationFailed { cause: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDiagnostic {
    pub start_sec: f64,
    pub end_sec: f64,
    pub samples: usize,
    pub reason: SkipReason,
}

/// What happened to a single window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    Sample(WindowMetricSample),
    TooSparse { samples: usize },
    Failed(MetricsError),
}

/// Time-resolved trend of one recording. `time_min` and `samples` are parallel and ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicResult {
    pub time_min: Vec<f64>,
    pub samples: Vec<WindowMetricSample>,
    pub skipped: Vec<WindowDiagnostic>,
    pub windows_evaluated: usize,
}

impl DynamicResult {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sparse_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|d| d.reason == SkipReason::TooSparse)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.skipped.len() - self.sparse_count()
    }

    fn push(&mut self, sample: WindowMetricSample) {
        self.time_min.push(sample.time_min);
        self.samples.push(sample);
    }
}

/// Enumerate the windows of a series without computing anything on them.
pub fn enumerate_windows(rr: &RRSeries, cfg: &WindowConfig) -> Vec<TimeWindow> {
    if rr.is_empty() || cfg.window_sec <= 0.0 || cfg.step_sec <= 0.0 {
        return Vec::new();
    }
    let timestamps_s: Vec<f64> = rr.timestamps_ms().iter().map(|ts| ts / 1000.0).collect();
    let total_s = timestamps_s.last().copied().unwrap_or(0.0);
    let last_start = total_s - cfg.window_sec;

    let mut windows = Vec::new();
    let mut k = 0usize;
    loop {
        // Multiply rather than accumulate so long recordings do not drift.
        let start_sec = k as f64 * cfg.step_sec;
        if start_sec > last_start {
            break;
        }
        let end_sec = start_sec + cfg.window_sec;
        // Timestamps are strictly increasing, so the selection is contiguous.
        let first = timestamps_s.partition_point(|&ts| ts < start_sec);
        let last = timestamps_s.partition_point(|&ts| ts < end_sec);
        windows.push(TimeWindow {
            start_sec,
            end_sec,
            indices: first..last,
        });
        k += 1;
    }
    windows
}

/// Run the metrics provider on one window.
pub fn evaluate_window<P: MetricsProvider>(
    rr: &RRSeries,
    window: &TimeWindow,
    min_samples: usize,
    provider: &P,
    sampling_rate_hz: f64,
) -> WindowOutcome {
    if window.len() < min_samples {
        return WindowOutcome::TooSparse {
            samples: window.len(),
        };
    }
    let segment = rr.slice(window.indices.clone());
    let peaks = Events::from_rr(&segment, sampling_rate_hz);
    match provider.compute_metrics(&peaks, sampling_rate_hz) {
        Ok(record) => WindowOutcome::Sample(WindowMetricSample {
            time_min: window.midpoint_min(),
            rmssd: record.rmssd,
            lf_hf: record.lf_hf,
            hr: record.heart_rate_bpm(),
        }),
        Err(err) => WindowOutcome::Failed(err),
    }
}

pub fn analyze_windows<P: MetricsProvider>(
    cleaned: &RRSeries,
    cfg: &WindowConfig,
    provider: &P,
    sampling_rate_hz: f64,
) -> DynamicResult {
    let mut result = DynamicResult::default();
    for window in enumerate_windows(cleaned, cfg) {
        result.windows_evaluated += 1;
        let outcome = evaluate_window(
            cleaned,
            &window,
            cfg.min_samples_per_window,
            provider,
            sampling_rate_hz,
        );
        let reason = match outcome {
            WindowOutcome::Sample(sample) => {
                result.push(sample);
                continue;
            }
            WindowOutcome::TooSparse { samples } => {
                debug!(
                    "window {:.0}-{:.0}s skipped: {} samples (< {})",
                    window.start_sec, window.end_sec, samples, cfg.min_samples_per_window
                );
                SkipReason::TooSparse
            }
            WindowOutcome::Failed(err) => {
                warn!(
                    "window {:.0}-{:.0}s skipped: {}",
                    window.start_sec, window.end_sec, err
                );
                SkipReason::ComputationFailed {
                    cause: err.to_string(),
                }
            }
        };
        result.skipped.push(WindowDiagnostic {
            start_sec: window.start_sec,
            end_sec: window.end_sec,
            samples: window.len(),
            reason,
        });
    }
    info!(
        "windowed analysis: {} windows, {} computed, {} sparse, {} failed",
        result.windows_evaluated,
        result.len(),
        result.sparse_count(),
        result.failed_count()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRecord;
    use std::cell::RefCell;

    /// Reports the mean interval of whatever it is given; records every call.
    #[derive(Default)]
    struct MeanOnly {
        calls: RefCell<Vec<usize>>,
    }

    impl MetricsProvider for MeanOnly {
        fn compute_metrics(
            &self,
            peaks: &Events,
            fs: f64,
        ) -> Result<MetricsRecord, MetricsError> {
            let rr = RRSeries::from_events(peaks, fs);
            self.calls.borrow_mut().push(rr.len());
            let mean_nn = rr.rr.iter().sum::<f64>() / rr.len() as f64;
            Ok(record(mean_nn))
        }
    }

    /// Fails for any segment whose mean interval exceeds `limit_ms`.
    struct FailsAbove {
        limit_ms: f64,
    }

    impl MetricsProvider for FailsAbove {
        fn compute_metrics(
            &self,
            peaks: &Events,
            fs: f64,
        ) -> Result<MetricsRecord, MetricsError> {
            let rr = RRSeries::from_events(peaks, fs);
            let mean_nn = rr.rr.iter().sum::<f64>() / rr.len() as f64;
            if mean_nn > self.limit_ms {
                Err(MetricsError::InsufficientBeats {
                    needed: 1000,
                    got: peaks.len(),
                })
            } else {
                Ok(record(mean_nn))
            }
        }
    }

    fn record(mean_nn: f64) -> MetricsRecord {
        MetricsRecord {
            n: 0,
            mean_nn,
            sdnn: 0.0,
            rmssd: 42.0,
            pnn50: 0.0,
            vlf: 0.0,
            lf: 2.0,
            hf: 1.0,
            lf_hf: Some(2.0),
            total_power: 3.0,
            sd1: 0.0,
            sd2: 0.0,
            samp_entropy: 0.0,
            dfa_alpha1: 0.0,
        }
    }

    fn constant(n: usize, value: f64) -> RRSeries {
        RRSeries {
            rr: vec![value; n],
        }
    }

    #[test]
    fn exact_window_duration_yields_one_centered_window() {
        // 375 * 800 ms = 300 s exactly.
        let rr = constant(375, 800.0);
        let provider = MeanOnly::default();
        let result = analyze_windows(&rr, &WindowConfig::default(), &provider, 1000.0);
        assert_eq!(result.len(), 1);
        assert_eq!(result.time_min, vec![2.5]);
        assert_eq!(result.samples[0].time_min, 2.5);
        assert_eq!(result.samples[0].rmssd, 42.0);
        assert_eq!(result.samples[0].lf_hf, Some(2.0));
        assert!((result.samples[0].hr - 75.0).abs() < 1e-9);
        // The beat at exactly 300 s belongs to the next window.
        assert_eq!(*provider.calls.borrow(), vec![374]);
    }

    #[test]
    fn short_recording_yields_empty_result() {
        let rr = constant(200, 800.0);
        let result = analyze_windows(&rr, &WindowConfig::default(), &MeanOnly::default(), 1000.0);
        assert!(result.is_empty());
        assert!(result.time_min.is_empty());
        assert_eq!(result.windows_evaluated, 0);
    }

    #[test]
    fn empty_series_yields_empty_result() {
        let rr = RRSeries { rr: vec![] };
        assert!(enumerate_windows(&rr, &WindowConfig::default()).is_empty());
    }

    #[test]
    fn end_to_end_window_count_for_320_seconds() {
        let rr = constant(400, 800.0);
        let windows = enumerate_windows(&rr, &WindowConfig::default());
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_sec, 0.0);
        assert_eq!(windows[0].indices, 0..374);
    }

    #[test]
    fn boundary_beat_goes_to_later_window() {
        let cfg = WindowConfig {
            window_sec: 2.0,
            step_sec: 1.0,
            min_samples_per_window: 1,
        };
        // Timestamps: 0.5, 1.0, 1.5, ..., 4.0 s
        let rr = constant(8, 500.0);
        let windows = enumerate_windows(&rr, &cfg);
        let ranges: Vec<_> = windows.iter().map(|w| w.indices.clone()).collect();
        assert_eq!(ranges, vec![0..3, 1..5, 3..7]);
    }

    #[test]
    fn sparse_window_is_skipped_without_touching_neighbours() {
        // 0-120 s dense (150 beats of 800 ms), then 10 beats of 12 s (120 s), then dense again.
        let mut data = vec![800.0; 150];
        data.extend(vec![12_000.0; 10]);
        data.extend(vec![800.0; 150]);
        let rr = RRSeries { rr: data };
        let cfg = WindowConfig {
            window_sec: 60.0,
            step_sec: 60.0,
            min_samples_per_window: 30,
        };
        let provider = MeanOnly::default();
        let result = analyze_windows(&rr, &cfg, &provider, 1000.0);

        assert_eq!(result.time_min, vec![0.5, 1.5, 4.5, 5.5]);
        assert_eq!(result.sparse_count(), 2);
        assert_eq!(result.failed_count(), 0);
        assert_eq!(result.windows_evaluated, 6);
        assert!((result.samples[0].hr - 75.0).abs() < 1e-9);
        assert!((result.samples[1].hr - 75.0).abs() < 1e-9);
        // The window after the gap still carries the long interval that closes it.
        assert!(result.samples[2].hr < 75.0);
        assert!((result.samples[3].hr - 75.0).abs() < 1e-9);
        assert_eq!(*provider.calls.borrow(), vec![74, 75, 75, 75]);
    }

    #[test]
    fn min_samples_is_an_inclusive_lower_bound() {
        let cfg = WindowConfig {
            window_sec: 2.0,
            step_sec: 2.0,
            min_samples_per_window: 4,
        };
        // Timestamps 0.5 .. 4.0 s: [0, 2) holds 3 beats, [2, 4) holds 4.
        let rr = constant(8, 500.0);
        let provider = MeanOnly::default();
        let result = analyze_windows(&rr, &cfg, &provider, 1000.0);

        assert_eq!(result.windows_evaluated, 2);
        assert_eq!(result.time_min, vec![3.0 / 60.0]);
        assert_eq!(result.sparse_count(), 1);
        assert_eq!(result.skipped[0].samples, 3);
        assert_eq!(result.skipped[0].start_sec, 0.0);
        assert_eq!(*provider.calls.borrow(), vec![4]);
    }

    #[test]
    fn failing_window_is_recorded_and_analysis_continues() {
        // First two minutes at 800 ms, next two at 1000 ms.
        let mut data = vec![800.0; 150];
        data.extend(vec![1000.0; 120]);
        let rr = RRSeries { rr: data };
        let cfg = WindowConfig {
            window_sec: 60.0,
            step_sec: 60.0,
            min_samples_per_window: 10,
        };
        let result = analyze_windows(&rr, &cfg, &FailsAbove { limit_ms: 900.0 }, 1000.0);

        assert_eq!(result.time_min, vec![0.5, 1.5]);
        assert_eq!(result.failed_count(), 2);
        let failed = &result.skipped[0];
        assert_eq!(failed.start_sec, 120.0);
        assert!(matches!(
            failed.reason,
            SkipReason::ComputationFailed { ref cause } if cause.contains("need at least 1000 beats")
        ));
    }

    #[test]
    fn overlapping_windows_are_strictly_increasing() {
        let rr = constant(1200, 800.0); // 960 s
        let result = analyze_windows(&rr, &WindowConfig::default(), &MeanOnly::default(), 1000.0);
        assert_eq!(result.len(), 12);
        assert!(result.time_min.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(result.time_min[0], 2.5);
        assert_eq!(result.time_min[11], 13.5);
        assert_eq!(result.time_min.len(), result.samples.len());
    }

    #[test]
    fn evaluate_window_reports_sparse_outcome() {
        let rr = constant(10, 800.0);
        let window = TimeWindow {
            start_sec: 0.0,
            end_sec: 8.0,
            indices: 0..9,
        };
        let outcome = evaluate_window(&rr, &window, 60, &MeanOnly::default(), 1000.0);
        assert_eq!(outcome, WindowOutcome::TooSparse { samples: 9 });
    }
}
