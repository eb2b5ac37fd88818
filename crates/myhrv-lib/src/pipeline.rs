//! Whole-recording analysis: validate, clean artifacts, compute the aggregate metrics, then
//! the windowed trend.

use crate::{
    artifact::clean_rr_artifacts,
    config::AnalysisConfig,
    error::PipelineError,
    metrics::{MetricsProvider, MetricsRecord},
    signal::{EcgRelay, EcgTrace, Events, RRSeries},
    windows::{analyze_windows, DynamicResult},
};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    pub input_samples: usize,
    pub corrected_samples: usize,
    pub corrected_indices: Vec<usize>,
    pub duration_s: f64,
    pub windows_evaluated: usize,
    pub windows_sparse: usize,
    pub windows_failed: usize,
    /// The recording is shorter than one window, so the trend is empty by construction.
    pub too_short_for_windows: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metrics: MetricsRecord,
    pub cleaned_rr: Vec<f64>,
    pub dynamic: DynamicResult,
    pub diagnostics: AnalysisDiagnostics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecg: Option<EcgRelay>,
}

/// Analyse one recording. Window failures are absorbed into the trend diagnostics; input,
/// configuration and whole-recording metric failures are returned as errors.
pub fn analyze_recording<P: MetricsProvider>(
    raw: &RRSeries,
    cfg: &AnalysisConfig,
    provider: &P,
) -> Result<AnalysisReport, PipelineError> {
    cfg.validate()?;
    raw.validate()?;

    let cleaned = clean_rr_artifacts(raw, &cfg.artifact);
    let rr = &cleaned.rr;

    let peaks = Events::from_rr(rr, cfg.sampling_rate_hz);
    let metrics = provider
        .compute_metrics(&peaks, cfg.sampling_rate_hz)
        .map_err(PipelineError::AggregateComputation)?;

    let dynamic = analyze_windows(rr, &cfg.windows, provider, cfg.sampling_rate_hz);
    let duration_s = rr.duration_s();
    let diagnostics = AnalysisDiagnostics {
        input_samples: raw.len(),
        corrected_samples: cleaned.corrected_count(),
        corrected_indices: cleaned.corrected.clone(),
        duration_s,
        windows_evaluated: dynamic.windows_evaluated,
        windows_sparse: dynamic.sparse_count(),
        windows_failed: dynamic.failed_count(),
        too_short_for_windows: duration_s < cfg.windows.window_sec,
    };
    info!(
        "analysed {:.1}s recording: {} trend points, {} corrections",
        duration_s,
        dynamic.len(),
        diagnostics.corrected_samples
    );

    Ok(AnalysisReport {
        metrics,
        cleaned_rr: cleaned.into_inner().rr,
        dynamic,
        diagnostics,
        ecg: None,
    })
}

impl AnalysisReport {
    /// Attach a raw ECG trace for display, with an overview decimated by `stride`.
    pub fn with_ecg(mut self, trace: EcgTrace, stride: usize) -> Self {
        self.ecg = Some(EcgRelay::new(trace, stride));
        self
    }
}
