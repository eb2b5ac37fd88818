//! Heart-rate-variability analysis of RR interval recordings: median-filter artifact
//! correction, whole-recording metrics and a sliding-window trend.

pub mod artifact;
pub mod config;
pub mod error;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod signal;
pub mod windows;

pub use artifact::{clean_rr_artifacts, ArtifactCleanerConfig, CleanedRRSeries};
pub use config::AnalysisConfig;
pub use error::PipelineError;
pub use metrics::{MetricsError, MetricsProvider, MetricsRecord, StandardMetrics};
pub use pipeline::{analyze_recording, AnalysisDiagnostics, AnalysisReport};
pub use signal::*;
pub use windows::{analyze_windows, DynamicResult, WindowConfig, WindowMetricSample};
