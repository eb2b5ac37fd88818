use crate::metrics::MetricsError;

/// Series-level failures. Any of these aborts the analysis of a recording.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no RR intervals to analyse")]
    EmptySeries,
    #[error("RR interval {index} is not a positive duration: {value}")]
    NonPositiveInterval { index: usize, value: f64 },
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),
    #[error("whole-recording metrics failed")]
    AggregateComputation(#[source] MetricsError),
}

impl PipelineError {
    /// True when the request failed because there was nothing to analyse.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptySeries | PipelineError::NonPositiveInterval { .. }
        )
    }
}
