use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Point events on a timeline (beat positions in samples).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// Reconstruct beat positions from intervals. The first beat sits at sample 0,
    /// so `n` intervals yield `n + 1` peaks.
    pub fn from_rr(rr: &RRSeries, fs: f64) -> Self {
        let mut indices = Vec::with_capacity(rr.len() + 1);
        indices.push(0);
        let mut acc_ms = 0.0;
        for interval in &rr.rr {
            acc_ms += interval;
            indices.push((acc_ms * fs / 1000.0).round() as usize);
        }
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (milliseconds), in recording order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn new(rr: Vec<f64>) -> Self {
        Self { rr }
    }

    pub fn from_events(events: &Events, fs: f64) -> Self {
        let rr = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) * 1000.0 / fs)
            .collect();
        Self { rr }
    }

    pub fn len(&self) -> usize {
        self.rr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr.is_empty()
    }

    /// Rejects empty input and any interval that is not a positive finite number.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.rr.is_empty() {
            return Err(PipelineError::EmptySeries);
        }
        match self
            .rr
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            Some((index, &value)) => Err(PipelineError::NonPositiveInterval { index, value }),
            None => Ok(()),
        }
    }

    /// Running sum of the intervals: the timestamp (ms) of each beat that closes an interval.
    pub fn timestamps_ms(&self) -> Vec<f64> {
        let mut acc = 0.0;
        self.rr
            .iter()
            .map(|interval| {
                acc += interval;
                acc
            })
            .collect()
    }

    pub fn duration_s(&self) -> f64 {
        self.rr.iter().sum::<f64>() / 1000.0
    }

    pub fn slice(&self, range: std::ops::Range<usize>) -> RRSeries {
        RRSeries {
            rr: self.rr[range].to_vec(),
        }
    }
}

/// Raw ECG waveform, relayed alongside the analysis without interpretation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EcgTrace {
    /// Sample timestamps (ms)
    pub time_ms: Vec<f64>,
    pub voltage: Vec<f64>,
}

impl EcgTrace {
    pub fn len(&self) -> usize {
        self.time_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_ms.is_empty()
    }

    /// Keep every `stride`-th sample, starting with the first.
    pub fn decimate(&self, stride: usize) -> EcgTrace {
        let stride = stride.max(1);
        EcgTrace {
            time_ms: self.time_ms.iter().copied().step_by(stride).collect(),
            voltage: self.voltage.iter().copied().step_by(stride).collect(),
        }
    }
}

/// ECG payload returned with an analysis: the full trace plus a coarse copy for overview display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcgRelay {
    pub full: EcgTrace,
    pub overview: EcgTrace,
}

impl EcgRelay {
    pub const DEFAULT_STRIDE: usize = 10;

    pub fn new(trace: EcgTrace, stride: usize) -> Self {
        let overview = trace.decimate(stride);
        Self {
            full: trace,
            overview,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_intervals() {
        let rr = RRSeries::new(vec![812.0, 790.0, 805.0, 821.0]);
        let events = Events::from_rr(&rr, 1000.0);
        assert_eq!(events.indices, vec![0, 812, 1602, 2407, 3228]);
        assert_eq!(RRSeries::from_events(&events, 1000.0), rr);
    }

    #[test]
    fn timestamps_are_running_sum() {
        let rr = RRSeries::new(vec![800.0, 900.0, 700.0]);
        assert_eq!(rr.timestamps_ms(), vec![800.0, 1700.0, 2400.0]);
        assert!((rr.duration_s() - 2.4).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_empty_and_non_positive() {
        assert!(matches!(
            RRSeries::new(vec![]).validate(),
            Err(PipelineError::EmptySeries)
        ));
        match RRSeries::new(vec![800.0, 0.0, 810.0]).validate() {
            Err(PipelineError::NonPositiveInterval { index, value }) => {
                assert_eq!(index, 1);
                assert_eq!(value, 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(RRSeries::new(vec![800.0, f64::NAN]).validate().is_err());
        assert!(RRSeries::new(vec![800.0, 790.0]).validate().is_ok());
    }

    #[test]
    fn ecg_relay_decimates_every_tenth_sample() {
        let trace = EcgTrace {
            time_ms: (0..25).map(|i| i as f64 * 7.8125).collect(),
            voltage: (0..25).map(|i| i as f64).collect(),
        };
        let relay = EcgRelay::new(trace, EcgRelay::DEFAULT_STRIDE);
        assert_eq!(relay.full.len(), 25);
        assert_eq!(relay.overview.voltage, vec![0.0, 10.0, 20.0]);
    }
}
