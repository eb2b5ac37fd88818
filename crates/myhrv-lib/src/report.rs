//! Plain-language reading of whole-recording metrics.

use crate::metrics::MetricsRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartRateState {
    High,
    Alert,
    Resting,
    DeepRelaxation,
}

impl HeartRateState {
    pub fn from_bpm(bpm: f64) -> Self {
        if bpm > 100.0 {
            Self::High
        } else if bpm > 80.0 {
            Self::Alert
        } else if bpm > 60.0 {
            Self::Resting
        } else {
            Self::DeepRelaxation
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::High => "High heart rate (possible stress, post-exercise, or tachycardia).",
            Self::Alert => "Awake, alert, or mild stress state.",
            Self::Resting => "Calm, relaxed resting state.",
            Self::DeepRelaxation => "Deep relaxation or sleep state.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VagalTone {
    VeryActive,
    Normal,
    Low,
}

impl VagalTone {
    pub fn from_rmssd(rmssd_ms: f64) -> Self {
        if rmssd_ms > 50.0 {
            Self::VeryActive
        } else if rmssd_ms > 20.0 {
            Self::Normal
        } else {
            Self::Low
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::VeryActive => {
                "Very active parasympathetic nervous system (good recovery or high endurance)."
            }
            Self::Normal => "Parasympathetic activity in a healthy, normal range.",
            Self::Low => {
                "Low parasympathetic activity (possible stress, fatigue, or insufficient recovery)."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomicBalance {
    SympatheticDominance,
    SlightSympathetic,
    ParasympatheticDominance,
}

impl AutonomicBalance {
    pub fn from_lf_hf(ratio: f64) -> Self {
        if ratio > 2.0 {
            Self::SympatheticDominance
        } else if ratio > 1.0 {
            Self::SlightSympathetic
        } else {
            Self::ParasympatheticDominance
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::SympatheticDominance => {
                "Sympathetic (stress system) dominance (stress, anxiety, focus)."
            }
            Self::SlightSympathetic => {
                "Relative balance, slight sympathetic dominance (awake, alert)."
            }
            Self::ParasympatheticDominance => {
                "Parasympathetic (rest system) dominance (relaxation, recovery, drowsiness)."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub mean_nn: f64,
    pub mean_hr_bpm: f64,
    pub heart_rate: HeartRateState,
    pub rmssd: f64,
    pub vagal_tone: VagalTone,
    pub lf_hf: Option<f64>,
    /// `None` when LF/HF is undefined for the recording.
    pub balance: Option<AutonomicBalance>,
    pub sd1: f64,
    pub sd2: f64,
}

impl StatusReport {
    pub fn from_metrics(m: &MetricsRecord) -> Self {
        let mean_hr_bpm = m.heart_rate_bpm();
        Self {
            mean_nn: m.mean_nn,
            mean_hr_bpm,
            heart_rate: HeartRateState::from_bpm(mean_hr_bpm),
            rmssd: m.rmssd,
            vagal_tone: VagalTone::from_rmssd(m.rmssd),
            lf_hf: m.lf_hf,
            balance: m.lf_hf.map(AutonomicBalance::from_lf_hf),
            sd1: m.sd1,
            sd2: m.sd2,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HRV Status Report")?;
        writeln!(f)?;
        writeln!(f, "Time-Domain Metrics")?;
        writeln!(
            f,
            "  Mean NN (RR): {:.2} ms (Average Heart Rate: {:.0} BPM)",
            self.mean_nn, self.mean_hr_bpm
        )?;
        writeln!(f, "  Status: {}", self.heart_rate.description())?;
        writeln!(f, "  RMSSD: {:.2} ms", self.rmssd)?;
        writeln!(f, "  Status: {}", self.vagal_tone.description())?;
        writeln!(f)?;
        writeln!(f, "Frequency-Domain Metrics")?;
        match (self.lf_hf, self.balance) {
            (Some(ratio), Some(balance)) => {
                writeln!(f, "  LF/HF Ratio: {:.2}", ratio)?;
                writeln!(f, "  Status: {}", balance.description())?;
            }
            _ => {
                writeln!(f, "  LF/HF Ratio: undefined")?;
                writeln!(f, "  Status: No high-frequency power in the recording.")?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Non-Linear Metrics (Poincaré)")?;
        writeln!(
            f,
            "  SD1: {:.2} ms (Short-term variability, parasympathetic assessment)",
            self.sd1
        )?;
        write!(
            f,
            "  SD2: {:.2} ms (Long-term variability, overall assessment)",
            self.sd2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heart_rate_bands_are_exclusive_at_the_boundary() {
        assert_eq!(HeartRateState::from_bpm(100.0), HeartRateState::Alert);
        assert_eq!(HeartRateState::from_bpm(100.1), HeartRateState::High);
        assert_eq!(HeartRateState::from_bpm(80.0), HeartRateState::Resting);
        assert_eq!(HeartRateState::from_bpm(60.0), HeartRateState::DeepRelaxation);
    }

    #[test]
    fn rmssd_and_ratio_bands() {
        assert_eq!(VagalTone::from_rmssd(51.0), VagalTone::VeryActive);
        assert_eq!(VagalTone::from_rmssd(50.0), VagalTone::Normal);
        assert_eq!(VagalTone::from_rmssd(20.0), VagalTone::Low);
        assert_eq!(
            AutonomicBalance::from_lf_hf(2.5),
            AutonomicBalance::SympatheticDominance
        );
        assert_eq!(
            AutonomicBalance::from_lf_hf(1.5),
            AutonomicBalance::SlightSympathetic
        );
        assert_eq!(
            AutonomicBalance::from_lf_hf(1.0),
            AutonomicBalance::ParasympatheticDominance
        );
    }

    #[test]
    fn renders_all_sections() {
        let metrics = MetricsRecord {
            n: 300,
            mean_nn: 1000.0,
            sdnn: 40.0,
            rmssd: 35.0,
            pnn50: 0.1,
            vlf: 10.0,
            lf: 300.0,
            hf: 200.0,
            lf_hf: Some(1.5),
            total_power: 510.0,
            sd1: 24.75,
            sd2: 50.5,
            samp_entropy: 1.2,
            dfa_alpha1: 1.0,
        };
        let report = StatusReport::from_metrics(&metrics);
        assert_eq!(report.heart_rate, HeartRateState::DeepRelaxation);
        let text = report.to_string();
        assert!(text.contains("Average Heart Rate: 60 BPM"));
        assert!(text.contains("RMSSD: 35.00 ms"));
        assert!(text.contains("LF/HF Ratio: 1.50"));
        assert!(text.contains("SD2: 50.50 ms"));
    }

    #[test]
    fn undefined_ratio_is_reported_as_such() {
        let metrics = MetricsRecord {
            n: 400,
            mean_nn: 800.0,
            sdnn: 0.0,
            rmssd: 0.0,
            pnn50: 0.0,
            vlf: 0.0,
            lf: 0.0,
            hf: 0.0,
            lf_hf: None,
            total_power: 0.0,
            sd1: 0.0,
            sd2: 0.0,
            samp_entropy: 0.0,
            dfa_alpha1: 0.0,
        };
        let report = StatusReport::from_metrics(&metrics);
        assert_eq!(report.balance, None);
        let text = report.to_string();
        assert!(text.contains("LF/HF Ratio: undefined"));
        assert!(text.contains("Average Heart Rate: 75 BPM"));
    }
}
