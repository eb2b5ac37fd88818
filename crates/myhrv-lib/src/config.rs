use crate::{
    artifact::ArtifactCleanerConfig, error::PipelineError, metrics::StandardMetrics,
    windows::WindowConfig,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Tunables for a full recording analysis. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rate used to express beats as sample positions for the metrics provider (Hz).
    pub sampling_rate_hz: f64,
    pub artifact: ArtifactCleanerConfig,
    pub windows: WindowConfig,
    pub metrics: StandardMetrics,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 1000.0,
            artifact: ArtifactCleanerConfig::default(),
            windows: WindowConfig::default(),
            metrics: StandardMetrics::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: AnalysisConfig = toml::from_str(text).context("parsing analysis config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let positive = [
            ("sampling_rate_hz", self.sampling_rate_hz),
            ("windows.window_sec", self.windows.window_sec),
            ("windows.step_sec", self.windows.step_sec),
            ("metrics.interp_fs", self.metrics.interp_fs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        self.artifact.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
        assert_eq!(cfg.artifact.half_window, 5);
        assert_eq!(cfg.artifact.threshold, 0.20);
        assert_eq!(cfg.windows.window_sec, 300.0);
        assert_eq!(cfg.windows.step_sec, 60.0);
        assert_eq!(cfg.windows.min_samples_per_window, 60);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AnalysisConfig::from_toml_str(
            r#"
            [windows]
            window_sec = 120.0
            min_samples_per_window = 20

            [artifact]
            threshold = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.windows.window_sec, 120.0);
        assert_eq!(cfg.windows.step_sec, 60.0);
        assert_eq!(cfg.windows.min_samples_per_window, 20);
        assert_eq!(cfg.artifact.threshold, 0.3);
        assert_eq!(cfg.artifact.half_window, 5);
        assert_eq!(cfg.metrics.interp_fs, 4.0);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = AnalysisConfig::from_toml_str("[windows]\nstep_sec = 0.0\n").unwrap_err();
        assert!(format!("{err:#}").contains("windows.step_sec"));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.artifact.threshold = -0.1;
        assert!(matches!(
            cfg.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sampling_rate_hz = 500.0").unwrap();
        let cfg = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(cfg.sampling_rate_hz, 500.0);
    }
}
