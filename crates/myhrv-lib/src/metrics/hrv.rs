use super::{MetricsError, MetricsProvider, MetricsRecord};
use crate::signal::{Events, RRSeries};
use log::debug;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const VLF_BAND: (f64, f64) = (0.003, 0.04);
const LF_BAND: (f64, f64) = (0.04, 0.15);
const HF_BAND: (f64, f64) = (0.15, 0.4);
/// Welch segment length (seconds); also the shortest span a spectral estimate accepts.
const WELCH_SEGMENT_S: f64 = 30.0;
const MIN_BEATS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HRVTime {
    pub n: usize,
    pub avnn: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HRVPsd {
    pub vlf: f64,
    pub lf: f64,
    pub hf: f64,
    pub lf_hf: Option<f64>,
    pub total_power: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HRVNonlinear {
    pub sd1: f64,
    pub sd2: f64,
    pub samp_entropy: f64,
    pub dfa_alpha1: f64,
}

/// Default metrics backend: time domain, Welch PSD of the resampled tachogram, and
/// Poincaré/entropy/DFA nonlinear measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardMetrics {
    /// Resampling rate for the spectral estimate (Hz).
    pub interp_fs: f64,
}

impl Default for StandardMetrics {
    fn default() -> Self {
        Self { interp_fs: 4.0 }
    }
}

impl MetricsProvider for StandardMetrics {
    fn compute_metrics(
        &self,
        peaks: &Events,
        sampling_rate_hz: f64,
    ) -> Result<MetricsRecord, MetricsError> {
        if peaks.len() < MIN_BEATS {
            return Err(MetricsError::InsufficientBeats {
                needed: MIN_BEATS,
                got: peaks.len(),
            });
        }
        let rr = RRSeries::from_events(peaks, sampling_rate_hz);
        let duration_s = rr.duration_s();
        if duration_s < WELCH_SEGMENT_S {
            return Err(MetricsError::InsufficientDuration {
                needed_s: WELCH_SEGMENT_S,
                got_s: duration_s,
            });
        }

        let time = hrv_time(&rr);
        let psd = hrv_psd(&rr, self.interp_fs);
        if psd.lf_hf.is_none() {
            debug!("no HF power in {duration_s:.1}s segment, LF/HF left undefined");
        }
        let nonlinear = hrv_nonlinear(&rr);

        Ok(MetricsRecord {
            n: time.n,
            mean_nn: time.avnn,
            sdnn: time.sdnn,
            rmssd: time.rmssd,
            pnn50: time.pnn50,
            vlf: psd.vlf,
            lf: psd.lf,
            hf: psd.hf,
            lf_hf: psd.lf_hf,
            total_power: psd.total_power,
            sd1: nonlinear.sd1,
            sd2: nonlinear.sd2,
            samp_entropy: nonlinear.samp_entropy,
            dfa_alpha1: nonlinear.dfa_alpha1,
        })
    }
}

pub fn hrv_time(rr: &RRSeries) -> HRVTime {
    let n = rr.rr.len();
    let avnn = if n > 0 {
        rr.rr.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let sdnn = sample_sd(&rr.rr);
    let rmssd = if n > 1 {
        let diffs = rr.rr.windows(2).map(|w| (w[1] - w[0]).powi(2));
        (diffs.sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    let pnn50 = if n > 1 {
        let count = rr
            .rr
            .windows(2)
            .filter(|w| (w[1] - w[0]).abs() > 50.0)
            .count();
        (count as f64) / (n as f64 - 1.0)
    } else {
        0.0
    };

    HRVTime {
        n,
        avnn,
        sdnn,
        rmssd,
        pnn50,
    }
}

pub fn hrv_psd(rr: &RRSeries, fs_interp: f64) -> HRVPsd {
    let (freqs, powers) = welch_psd(rr, fs_interp);
    let total_power: f64 = powers.iter().sum();
    let vlf = integrate_band(&freqs, &powers, VLF_BAND);
    let lf = integrate_band(&freqs, &powers, LF_BAND);
    let hf = integrate_band(&freqs, &powers, HF_BAND);
    let lf_hf = (hf > 0.0).then(|| lf / hf);
    HRVPsd {
        vlf,
        lf,
        hf,
        lf_hf,
        total_power,
    }
}

pub fn hrv_nonlinear(rr: &RRSeries) -> HRVNonlinear {
    let sd1 = poincare_sd1(rr);
    let sdnn = sample_sd(&rr.rr);
    let sd2 = (2.0 * sdnn * sdnn - sd1 * sd1).max(0.0).sqrt();
    let samp_entropy = sample_entropy(&rr.rr, 2, 0.2 * sdnn.max(0.0001));
    let dfa_alpha1 = detrended_fluctuation_alpha1(&rr.rr);
    HRVNonlinear {
        sd1,
        sd2,
        samp_entropy,
        dfa_alpha1,
    }
}

fn sample_sd(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    (data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (data.len() as f64 - 1.0)).sqrt()
}

fn sample_entropy(data: &[f64], m: usize, r: f64) -> f64 {
    if data.len() <= m + 1 {
        return 0.0;
    }
    let mut count_m = 0f64;
    let mut count_m1 = 0f64;
    for i in 0..data.len() - m {
        for j in (i + 1)..data.len() - m {
            if max_diff(data, i, j, m) < r {
                count_m += 1.0;
                if (j + m) < data.len() && max_diff(data, i, j, m + 1) < r {
                    count_m1 += 1.0;
                }
            }
        }
    }
    if count_m1 == 0.0 || count_m == 0.0 {
        0.0
    } else {
        -(count_m1 / count_m).ln()
    }
}

fn max_diff(data: &[f64], i: usize, j: usize, length: usize) -> f64 {
    data[i..i + length]
        .iter()
        .zip(data[j..j + length].iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}

fn poincare_sd1(rr: &RRSeries) -> f64 {
    let diffs: Vec<f64> = rr.rr.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.is_empty() {
        return 0.0;
    }
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    let var = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diffs.len() as f64;
    (0.5 * var).sqrt()
}

fn detrended_fluctuation_alpha1(rr: &[f64]) -> f64 {
    const MIN_WINDOW: usize = 4;
    const MAX_WINDOW: usize = 16;
    if rr.len() < MIN_WINDOW * 2 {
        return 0.0;
    }
    let mean = rr.iter().copied().sum::<f64>() / rr.len() as f64;
    let mut profile = Vec::with_capacity(rr.len());
    let mut acc = 0.0;
    for &value in rr {
        acc += value - mean;
        profile.push(acc);
    }
    let max_window = rr.len().min(MAX_WINDOW);
    let mut samples = Vec::new();
    for window in MIN_WINDOW..=max_window {
        let mut total = 0.0;
        let mut segments = 0;
        for segment in profile.chunks_exact(window) {
            let (slope, intercept) = linear_fit(segment);
            let err: f64 = segment
                .iter()
                .enumerate()
                .map(|(i, &y)| (y - (slope * i as f64 + intercept)).powi(2))
                .sum();
            total += err / window as f64;
            segments += 1;
        }
        if segments == 0 {
            continue;
        }
        let rms = (total / segments as f64).sqrt();
        if rms.is_finite() && rms > 0.0 {
            samples.push((window as f64, rms));
        }
    }
    if samples.len() < 2 {
        return 0.0;
    }
    log_log_slope(&samples)
}

fn linear_fit(segment: &[f64]) -> (f64, f64) {
    let n = segment.len();
    if n < 2 {
        return (0.0, segment.first().copied().unwrap_or(0.0));
    }
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xx = 0.0;
    let mut sum_xy = 0.0;
    for (i, &y) in segment.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_xy += x * y;
    }
    let n_f = n as f64;
    let denom = n_f * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return (0.0, sum_y / n_f);
    }
    let slope = (n_f * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n_f;
    (slope, intercept)
}

fn log_log_slope(points: &[(f64, f64)]) -> f64 {
    let logs: Vec<(f64, f64)> = points
        .iter()
        .filter(|(scale, rms)| *scale > 0.0 && *rms > 0.0)
        .map(|(scale, rms)| (scale.ln(), rms.ln()))
        .collect();
    if logs.len() < 2 {
        return 0.0;
    }
    let n = logs.len() as f64;
    let sum_x: f64 = logs.iter().map(|p| p.0).sum();
    let sum_y: f64 = logs.iter().map(|p| p.1).sum();
    let sum_xx: f64 = logs.iter().map(|p| p.0 * p.0).sum();
    let sum_xy: f64 = logs.iter().map(|p| p.0 * p.1).sum();
    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

fn integrate_band(freqs: &[f64], powers: &[f64], band: (f64, f64)) -> f64 {
    freqs
        .iter()
        .zip(powers)
        .filter(|(f, _)| **f >= band.0 && **f < band.1)
        .map(|(_, p)| *p)
        .sum()
}

fn welch_psd(rr: &RRSeries, fs_interp: f64) -> (Vec<f64>, Vec<f64>) {
    let mut signal = interpolate_rr(rr, fs_interp);
    let n = signal.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }
    let mean = signal.iter().sum::<f64>() / n as f64;
    for x in signal.iter_mut() {
        *x -= mean;
    }
    let window = ((fs_interp * WELCH_SEGMENT_S).max(4.0).min(n as f64)) as usize;
    let step = (window / 2).max(1);
    let mut planner = RealFftPlanner::<f64>::new();
    let r2c = planner.plan_fft_forward(window);
    let freqs: Vec<f64> = (0..window / 2 + 1)
        .map(|k| k as f64 * fs_interp / window as f64)
        .collect();
    let mut powers = vec![0.0; freqs.len()];
    let window_func = hann(window);
    let mut spectrum = r2c.make_output_vec();
    let mut pos = 0;
    let mut segments = 0;
    while pos + window <= n {
        let mut frame: Vec<f64> = signal[pos..pos + window]
            .iter()
            .zip(window_func.iter())
            .map(|(x, w)| x * w)
            .collect();
        pos += step;
        if r2c.process(&mut frame, &mut spectrum).is_err() {
            continue;
        }
        let scale = 1.0 / window as f64;
        for (k, val) in spectrum.iter().enumerate() {
            let power = if k == 0 || (window % 2 == 0 && k == window / 2) {
                val.norm_sqr()
            } else {
                2.0 * val.norm_sqr()
            } * scale;
            powers[k] += power;
        }
        segments += 1;
    }
    if segments > 0 {
        for p in powers.iter_mut() {
            *p /= segments as f64;
        }
    }
    (freqs, powers)
}

/// Step-wise resampling of the tachogram (ms) onto a uniform grid at `fs` Hz.
fn interpolate_rr(rr: &RRSeries, fs: f64) -> Vec<f64> {
    let times: Vec<f64> = rr.timestamps_ms().iter().map(|t| t / 1000.0).collect();
    let Some(&duration) = times.last() else {
        return Vec::new();
    };
    let n = (duration * fs).ceil() as usize;
    let mut signal = Vec::with_capacity(n);
    let mut idx = 0;
    for i in 0..n {
        let t = i as f64 / fs;
        while idx + 1 < times.len() && times[idx] < t {
            idx += 1;
        }
        signal.push(rr.rr[idx]);
    }
    signal
}

fn hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size as f64)).cos()))
        .collect()
}
