use crate::{
    signal::{EcgTrace, RRSeries},
    windows::DynamicResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    /// Unconnected markers; `style.width` is the marker radius.
    Scatter(LineSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(s) | Series::Scatter(s) => &s.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn with_labels(mut self, x: &str, y: &str) -> Self {
        self.x.label = Some(x.into());
        self.y.label = Some(y.into());
        self
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every series, or `None` when the figure has no points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points().iter());
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

/// Poincaré scatter: each interval against the next one.
pub fn poincare_figure(rr: &RRSeries) -> Figure {
    let points: Vec<[f64; 2]> = rr.rr.windows(2).map(|w| [w[0], w[1]]).collect();
    let mut fig =
        Figure::new(Some("Poincaré Plot".to_string())).with_labels("RR(i) (ms)", "RR(i+1) (ms)");
    fig.add_series(Series::Scatter(LineSeries {
        name: "RR".into(),
        points,
        style: Style {
            width: 2.0,
            color: Color(0xFF0077),
        },
    }));
    fig
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMetric {
    Rmssd,
    LfHf,
    HeartRate,
}

impl TrendMetric {
    fn label(self) -> &'static str {
        match self {
            TrendMetric::Rmssd => "RMSSD (ms)",
            TrendMetric::LfHf => "LF/HF",
            TrendMetric::HeartRate => "HR (bpm)",
        }
    }

    fn color(self) -> Color {
        match self {
            TrendMetric::Rmssd => Color(0x1F77B4),
            TrendMetric::LfHf => Color(0xFF7F0E),
            TrendMetric::HeartRate => Color(0xD62728),
        }
    }
}

/// Windows without a defined LF/HF are left out of the ratio trend.
pub fn trend_figure(dynamic: &DynamicResult, metric: TrendMetric) -> Figure {
    let points: Vec<[f64; 2]> = dynamic
        .samples
        .iter()
        .filter_map(|s| {
            let y = match metric {
                TrendMetric::Rmssd => Some(s.rmssd),
                TrendMetric::LfHf => s.lf_hf,
                TrendMetric::HeartRate => Some(s.hr),
            };
            y.map(|y| [s.time_min, y])
        })
        .collect();
    let mut fig = Figure::new(Some(format!("{} trend", metric.label())))
        .with_labels("Time (min)", metric.label());
    fig.add_series(Series::Line(LineSeries {
        name: metric.label().into(),
        points,
        style: Style {
            width: 2.0,
            color: metric.color(),
        },
    }));
    fig
}

pub fn ecg_figure(trace: &EcgTrace, max_points: usize) -> Figure {
    let points: Vec<[f64; 2]> = trace
        .time_ms
        .iter()
        .zip(&trace.voltage)
        .map(|(t, v)| [*t, *v])
        .collect();
    let mut fig =
        Figure::new(Some("ECG Signal Overview".to_string())).with_labels("Time (ms)", "ECG");
    fig.add_series(Series::Line(LineSeries {
        name: "ECG".into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.4,
            color: Color(0x2CA02C),
        },
    }));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windows::WindowMetricSample;

    #[test]
    fn poincare_pairs_successive_intervals() {
        let rr = RRSeries::new(vec![800.0, 810.0, 790.0]);
        let fig = poincare_figure(&rr);
        assert_eq!(fig.series[0].points(), &[[800.0, 810.0], [810.0, 790.0]]);
        assert_eq!(fig.bounds(), Some((800.0, 810.0, 790.0, 810.0)));
    }

    #[test]
    fn decimation_caps_point_count() {
        let points: Vec<[f64; 2]> = (0..1000).map(|i| [i as f64, 0.0]).collect();
        let out = decimate_points(&points, 100);
        assert_eq!(out.len(), 100);
        assert_eq!(out[1], [10.0, 0.0]);
    }

    #[test]
    fn trend_uses_window_midpoints() {
        let dynamic = DynamicResult {
            time_min: vec![2.5, 3.5],
            samples: vec![
                WindowMetricSample {
                    time_min: 2.5,
                    rmssd: 30.0,
                    lf_hf: Some(1.2),
                    hr: 70.0,
                },
                WindowMetricSample {
                    time_min: 3.5,
                    rmssd: 28.0,
                    lf_hf: None,
                    hr: 72.0,
                },
            ],
            skipped: Vec::new(),
            windows_evaluated: 2,
        };
        let fig = trend_figure(&dynamic, TrendMetric::HeartRate);
        assert_eq!(fig.series[0].points(), &[[2.5, 70.0], [3.5, 72.0]]);
        let ratio = trend_figure(&dynamic, TrendMetric::LfHf);
        assert_eq!(ratio.series[0].points(), &[[2.5, 1.2]]);
    }

    #[test]
    fn empty_figure_has_no_bounds() {
        assert!(Figure::new(None::<String>).bounds().is_none());
    }

    #[test]
    fn color_unpacks_rgb() {
        assert_eq!(Color(0x1F77B4).rgb(), (0x1F, 0x77, 0xB4));
    }
}
