use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use myhrv_lib::{
    analyze_recording, clean_rr_artifacts,
    io::{recording as recording_io, text as text_io},
    plot::{ecg_figure, poincare_figure, trend_figure, Figure, Series, TrendMetric},
    report::StatusReport,
    AnalysisConfig, AnalysisReport, ArtifactCleanerConfig, EcgRelay, RRSeries,
};
use plotters::prelude::*;
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "myhrv",
    version,
    about = "Heart-rate-variability analysis of RR interval recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Analysis settings shared by every command that runs the full pipeline.
#[derive(Args, Debug)]
struct AnalysisArgs {
    /// TOML file with analysis settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    window_sec: Option<f64>,
    #[arg(long)]
    step_sec: Option<f64>,
    #[arg(long)]
    min_samples: Option<usize>,
    #[arg(long)]
    half_window: Option<usize>,
    #[arg(long)]
    threshold: Option<f64>,
}

impl AnalysisArgs {
    fn resolve(&self) -> Result<AnalysisConfig> {
        let mut cfg = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(v) = self.window_sec {
            cfg.windows.window_sec = v;
        }
        if let Some(v) = self.step_sec {
            cfg.windows.step_sec = v;
        }
        if let Some(v) = self.min_samples {
            cfg.windows.min_samples_per_window = v;
        }
        if let Some(v) = self.half_window {
            cfg.artifact.half_window = v;
        }
        if let Some(v) = self.threshold {
            cfg.artifact.threshold = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum PlotKind {
    #[value(name = "poincare")]
    Poincare,
    #[value(name = "rmssd-trend")]
    RmssdTrend,
    #[value(name = "lfhf-trend")]
    LfHfTrend,
    #[value(name = "hr-trend")]
    HrTrend,
    #[value(name = "ecg")]
    Ecg,
}

#[derive(Subcommand)]
enum Commands {
    /// Full analysis of a heart-rate export (CSV with SC/RR columns, stdin if --input is absent)
    Analyze {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Optional ECG export (MS/ECG columns) relayed with the result
        #[arg(long)]
        ecg: Option<PathBuf>,
        #[arg(long, default_value_t = EcgRelay::DEFAULT_STRIDE)]
        ecg_stride: usize,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Median-filter artifact correction of newline-delimited RR intervals (ms)
    Clean {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        half_window: usize,
        #[arg(long, default_value_t = 0.20)]
        threshold: f64,
    },
    /// Plain-text status report of the whole-recording metrics
    Report {
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Render a figure of a recording to PNG via plotters
    Plot {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "poincare")]
        kind: PlotKind,
        #[arg(long)]
        ecg: Option<PathBuf>,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

#[derive(Serialize)]
struct CleanOutput {
    rr: Vec<f64>,
    corrected: Vec<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            input,
            ecg,
            ecg_stride,
            analysis,
        } => cmd_analyze(input.as_deref(), ecg.as_deref(), ecg_stride, &analysis)?,
        Commands::Clean {
            input,
            half_window,
            threshold,
        } => cmd_clean(input.as_deref(), half_window, threshold)?,
        Commands::Report { input, analysis } => cmd_report(input.as_deref(), &analysis)?,
        Commands::Plot {
            input,
            out,
            kind,
            ecg,
            analysis,
        } => cmd_plot(input.as_deref(), &out, kind, ecg.as_deref(), &analysis)?,
    }
    Ok(())
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn read_recording(input: Option<&Path>) -> Result<RRSeries> {
    match input {
        Some(path) => recording_io::read_hr_recording(path),
        None => recording_io::parse_hr_recording(&read_input(None)?),
    }
}

fn run_analysis(input: Option<&Path>, cfg: &AnalysisConfig) -> Result<AnalysisReport> {
    let rr = read_recording(input)?;
    analyze_recording(&rr, cfg, &cfg.metrics).map_err(|err| {
        let what = if err.is_input_error() {
            "invalid recording"
        } else {
            "analysis failed"
        };
        anyhow::Error::new(err).context(what)
    })
}

fn cmd_analyze(
    input: Option<&Path>,
    ecg: Option<&Path>,
    ecg_stride: usize,
    args: &AnalysisArgs,
) -> Result<()> {
    let mut report = run_analysis(input, &args.resolve()?)?;
    if let Some(path) = ecg {
        let trace = recording_io::read_ecg_recording(path)?;
        report = report.with_ecg(trace, ecg_stride);
    }
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn cmd_clean(input: Option<&Path>, half_window: usize, threshold: f64) -> Result<()> {
    let cfg = ArtifactCleanerConfig {
        half_window,
        threshold,
    };
    cfg.validate()?;
    let rr = match input {
        Some(path) => text_io::read_rr_series(path)?,
        None => RRSeries::new(text_io::parse_f64_series(&read_input(None)?)?),
    };
    rr.validate().context("invalid recording")?;
    let cleaned = clean_rr_artifacts(&rr, &cfg);
    let out = CleanOutput {
        corrected: cleaned.corrected,
        rr: cleaned.rr.rr,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_report(input: Option<&Path>, args: &AnalysisArgs) -> Result<()> {
    let cfg = args.resolve()?;
    let report = run_analysis(input, &cfg)?;
    println!("{}", StatusReport::from_metrics(&report.metrics));
    if report.diagnostics.too_short_for_windows {
        println!();
        println!(
            "Recording lasts {:.0} s; no {:.0} s trend windows were computed.",
            report.diagnostics.duration_s, cfg.windows.window_sec
        );
    }
    Ok(())
}

fn cmd_plot(
    input: Option<&Path>,
    out: &Path,
    kind: PlotKind,
    ecg: Option<&Path>,
    args: &AnalysisArgs,
) -> Result<()> {
    let fig = match kind {
        PlotKind::Ecg => {
            let path = ecg.ok_or_else(|| anyhow!("--ecg is required for the ecg plot"))?;
            ecg_figure(&recording_io::read_ecg_recording(path)?, 4096)
        }
        PlotKind::Poincare => {
            let report = run_analysis(input, &args.resolve()?)?;
            poincare_figure(&RRSeries::new(report.cleaned_rr))
        }
        PlotKind::RmssdTrend | PlotKind::LfHfTrend | PlotKind::HrTrend => {
            let report = run_analysis(input, &args.resolve()?)?;
            let metric = match kind {
                PlotKind::RmssdTrend => TrendMetric::Rmssd,
                PlotKind::LfHfTrend => TrendMetric::LfHf,
                _ => TrendMetric::HeartRate,
            };
            trend_figure(&report.dynamic, metric)
        }
    };
    draw_plotters_figure(out, &fig)
}

fn draw_plotters_figure(path: &Path, fig: &Figure) -> Result<()> {
    let Some((x_min, x_max, y_min, y_max)) = fig.bounds() else {
        bail!("nothing to plot");
    };
    let (x_min, x_max) = padded(x_min, x_max);
    let (y_min, y_max) = padded(y_min, y_max);

    let backend = BitMapBackend::new(path, (800, 480));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            fig.title.clone().unwrap_or_else(|| "Plot".into()),
            ("sans-serif", 24),
        )
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    chart
        .configure_mesh()
        .x_desc(fig.x.label.clone().unwrap_or_default())
        .y_desc(fig.y.label.clone().unwrap_or_default())
        .draw()?;
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    &RGBColor(r, g, b),
                ))?;
            }
            Series::Scatter(scatter) => {
                let (r, g, b) = scatter.style.color.rgb();
                let radius = scatter.style.width.max(1.0) as u32;
                chart.draw_series(scatter.points.iter().map(|p| {
                    Circle::new((p[0], p[1]), radius, RGBColor(r, g, b).filled())
                }))?;
            }
        }
    }
    root.present()?;
    Ok(())
}

/// Widen a degenerate or tight range so every point stays inside the plotting area.
fn padded(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    if span.abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        (min - span * 0.05, max + span * 0.05)
    }
}
