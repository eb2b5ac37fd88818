use crate::signal::{EcgTrace, RRSeries};
use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;

/// Parse a heart-rate export. Rows are kept only where the skin-contact flag (`SC`) is set;
/// exports without `SC`/`RR` headers fall back to the second column, unfiltered.
pub fn parse_hr_recording(text: &str) -> Result<RRSeries> {
    let mut reader = reader(text);
    let headers = reader.headers().context("reading header")?.clone();

    let columns = match (
        find_column(&headers, "SC"),
        find_column(&headers, "RR"),
    ) {
        (Some(sc), Some(rr)) => RrColumns { rr, contact: Some(sc) },
        _ if headers.len() >= 2 => RrColumns { rr: 1, contact: None },
        _ => bail!("invalid data format: expected SC and RR columns"),
    };

    let mut rr = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading row {}", row + 1))?;
        if let Some(sc) = columns.contact {
            if !is_contact(record.get(sc)) {
                continue;
            }
        }
        let Some(cell) = record.get(columns.rr).filter(|cell| !cell.is_empty()) else {
            continue;
        };
        let value: f64 = cell
            .parse()
            .with_context(|| format!("row {}: RR is not numeric: {}", row + 1, cell))?;
        if value.is_nan() {
            continue;
        }
        rr.push(value);
    }
    if rr.is_empty() {
        bail!("no valid RR intervals found");
    }
    Ok(RRSeries::new(rr))
}

pub fn read_hr_recording(path: &Path) -> Result<RRSeries> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_hr_recording(&text).with_context(|| format!("in {}", path.display()))
}

/// Parse an ECG export with `MS` (timestamp, ms) and `ECG` (voltage) columns.
pub fn parse_ecg_recording(text: &str) -> Result<EcgTrace> {
    let mut reader = reader(text);
    let headers = reader.headers().context("reading header")?.clone();
    let ms_idx = find_column(&headers, "MS").ok_or_else(|| anyhow!("missing MS column"))?;
    let ecg_idx = find_column(&headers, "ECG").ok_or_else(|| anyhow!("missing ECG column"))?;

    let mut trace = EcgTrace::default();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading row {}", row + 1))?;
        let (Some(ms), Some(v)) = (record.get(ms_idx), record.get(ecg_idx)) else {
            continue;
        };
        if ms.is_empty() || v.is_empty() {
            continue;
        }
        trace.time_ms.push(
            ms.parse()
                .with_context(|| format!("row {}: MS is not numeric: {}", row + 1, ms))?,
        );
        trace.voltage.push(
            v.parse()
                .with_context(|| format!("row {}: ECG is not numeric: {}", row + 1, v))?,
        );
    }
    if trace.is_empty() {
        bail!("no ECG samples found");
    }
    Ok(trace)
}

pub fn read_ecg_recording(path: &Path) -> Result<EcgTrace> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_ecg_recording(&text).with_context(|| format!("in {}", path.display()))
}

struct RrColumns {
    rr: usize,
    contact: Option<usize>,
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn is_contact(cell: Option<&str>) -> bool {
    match cell {
        Some(v) if v.eq_ignore_ascii_case("true") => true,
        Some(v) => v.parse::<f64>().map(|x| x == 1.0).unwrap_or(false),
        None => false,
    }
}
