//! Event tables and spectra exported by the neuroimaging toolkit.
//!
//! - event table: `sample, code`
//! - PSD matrix: first column the sensor name, one column per frequency bin,
//!   the header row carries the bin frequencies
//! - spectrum: `freq, power`

use std::path::Path;

use crate::domain::{Event, PsdMatrix};
use crate::error::AppError;
use crate::io::export::{create_csv, finish_csv, write_row};
use crate::io::ingest::{cell, open_csv, parse_f64, read_header_map, require_column};

pub fn read_event_table(path: &Path) -> Result<Vec<Event>, AppError> {
    let mut reader = open_csv(path)?;
    let header_map = read_header_map(&mut reader, path)?;
    let sample_idx = require_column(&header_map, "sample", path)?;
    let code_idx = require_column(&header_map, "code", path)?;

    let mut events = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::new(2, format!("CSV parse error in '{}' line {line}: {e}", path.display())))?;
        let sample = cell(&record, sample_idx).and_then(|s| s.parse::<i64>().ok());
        let code = cell(&record, code_idx).and_then(|s| s.parse::<u32>().ok());
        match (sample, code) {
            (Some(sample), Some(code)) => events.push(Event { sample, code }),
            _ => {
                return Err(AppError::new(
                    3,
                    format!("Invalid event at '{}' line {line}.", path.display()),
                ));
            }
        }
    }
    Ok(events)
}

pub fn write_event_table(path: &Path, events: &[Event]) -> Result<(), AppError> {
    let mut writer = create_csv(path, "event table")?;
    write_row(&mut writer, ["sample", "code"], "event table")?;
    for ev in events {
        let (sample, code) = (ev.sample.to_string(), ev.code.to_string());
        write_row(&mut writer, [sample.as_str(), code.as_str()], "event table")?;
    }
    finish_csv(writer, "event table")
}

pub fn read_psd_matrix(path: &Path) -> Result<PsdMatrix, AppError> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read PSD header of '{}': {e}", path.display())))?
        .clone();

    let freqs = headers
        .iter()
        .skip(1)
        .map(|h| h.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| {
            AppError::new(
                2,
                format!("PSD header of '{}' must list numeric frequencies.", path.display()),
            )
        })?;
    if freqs.is_empty() {
        return Err(AppError::new(2, format!("PSD '{}' has no frequency bins.", path.display())));
    }

    let mut sensors = Vec::new();
    let mut power = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::new(2, format!("CSV parse error in '{}' line {line}: {e}", path.display())))?;
        if record.len() != freqs.len() + 1 {
            return Err(AppError::new(
                3,
                format!(
                    "PSD '{}' line {line}: expected {} values, got {}.",
                    path.display(),
                    freqs.len(),
                    record.len().saturating_sub(1)
                ),
            ));
        }
        let row = (1..record.len())
            .map(|i| parse_f64(&record, i, "power"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::new(3, format!("PSD '{}' line {line}: {e}", path.display())))?;
        sensors.push(cell(&record, 0).unwrap_or_default().to_string());
        power.push(row);
    }

    if power.is_empty() {
        return Err(AppError::new(3, format!("PSD '{}' has no sensors.", path.display())));
    }
    Ok(PsdMatrix { sensors, freqs, power })
}

/// Read a two-column spectrum (`freq, power`).
pub fn read_spectrum(path: &Path) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let mut reader = open_csv(path)?;
    let header_map = read_header_map(&mut reader, path)?;
    let f_idx = require_column(&header_map, "freq", path)?;
    let p_idx = require_column(&header_map, "power", path)?;

    let mut freqs = Vec::new();
    let mut power = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::new(2, format!("CSV parse error in '{}' line {line}: {e}", path.display())))?;
        let parsed = parse_f64(&record, f_idx, "freq").and_then(|f| Ok((f, parse_f64(&record, p_idx, "power")?)));
        let (f, p) = parsed.map_err(|e| AppError::new(3, format!("'{}' line {line}: {e}", path.display())))?;
        freqs.push(f);
        power.push(p);
    }
    Ok((freqs, power))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_table_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        let events = vec![Event { sample: 1200, code: 3 }, Event { sample: 1543, code: 3 }];
        write_event_table(&path, &events).unwrap();
        assert_eq!(read_event_table(&path).unwrap(), events);
    }

    #[test]
    fn psd_matrix_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("psd.csv");
        std::fs::write(&path, "sensor,0.0,0.5,1.0\nMEG0113,1,2,3\nMEG0112,4,5,6\n").unwrap();

        let psd = read_psd_matrix(&path).unwrap();
        assert_eq!(psd.freqs, vec![0.0, 0.5, 1.0]);
        assert_eq!(psd.sensors, vec!["MEG0113", "MEG0112"]);
        assert_eq!(psd.power[1], vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn ragged_psd_row_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("psd.csv");
        std::fs::write(&path, "sensor,0.0,0.5\nMEG0113,1\n").unwrap();
        assert_eq!(read_psd_matrix(&path).unwrap_err().exit_code(), 3);
    }
}
