//! Amplitude table ingest.
//!
//! Turns the per-subject amplitude CSV (`subj, Base, C5%, ..., C80%`) into
//! [`SubjectRecord`]s scaled to the fitting unit.
//!
//! - missing columns are a schema error (exit code 2)
//! - bad rows are skipped and reported with their line number
//! - an empty table is not an error: it yields an empty batch

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::{Reader, StringRecord};

use crate::domain::{SubjectRecord, TableConfig};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub records: Vec<SubjectRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load the amplitude table at `path`.
pub fn load_amplitude_table(path: &Path, table: &TableConfig) -> Result<IngestedTable, AppError> {
    let mut reader = open_csv(path)?;
    let header_map = read_header_map(&mut reader, path)?;

    let subject_idx = require_column(&header_map, &table.subject_column, path)?;
    let baseline_idx = require_column(&header_map, &table.baseline_column, path)?;
    let condition_idx = table
        .condition_columns
        .iter()
        .map(|name| require_column(&header_map, name, path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let Some(subject) = cell(&record, subject_idx) else {
            row_errors.push(RowError {
                line,
                id: None,
                message: format!("Missing `{}` value.", table.subject_column),
            });
            continue;
        };

        let parsed = parse_f64(&record, baseline_idx, &table.baseline_column).and_then(|baseline| {
            let responses = condition_idx
                .iter()
                .zip(&table.condition_columns)
                .map(|(&i, name)| parse_f64(&record, i, name).map(|v| v * table.amplitude_scale))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((baseline * table.amplitude_scale, responses))
        });

        match parsed {
            Ok((baseline, responses)) => records.push(SubjectRecord {
                subject: subject.to_string(),
                baseline,
                responses,
            }),
            Err(message) => row_errors.push(RowError {
                line,
                id: Some(subject.to_string()),
                message,
            }),
        }
    }

    Ok(IngestedTable {
        records,
        row_errors,
        rows_read,
    })
}

/// Open a CSV file with the reader settings shared by every table in the crate.
pub(crate) fn open_csv(path: &Path) -> Result<Reader<File>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

pub(crate) fn read_header_map(
    reader: &mut Reader<File>,
    path: &Path,
) -> Result<HashMap<String, usize>, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers of '{}': {e}", path.display())))?;
    Ok(build_header_map(headers))
}

pub(crate) fn require_column(
    header_map: &HashMap<String, usize>,
    name: &str,
    path: &Path,
) -> Result<usize, AppError> {
    header_map.get(&normalize_header_name(name)).copied().ok_or_else(|| {
        AppError::new(
            2,
            format!("Missing required column `{name}` in '{}'.", path.display()),
        )
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

pub(crate) fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

pub(crate) fn parse_f64(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = cell(record, idx).ok_or_else(|| format!("Missing `{name}` value."))?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn reads_and_scales_amplitudes() {
        let f = write_csv(
            "\u{feff}subj,Base,C5%,C10%,C20%,C40%,C80%\n\
             001,1e-12,2e-12,3e-12,5e-12,8e-12,9e-12\n",
        );
        let t = load_amplitude_table(f.path(), &TableConfig::default()).unwrap();
        assert_eq!(t.rows_read, 1);
        assert!(t.row_errors.is_empty());

        let r = &t.records[0];
        assert_eq!(r.subject, "001");
        assert!((r.baseline - 1.0).abs() < 1e-12);
        let expected = [2.0, 3.0, 5.0, 8.0, 9.0];
        for (got, want) in r.responses.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn bad_rows_are_reported_with_line_numbers() {
        let f = write_csv(
            "subj,Base,C5%,C10%,C20%,C40%,C80%\n\
             001,0,1,2,3,4,5\n\
             002,0,1,oops,3,4,5\n\
             ,0,1,2,3,4,5\n",
        );
        let t = load_amplitude_table(f.path(), &TableConfig::default()).unwrap();
        assert_eq!(t.records.len(), 1);
        assert_eq!(t.row_errors.len(), 2);
        assert_eq!(t.row_errors[0].line, 3);
        assert_eq!(t.row_errors[0].id.as_deref(), Some("002"));
        assert_eq!(t.row_errors[1].line, 4);
        assert!(t.row_errors[1].id.is_none());
    }

    #[test]
    fn missing_condition_column_is_a_schema_error() {
        let f = write_csv("subj,Base,C5%,C10%\n001,0,1,2\n");
        let err = load_amplitude_table(f.path(), &TableConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("C20%"));
    }

    #[test]
    fn header_only_table_is_empty() {
        let f = write_csv("subj,Base,C5%,C10%,C20%,C40%,C80%\n");
        let t = load_amplitude_table(f.path(), &TableConfig::default()).unwrap();
        assert!(t.records.is_empty());
        assert_eq!(t.rows_read, 0);
    }
}
