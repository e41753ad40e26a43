//! CSV exports.
//!
//! - the results table: one row per fitted subject, columns
//!   `subj, {prefix}_semi, {prefix}_Rmax, {prefix}_s, {prefix}_b, {prefix}_R2`
//! - the amplitude table: the fitting input format, written by the
//!   Appelbaum metric and the simulator

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::domain::{SubjectFit, SubjectRecord, TableConfig};
use crate::error::AppError;

/// Header of the results table for a column prefix (e.g. `AbN1`).
pub fn results_header(prefix: &str) -> String {
    format!("subj,{prefix}_semi,{prefix}_Rmax,{prefix}_s,{prefix}_b,{prefix}_R2")
}

/// Write the results table. Column order and names are the compatibility surface.
pub fn write_results_csv(path: &Path, fits: &[SubjectFit], prefix: &str) -> Result<(), AppError> {
    let mut writer = create_csv(path, "results CSV")?;
    let header = results_header(prefix);
    write_row(&mut writer, header.split(','), "results CSV")?;

    for fit in fits {
        let p = &fit.result.params;
        let values = [
            p.semisaturation,
            p.max_amplitude,
            p.saturation_exponent,
            p.baseline,
            fit.result.quality.r_squared,
        ]
        .map(|v| v.to_string());
        write_row(
            &mut writer,
            std::iter::once(fit.record.subject.as_str()).chain(values.iter().map(String::as_str)),
            "results CSV",
        )?;
    }

    finish_csv(writer, "results CSV")
}

/// Write records in the amplitude table layout, in the units they carry.
pub fn write_amplitude_table(path: &Path, rows: &[SubjectRecord], table: &TableConfig) -> Result<(), AppError> {
    for row in rows {
        if row.responses.len() != table.condition_columns.len() {
            return Err(AppError::new(
                3,
                format!(
                    "Subject {} has {} amplitudes, expected {}.",
                    row.subject,
                    row.responses.len(),
                    table.condition_columns.len()
                ),
            ));
        }
    }

    let mut writer = create_csv(path, "amplitude table")?;
    let header = [table.subject_column.as_str(), table.baseline_column.as_str()]
        .into_iter()
        .chain(table.condition_columns.iter().map(String::as_str));
    write_row(&mut writer, header, "amplitude table")?;

    for row in rows {
        let values: Vec<String> = std::iter::once(row.baseline)
            .chain(row.responses.iter().copied())
            .map(|v| v.to_string())
            .collect();
        write_row(
            &mut writer,
            std::iter::once(row.subject.as_str()).chain(values.iter().map(String::as_str)),
            "amplitude table",
        )?;
    }

    finish_csv(writer, "amplitude table")
}

/// Cells are quoted by the writer when they contain a delimiter or a quote.
pub(crate) fn create_csv(path: &Path, what: &str) -> Result<Writer<File>, AppError> {
    Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create {what} '{}': {e}", path.display())))
}

pub(crate) fn write_row<'a>(
    writer: &mut Writer<File>,
    cells: impl IntoIterator<Item = &'a str>,
    what: &str,
) -> Result<(), AppError> {
    writer
        .write_record(cells)
        .map_err(|e| AppError::new(2, format!("Failed to write {what} row: {e}")))
}

pub(crate) fn finish_csv(mut writer: Writer<File>, what: &str) -> Result<(), AppError> {
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write {what}: {e}")))
}
