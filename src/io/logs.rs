//! Behavior log and break info tables.
//!
//! A behavior log is the stimulus-presentation export: one row per logged
//! event with at least a `Code` and a `Time` column. Rows are kept in file
//! order because classification depends on it.

use std::path::Path;

use crate::behavior::TrialRow;
use crate::error::AppError;
use crate::io::export::{create_csv, finish_csv, write_row};
use crate::io::ingest::{cell, open_csv, parse_f64, read_header_map, require_column};

/// One logged event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub code: String,
    /// `None` when the time cell is empty or unparseable.
    pub time: Option<f64>,
}

impl LogEntry {
    pub fn new(code: impl Into<String>, time: f64) -> Self {
        Self {
            code: code.into(),
            time: Some(time),
        }
    }
}

/// Epoch counts around the two breaks of one subject's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakInfo {
    pub before_break1: usize,
    pub before_break2: usize,
    pub after: usize,
}

/// Read a behavior log. Every row is kept, even when its code is empty.
pub fn read_behavior_log(path: &Path) -> Result<Vec<LogEntry>, AppError> {
    let mut reader = open_csv(path)?;
    let header_map = read_header_map(&mut reader, path)?;
    let code_idx = require_column(&header_map, "Code", path)?;
    let time_idx = require_column(&header_map, "Time", path)?;

    let mut entries = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::new(
                2,
                format!("CSV parse error in '{}' line {}: {e}", path.display(), idx + 2),
            )
        })?;
        entries.push(LogEntry {
            code: cell(&record, code_idx).unwrap_or_default().to_string(),
            time: parse_f64(&record, time_idx, "Time").ok(),
        });
    }
    Ok(entries)
}

/// Look up one subject's row in the break info table
/// (`subj, epoch_before_break1, epoch_before_break2, epoch_after`).
pub fn read_break_info(path: &Path, subject: &str) -> Result<Option<BreakInfo>, AppError> {
    let mut reader = open_csv(path)?;
    let header_map = read_header_map(&mut reader, path)?;
    let subj_idx = require_column(&header_map, "subj", path)?;
    let b1_idx = require_column(&header_map, "epoch_before_break1", path)?;
    let b2_idx = require_column(&header_map, "epoch_before_break2", path)?;
    let after_idx = require_column(&header_map, "epoch_after", path)?;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::new(2, format!("CSV parse error in '{}' line {line}: {e}", path.display())))?;
        if cell(&record, subj_idx) != Some(subject) {
            continue;
        }

        let count = |i: usize, name: &str| -> Result<usize, AppError> {
            let raw = cell(&record, i).unwrap_or_default();
            raw.parse::<usize>().map_err(|_| {
                AppError::new(
                    3,
                    format!("Invalid `{name}` '{raw}' for subject {subject} (line {line})."),
                )
            })
        };
        return Ok(Some(BreakInfo {
            before_break1: count(b1_idx, "epoch_before_break1")?,
            before_break2: count(b2_idx, "epoch_before_break2")?,
            after: count(after_idx, "epoch_after")?,
        }));
    }
    Ok(None)
}

/// Write classified trials, one row per trial.
pub fn write_trial_table(path: &Path, rows: &[TrialRow]) -> Result<(), AppError> {
    const WHAT: &str = "trial table";
    let mut writer = create_csv(path, WHAT)?;
    write_row(
        &mut writer,
        [
            "subject",
            "group",
            "orderN",
            "stimulus",
            "onset",
            "response_type",
            "branch",
            "time_difference",
            "block_num",
        ],
        WHAT,
    )?;

    let opt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for r in rows {
        let cells = [
            r.subject.clone(),
            r.group.map(|g| g.code().to_string()).unwrap_or_default(),
            r.order.to_string(),
            r.stimulus.clone(),
            opt(r.onset),
            r.class.code().to_string(),
            r.branch.label().to_string(),
            opt(r.time_diff),
            r.block.map(|b| b.to_string()).unwrap_or_default(),
        ];
        write_row(&mut writer, cells.iter().map(String::as_str), WHAT)?;
    }
    finish_csv(writer, WHAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_rows_keep_order_and_tolerate_blank_times() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("S001-Gratings_visual_snow.log");
        std::fs::write(
            &path,
            "Subject,Trial,Code,Time\nS001,1,gr_2,1000\nS001,1,disappear,3000\nS001,1,16,\nS001,2,fix,5000\n",
        )
        .unwrap();

        let log = read_behavior_log(&path).unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[0], LogEntry::new("gr_2", 1000.0));
        assert_eq!(log[2].code, "16");
        assert_eq!(log[2].time, None);
        assert_eq!(log[3].code, "fix");
    }

    #[test]
    fn break_info_is_looked_up_by_subject() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("break_info.csv");
        std::fs::write(
            &path,
            "subj,epoch_before_break1,epoch_before_break2,epoch_after\nS001,40,38,41\nS002,39,40,40\n",
        )
        .unwrap();

        let info = read_break_info(&path, "S002").unwrap().unwrap();
        assert_eq!(
            info,
            BreakInfo {
                before_break1: 39,
                before_break2: 40,
                after: 40
            }
        );
        assert!(read_break_info(&path, "S404").unwrap().is_none());
    }

    #[test]
    fn trial_table_leaves_missing_values_empty() {
        use crate::behavior::{ResponseBranch, ResponseClass};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response_time.csv");
        let row = TrialRow {
            subject: "S001".to_string(),
            group: None,
            order: 0,
            stimulus: "gr_1".to_string(),
            onset: Some(100.0),
            class: ResponseClass::Late,
            branch: ResponseBranch::NoResponse,
            time_diff: None,
            block: Some(1),
        };
        write_trial_table(&path, &[row]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().nth(1), Some("S001,,0,gr_1,100,2,no_response,,1"));
    }

    #[test]
    fn trial_table_quotes_codes_with_commas() {
        use crate::behavior::{ResponseBranch, ResponseClass};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("response_time.csv");
        let row = TrialRow {
            subject: "S001".to_string(),
            group: None,
            order: 3,
            stimulus: "gr_1,left".to_string(),
            onset: Some(100.0),
            class: ResponseClass::Late,
            branch: ResponseBranch::NoResponse,
            time_diff: None,
            block: None,
        };
        write_trial_table(&path, &[row]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().nth(1), Some("S001,,3,\"gr_1,left\",100,2,no_response,,"));
    }
}
