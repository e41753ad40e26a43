//! Shared workflows behind the CLI handlers.
//!
//! Keeping these here keeps the handlers in `app.rs` focused on presentation
//! and makes the workflows testable without parsing arguments:
//!
//! - amplitude table -> batch fit -> outcomes
//! - behavior logs -> classification -> trial rows

use std::path::Path;

use tracing::{info, warn};

use crate::behavior::{TrialRow, build_trial_rows};
use crate::domain::{AnalysisConfig, SubjectFit, SubjectOutcome};
use crate::error::AppError;
use crate::fit::fit_subjects;
use crate::io::{IngestedTable, load_amplitude_table, read_behavior_log, read_break_info};

/// All computed outputs of a single `crf fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub table: IngestedTable,
    pub outcomes: Vec<SubjectOutcome>,
}

impl FitRun {
    /// Successful fits in input order.
    pub fn fits(&self) -> Vec<SubjectFit> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok()).cloned().collect()
    }
}

/// Load the amplitude table and fit every subject.
///
/// Per-subject failures are carried in `outcomes`; only file and config
/// errors abort.
pub fn run_fit(input: &Path, config: &AnalysisConfig) -> Result<FitRun, AppError> {
    let table = load_amplitude_table(input, &config.table)?;
    info!(
        path = %input.display(),
        subjects = table.records.len(),
        skipped_rows = table.row_errors.len(),
        "amplitude table loaded"
    );
    let outcomes = fit_subjects(&table.records, config);
    Ok(FitRun { table, outcomes })
}

/// Classify the behavior logs of `subjects`.
///
/// A subject whose log cannot be read is logged and skipped. Break info, when
/// given, must be readable; subjects missing from it get no block numbers.
pub fn classify_subjects(
    logs_dir: &Path,
    subjects: &[String],
    break_info: Option<&Path>,
    config: &AnalysisConfig,
) -> Result<Vec<TrialRow>, AppError> {
    let mut rows = Vec::new();
    for subject in subjects {
        if config.subjects.is_excluded(subject) {
            warn!(subject = %subject, "subject excluded by config; skipping");
            continue;
        }
        let path = logs_dir.join(config.behavior.log_file_name(subject));
        let log = match read_behavior_log(&path) {
            Ok(log) => log,
            Err(err) => {
                warn!(subject = %subject, error = %err, "behavior log unavailable; skipping");
                continue;
            }
        };
        let breaks = match break_info {
            Some(p) => {
                let info = read_break_info(p, subject)?;
                if info.is_none() {
                    warn!(subject = %subject, "no break info for subject");
                }
                info
            }
            None => None,
        };

        let subject_rows = build_trial_rows(subject, &log, config, breaks.as_ref());
        info!(subject = %subject, trials = subject_rows.len(), "responses classified");
        rows.extend(subject_rows);
    }
    Ok(rows)
}
