//! Per-subject trial table: classification + corrections + block numbers.

use crate::behavior::{ResponseBranch, ResponseClass, block_of, classify_responses};
use crate::domain::{AnalysisConfig, Group};
use crate::io::{BreakInfo, LogEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct TrialRow {
    pub subject: String,
    pub group: Option<Group>,
    /// Position of the trial after correction (`orderN`).
    pub order: usize,
    pub stimulus: String,
    pub onset: Option<f64>,
    pub class: ResponseClass,
    pub branch: ResponseBranch,
    pub time_diff: Option<f64>,
    /// Session block, when break info is available.
    pub block: Option<u8>,
}

/// Classify one subject's log and attach bookkeeping columns.
///
/// The subject's `skip_leading_events` correction drops leading trials so
/// the table lines up with the recorded epochs.
pub fn build_trial_rows(
    subject: &str,
    log: &[LogEntry],
    config: &AnalysisConfig,
    breaks: Option<&BreakInfo>,
) -> Vec<TrialRow> {
    let correction = config.subjects.correction(subject);
    let group = config.subjects.group_of(subject);

    classify_responses(log, &config.behavior)
        .into_iter()
        .skip(correction.skip_leading_events)
        .enumerate()
        .map(|(order, t)| TrialRow {
            subject: subject.to_string(),
            group,
            order,
            stimulus: t.stimulus,
            onset: t.onset,
            class: t.class,
            branch: t.branch,
            time_diff: t.time_diff,
            block: breaks.map(|b| block_of(order, b)),
        })
        .collect()
}
